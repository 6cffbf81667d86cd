//! petgraph-based record graph of a batch.
//!
//! Nodes are the records of the batch plus one placeholder per referenced
//! record that only exists in storage. Edges run parent → child for the
//! hierarchy and relationship → endpoint for references. Building the graph
//! is where malformed input is rejected, before any validator runs.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{EdgeRef, Topo};

use super::bundle::TrackerBundle;
use super::types::*;
use crate::error::ImportError;
use crate::lookup::StorageLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Parent,
    From,
    To,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordNode {
    pub key: RecordKey,
    /// False for records referenced by the batch that only exist in storage.
    pub in_payload: bool,
}

pub struct RecordGraph {
    pub graph: DiGraph<RecordNode, EdgeKind>,
    pub node_indices: HashMap<RecordKey, NodeIndex>,
}

impl RecordGraph {
    pub fn build(bundle: &TrackerBundle, lookup: &dyn StorageLookup) -> Result<Self, ImportError> {
        let mut builder = RecordGraph {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
        };

        for tracker_type in TrackerType::ALL {
            for uid in bundle.uids(tracker_type) {
                builder.add_payload_node(RecordKey::new(tracker_type, uid.clone()))?;
            }
        }

        for enrollment in &bundle.enrollments {
            let parent = RecordKey::new(TrackerType::TrackedEntity, enrollment.tracked_entity.clone());
            let parent_idx = builder.resolve_reference(&parent, lookup).map_err(|e| {
                e.unwrap_or_else(|| {
                    ImportError::malformed(
                        "M002",
                        format!(
                            "Enrollment `{}` references {} which is neither in the payload nor in storage",
                            enrollment.enrollment, parent
                        ),
                        Some(enrollment.key()),
                    )
                })
            })?;
            builder.add_edge(parent_idx, &enrollment.key(), EdgeKind::Parent);
        }

        for event in &bundle.events {
            let Some(enrollment) = &event.enrollment else {
                continue;
            };
            let parent = RecordKey::new(TrackerType::Enrollment, enrollment.clone());
            let parent_idx = builder.resolve_reference(&parent, lookup).map_err(|e| {
                e.unwrap_or_else(|| {
                    ImportError::malformed(
                        "M003",
                        format!(
                            "Event `{}` references {} which is neither in the payload nor in storage",
                            event.event, parent
                        ),
                        Some(event.key()),
                    )
                })
            })?;
            builder.add_edge(parent_idx, &event.key(), EdgeKind::Parent);
        }

        for relationship in &bundle.relationships {
            for (item, kind) in [(&relationship.from, EdgeKind::From), (&relationship.to, EdgeKind::To)] {
                let Some(endpoint) = item.key() else {
                    return Err(ImportError::malformed(
                        "M004",
                        format!(
                            "Relationship `{}` endpoint must name exactly one trackedEntity, enrollment or event",
                            relationship.relationship
                        ),
                        Some(relationship.key()),
                    ));
                };
                let endpoint_idx = builder.resolve_reference(&endpoint, lookup).map_err(|e| {
                    e.unwrap_or_else(|| {
                        ImportError::malformed(
                            "M005",
                            format!(
                                "Relationship `{}` references {} which is neither in the payload nor in storage",
                                relationship.relationship, endpoint
                            ),
                            Some(relationship.key()),
                        )
                    })
                })?;
                builder.add_edge_from(&relationship.key(), endpoint_idx, kind);
            }
        }

        Ok(builder)
    }

    fn add_payload_node(&mut self, key: RecordKey) -> Result<(), ImportError> {
        if self.node_indices.contains_key(&key) {
            return Err(ImportError::malformed(
                "M001",
                format!("Duplicate {} in payload", key),
                Some(key),
            ));
        }
        let idx = self.graph.add_node(RecordNode {
            key: key.clone(),
            in_payload: true,
        });
        self.node_indices.insert(key, idx);
        Ok(())
    }

    /// Find a referenced record in the batch, or add a placeholder if it
    /// exists in storage. `Err(None)` means it is found in neither.
    fn resolve_reference(
        &mut self,
        key: &RecordKey,
        lookup: &dyn StorageLookup,
    ) -> Result<NodeIndex, Option<ImportError>> {
        if let Some(&idx) = self.node_indices.get(key) {
            return Ok(idx);
        }
        let exists = lookup
            .exists(key.tracker_type, &key.uid)
            .map_err(|e| Some(ImportError::lookup(key.tracker_type, &key.uid, e)))?;
        if !exists {
            return Err(None);
        }
        let idx = self.graph.add_node(RecordNode {
            key: key.clone(),
            in_payload: false,
        });
        self.node_indices.insert(key.clone(), idx);
        Ok(idx)
    }

    fn add_edge(&mut self, source: NodeIndex, target: &RecordKey, kind: EdgeKind) {
        if let Some(&target) = self.node_indices.get(target) {
            self.graph.add_edge(source, target, kind);
        }
    }

    fn add_edge_from(&mut self, source: &RecordKey, target: NodeIndex, kind: EdgeKind) {
        if let Some(&source) = self.node_indices.get(source) {
            self.graph.add_edge(source, target, kind);
        }
    }

    pub fn index(&self, key: &RecordKey) -> Option<NodeIndex> {
        self.node_indices.get(key).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &RecordNode {
        &self.graph[idx]
    }

    pub fn key(&self, idx: NodeIndex) -> &RecordKey {
        &self.graph[idx].key
    }

    pub fn in_payload(&self, idx: NodeIndex) -> bool {
        self.graph[idx].in_payload
    }

    /// Records of one kind that are part of the batch, in payload order.
    pub fn payload_nodes(&self, tracker_type: TrackerType) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                let node = &self.graph[idx];
                node.in_payload && node.key.tracker_type == tracker_type
            })
            .collect()
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .find(|e| *e.weight() == EdgeKind::Parent)
            .map(|e| e.source())
    }

    /// Hierarchy children in payload order.
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| *e.weight() == EdgeKind::Parent)
            .map(|e| e.target())
            .collect();
        children.sort();
        children
    }

    /// `(from, to)` of a relationship node.
    pub fn endpoints(&self, idx: NodeIndex) -> Option<(NodeIndex, NodeIndex)> {
        let mut from = None;
        let mut to = None;
        for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
            match edge.weight() {
                EdgeKind::From => from = Some(edge.target()),
                EdgeKind::To => to = Some(edge.target()),
                EdgeKind::Parent => {}
            }
        }
        Some((from?, to?))
    }

    /// Parents before children, relationships before their endpoints.
    ///
    /// Edges only run parent → child and relationship → non-relationship, so
    /// the graph is acyclic by construction.
    pub fn topological_order(&self) -> Vec<NodeIndex> {
        let mut topo = Topo::new(&self.graph);
        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(idx) = topo.next(&self.graph) {
            order.push(idx);
        }
        debug_assert_eq!(order.len(), self.graph.node_count(), "record graph has a cycle");
        order
    }
}
