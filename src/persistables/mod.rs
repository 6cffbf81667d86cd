//! Persistables filter: decides which surviving records may be written.
//!
//! Invalidity is terminal. Everything else follows from propagation over the
//! record graph: top-down from parents (and relationship endpoints) for
//! create/update, bottom-up from descendants for delete, where an invalid
//! relationship additionally pins both of its endpoints.
//!
//! Records that end up blocked without being invalid themselves get an E5000
//! (create/update) or E5001 (delete) error naming the record that blocked them.

mod create_update;
mod delete;

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::graph::NodeIndex;
use serde::Serialize;
use tracing::info;

use crate::error::ImportError;
use crate::lookup::CachedLookup;
use crate::model::{ImportStrategy, RecordGraph, TrackerType, Uid};
use crate::params::IdSchemes;
use crate::validate::{Finding, InvalidRecords, MessageArg, Reporter, ValidationCode};

/// Per-kind persistable uids in payload order, plus the reasons for records
/// that were blocked by others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Persistables {
    persistable: BTreeMap<TrackerType, Vec<Uid>>,
    pub errors: Vec<Finding>,
}

impl Persistables {
    pub fn get(&self, tracker_type: TrackerType) -> &[Uid] {
        self.persistable
            .get(&tracker_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, tracker_type: TrackerType, uid: &Uid) -> bool {
        self.get(tracker_type).contains(uid)
    }

    pub fn is_empty(&self) -> bool {
        self.persistable.values().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.persistable.values().map(Vec::len).sum()
    }
}

/// Resolve persistability of every record in `graph`.
///
/// `invalid` must be the set reported by validation, including records that
/// validation already pruned from its output batch. The graph is never
/// mutated.
pub fn filter(
    graph: &RecordGraph,
    invalid: &InvalidRecords,
    strategy: ImportStrategy,
    lookup: &CachedLookup<'_>,
    id_schemes: &IdSchemes,
) -> Result<Persistables, ImportError> {
    let mut resolution = Resolution {
        graph,
        invalid,
        blocked: HashSet::new(),
        reporter: Reporter::new(id_schemes.clone()),
    };

    if strategy.is_delete() {
        delete::resolve(&mut resolution);
    } else {
        create_update::resolve(&mut resolution, lookup)?;
    }

    let persistables = resolution.finish();
    info!(
        ?strategy,
        persistable = persistables.len(),
        blocked = persistables.errors.len(),
        "persistables resolved"
    );
    Ok(persistables)
}

/// Two relationships between the same endpoints must agree on validity.
///
/// Runs on every import, before atomic mode decides whether the filter runs.
pub fn reject_conflicting_relationships(
    graph: &RecordGraph,
    invalid: &InvalidRecords,
) -> Result<(), ImportError> {
    let mut seen: HashMap<(NodeIndex, NodeIndex), (NodeIndex, bool)> = HashMap::new();

    for idx in graph.payload_nodes(TrackerType::Relationship) {
        let Some(ends) = graph.endpoints(idx) else {
            continue;
        };
        let valid = !invalid.contains_key(graph.key(idx));
        match seen.get(&ends) {
            Some(&(other, other_valid)) if other_valid != valid => {
                return Err(ImportError::malformed(
                    "M006",
                    format!(
                        "{} and {} link the same records but only one of them is valid",
                        graph.key(other),
                        graph.key(idx)
                    ),
                    Some(graph.key(idx).clone()),
                ));
            }
            Some(_) => {}
            None => {
                seen.insert(ends, (idx, valid));
            }
        }
    }
    Ok(())
}

/// Working state shared by both strategies.
struct Resolution<'g> {
    graph: &'g RecordGraph,
    invalid: &'g InvalidRecords,
    /// Payload records that cannot be persisted.
    blocked: HashSet<NodeIndex>,
    reporter: Reporter,
}

impl Resolution<'_> {
    fn is_invalid(&self, idx: NodeIndex) -> bool {
        self.invalid.contains_key(self.graph.key(idx))
    }

    fn is_persistable(&self, idx: NodeIndex) -> bool {
        self.graph.in_payload(idx) && !self.blocked.contains(&idx)
    }

    /// Block a valid record because of `cause` and say why.
    fn block(&mut self, idx: NodeIndex, code: ValidationCode, cause: NodeIndex) {
        if !self.blocked.insert(idx) {
            return;
        }
        let key = self.graph.key(idx).clone();
        let args = [
            MessageArg::Record(key.clone()),
            MessageArg::Record(self.graph.key(cause).clone()),
        ];
        self.reporter.add_error(&key, code, &args);
    }

    fn finish(self) -> Persistables {
        let mut persistable = BTreeMap::new();
        for tracker_type in TrackerType::ALL {
            let uids: Vec<Uid> = self
                .graph
                .payload_nodes(tracker_type)
                .into_iter()
                .filter(|idx| !self.blocked.contains(idx))
                .map(|idx| self.graph.key(idx).uid.clone())
                .collect();
            persistable.insert(tracker_type, uids);
        }
        Persistables {
            persistable,
            errors: self.reporter.into_result().errors,
        }
    }
}
