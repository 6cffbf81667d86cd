//! Bottom-up propagation for delete.

use super::Resolution;
use crate::model::TrackerType;
use crate::validate::ValidationCode;

/// Deleting a record cascades to its subtree, so a record is deletable only
/// if its whole subtree is. Deleting a child never needs its ancestors, and
/// deleting a valid relationship never needs its endpoints. An invalid
/// relationship pins both endpoints before the cascade is evaluated.
pub(super) fn resolve(res: &mut Resolution<'_>) {
    let graph = res.graph;

    for tracker_type in TrackerType::ALL {
        for idx in graph.payload_nodes(tracker_type) {
            if res.is_invalid(idx) {
                res.blocked.insert(idx);
            }
        }
    }

    for relationship in graph.payload_nodes(TrackerType::Relationship) {
        if !res.is_invalid(relationship) {
            continue;
        }
        let Some((from, to)) = graph.endpoints(relationship) else {
            continue;
        };
        for endpoint in [from, to] {
            if graph.in_payload(endpoint) {
                res.block(endpoint, ValidationCode::E5001, relationship);
            }
        }
    }

    // Reverse topological order visits children before their parents.
    for idx in graph.topological_order().into_iter().rev() {
        if !graph.in_payload(idx)
            || graph.key(idx).tracker_type == TrackerType::Relationship
            || res.blocked.contains(&idx)
        {
            continue;
        }
        let blocked_child = graph
            .children(idx)
            .into_iter()
            .find(|child| res.blocked.contains(child));
        if let Some(child) = blocked_child {
            res.block(idx, ValidationCode::E5001, child);
        }
    }
}
