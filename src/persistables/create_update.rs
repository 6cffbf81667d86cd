//! Top-down propagation for create and update.

use super::Resolution;
use crate::error::ImportError;
use crate::lookup::CachedLookup;
use crate::model::TrackerType;
use crate::validate::ValidationCode;

/// A valid child is blocked only if its parent is not persistable and does
/// not already exist; an existing parent is simply left as it is. A valid
/// relationship needs both endpoints persistable or existing.
pub(super) fn resolve(res: &mut Resolution<'_>, lookup: &CachedLookup<'_>) -> Result<(), ImportError> {
    let graph = res.graph;

    for idx in graph.topological_order() {
        let key = graph.key(idx);
        if !graph.in_payload(idx) || key.tracker_type == TrackerType::Relationship {
            continue;
        }
        if res.is_invalid(idx) {
            res.blocked.insert(idx);
            continue;
        }
        let Some(parent) = graph.parent(idx) else {
            continue;
        };
        if res.is_persistable(parent) || lookup.check(graph.key(parent))? {
            continue;
        }
        res.block(idx, ValidationCode::E5000, parent);
    }

    for idx in graph.payload_nodes(TrackerType::Relationship) {
        if res.is_invalid(idx) {
            res.blocked.insert(idx);
            continue;
        }
        let Some((from, to)) = graph.endpoints(idx) else {
            continue;
        };
        for endpoint in [from, to] {
            if !res.is_persistable(endpoint) && !lookup.check(graph.key(endpoint))? {
                res.block(idx, ValidationCode::E5000, endpoint);
                break;
            }
        }
    }

    Ok(())
}
