//! Record graph data model: record kinds, the batch, and its graph view.

pub mod bundle;
pub mod graph;
pub mod types;

pub use bundle::TrackerBundle;
pub use graph::{EdgeKind, RecordGraph, RecordNode};
pub use types::*;
