//! Static distance-to-target analysis.
//!
//! Computes, for every instruction of a module, a conservative distance
//! (in instructions or branching decisions) to a search target, and
//! re-derives an effective distance per live execution state from its
//! call stack. The analysis runs once, before any scheduling; its output
//! is immutable and cheap to share.

pub mod query;
pub mod scanner;
pub mod store;

pub use query::TargetDistance;
pub use scanner::{return_distances, target_distances, Criterion, Metric};
pub use store::{AnnotationStore, INFINITY};
