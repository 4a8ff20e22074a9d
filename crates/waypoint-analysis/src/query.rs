//! State-aware distance queries.

use crate::scanner::{return_distances, target_distances, Criterion, Metric};
use crate::store::AnnotationStore;
use std::sync::Arc;
use waypoint_program::{InstId, Module};

/// The pair of stores a directed search needs: distance to the target
/// and distance to each function's own exit. Built once per analysis
/// run; clones share the underlying stores.
#[derive(Debug, Clone)]
pub struct TargetDistance {
    targets: Arc<AnnotationStore>,
    returns: Arc<AnnotationStore>,
}

impl TargetDistance {
    /// Run both scans for the given criterion and metric.
    pub fn analyze(module: &Module, criterion: &Criterion, metric: Metric) -> Self {
        let returns = return_distances(module, metric);
        let targets = target_distances(module, criterion, metric, &returns);
        Self {
            targets: Arc::new(targets),
            returns: Arc::new(returns),
        }
    }

    /// Static distance at a single program point, ignoring any stack.
    pub fn at(&self, point: InstId) -> u64 {
        self.targets.get(point)
    }

    /// Effective distance for a live state: its current point plus the
    /// recorded call stack, call-site identities innermost last.
    ///
    /// Walking the stack from the innermost caller outward lets a target
    /// sitting in an already-partially-executed outer frame be reached
    /// with the correct accumulated return cost, rather than only
    /// considering the innermost frame.
    pub fn of_state(&self, point: InstId, stack: &[InstId]) -> u64 {
        let mut min = self.targets.get(point);
        let mut carried = self.returns.get(point);
        for &site in stack.iter().rev() {
            min = min.min(carried.saturating_add(self.targets.get(site)));
            carried = carried.saturating_add(self.returns.get(site));
        }
        min
    }
}
