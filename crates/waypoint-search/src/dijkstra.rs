//! Distance-directed state selection.

use crate::searcher::{Searcher, StackEntry, StateId, StateSnapshot, StateView, Step};
use tracing::debug;
use waypoint_analysis::{Criterion, Metric, TargetDistance, INFINITY};
use waypoint_program::Module;

/// Always advances the live state with the smallest effective distance
/// to the target, re-derived from its current point and call stack on
/// every request. Ties keep the first-seen state, so runs are
/// reproducible.
pub struct DijkstraSearcher {
    distance: TargetDistance,
    criterion: Criterion,
    metric: Metric,
    /// Live states in first-seen order; the order is the tie breaker.
    states: Vec<StateId>,
    continue_on_unreachable: bool,
}

impl DijkstraSearcher {
    pub fn new(
        module: &Module,
        criterion: Criterion,
        metric: Metric,
        continue_on_unreachable: bool,
    ) -> Self {
        let distance = TargetDistance::analyze(module, &criterion, metric);
        Self {
            distance,
            criterion,
            metric,
            states: Vec::new(),
            continue_on_unreachable,
        }
    }

    /// Effective distance for one snapshot.
    pub fn distance_of(&self, snapshot: &StateSnapshot) -> u64 {
        self.distance
            .of_state(snapshot.point, &snapshot.call_sites())
    }

    /// Whether stepping `state` into `candidate` would only unroll
    /// recursion: the call site is already on its recorded stack.
    /// Consumers use this to keep recursive re-entry from counting as
    /// distance improvement.
    pub fn does_introduce_recursion(
        &self,
        candidate: StackEntry,
        snapshot: &StateSnapshot,
    ) -> bool {
        snapshot.introduces_recursion(candidate)
    }
}

impl Searcher for DijkstraSearcher {
    fn select(&mut self, view: &dyn StateView) -> Step {
        let mut best: Option<(u64, StateId)> = None;
        for &state in &self.states {
            let dist = self.distance_of(&view.snapshot(state));
            // Strict comparison keeps the first-seen state on ties.
            if best.map_or(true, |(b, _)| dist < b) {
                best = Some((dist, state));
            }
        }
        match best {
            None => Step::Done,
            Some((INFINITY, _)) => {
                if self.continue_on_unreachable {
                    debug!(
                        criterion = %self.criterion,
                        "target unreachable from every live state, continuing first-seen"
                    );
                    Step::Run(self.states[0])
                } else {
                    debug!(
                        criterion = %self.criterion,
                        "target unreachable from every live state, stopping"
                    );
                    Step::Done
                }
            }
            Some((_, state)) => Step::Run(state),
        }
    }

    fn update(&mut self, _current: Option<StateId>, added: &[StateId], removed: &[StateId]) {
        self.states.extend_from_slice(added);
        if !removed.is_empty() {
            self.states.retain(|s| !removed.contains(s));
        }
    }

    fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn description(&self) -> String {
        format!("dijkstra({}, {})", self.criterion, self.metric)
    }
}

/// Same machinery as [`DijkstraSearcher`] with the criterion pinned to a
/// specific call site and the metric to decisions: instead of aiming at
/// a location, it keeps exploration near states that are cheapest to
/// bring past the milestone call.
pub struct AfterCallSearcher {
    inner: DijkstraSearcher,
    function: String,
}

impl AfterCallSearcher {
    pub fn new(module: &Module, function: &str) -> Self {
        let inner = DijkstraSearcher::new(
            module,
            Criterion::FunctionCall(function.to_string()),
            Metric::DecisionCount,
            false,
        );
        Self {
            inner,
            function: function.to_string(),
        }
    }
}

impl Searcher for AfterCallSearcher {
    fn select(&mut self, view: &dyn StateView) -> Step {
        self.inner.select(view)
    }

    fn update(&mut self, current: Option<StateId>, added: &[StateId], removed: &[StateId]) {
        self.inner.update(current, added, removed);
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn description(&self) -> String {
        format!("after-call({})", self.function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEngine;
    use smallvec::smallvec;
    use waypoint_program::{InstId, InstKind, ModuleBuilder};

    /// reach() { if (..) { goal(); return; } return; }
    fn module() -> (Module, InstId, InstId, InstId) {
        let mut b = ModuleBuilder::new();
        let goal = b.declare("goal");
        let f = b.declare("reach");
        let entry = b.block(f, vec![InstKind::Other]);
        let hit = b.block(f, vec![InstKind::Call(Some(goal)), InstKind::Return]);
        let miss = b.block(f, vec![InstKind::Return]);
        b.edge(entry, hit);
        b.edge(entry, miss);
        let m = b.finish();
        let at = |block: u32, inst: u32| InstId {
            function: f.0,
            block,
            inst,
        };
        (m, at(entry.block, 0), at(hit.block, 0), at(miss.block, 0))
    }

    fn searcher(m: &Module, continue_on_unreachable: bool) -> DijkstraSearcher {
        DijkstraSearcher::new(
            m,
            Criterion::FunctionCall("goal".into()),
            Metric::InstructionCount,
            continue_on_unreachable,
        )
    }

    #[test]
    fn test_selects_minimal_distance_state() {
        let (m, entry, hit, _miss) = module();
        let mut view = MockEngine::new();
        view.set_point(StateId(1), entry);
        view.set_point(StateId(2), hit);

        let mut s = searcher(&m, false);
        s.update(None, &[StateId(1), StateId(2)], &[]);
        assert_eq!(s.select(&view), Step::Run(StateId(2)));
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let (m, entry, _hit, _miss) = module();
        let mut view = MockEngine::new();
        view.set_point(StateId(7), entry);
        view.set_point(StateId(3), entry);

        let mut s = searcher(&m, false);
        s.update(None, &[StateId(7), StateId(3)], &[]);
        for _ in 0..4 {
            assert_eq!(s.select(&view), Step::Run(StateId(7)));
        }
    }

    #[test]
    fn test_unreachable_stops_by_default() {
        let (m, _entry, _hit, miss) = module();
        let mut view = MockEngine::new();
        view.set_point(StateId(1), miss);

        let mut s = searcher(&m, false);
        s.update(None, &[StateId(1)], &[]);
        assert_eq!(s.select(&view), Step::Done);
    }

    #[test]
    fn test_unreachable_continues_when_asked() {
        let (m, _entry, _hit, miss) = module();
        let mut view = MockEngine::new();
        view.set_point(StateId(1), miss);
        view.set_point(StateId(2), miss);

        let mut s = searcher(&m, true);
        s.update(None, &[StateId(1), StateId(2)], &[]);
        // Deterministic first-seen fallback.
        assert_eq!(s.select(&view), Step::Run(StateId(1)));
        assert_eq!(s.select(&view), Step::Run(StateId(1)));
    }

    #[test]
    fn test_stack_aware_distance_orders_states() {
        // A state parked past the goal intra-frame but with a caller
        // frame that can still reach it beats a truly-dead state.
        let (m, _entry, hit, miss) = module();
        let mut view = MockEngine::new();
        view.set_snapshot(
            StateId(1),
            StateSnapshot {
                point: miss,
                stack: smallvec![],
            },
        );
        view.set_snapshot(
            StateId(2),
            StateSnapshot {
                point: miss,
                stack: smallvec![StackEntry(hit)],
            },
        );

        let mut s = searcher(&m, false);
        s.update(None, &[StateId(1), StateId(2)], &[]);
        assert_eq!(s.select(&view), Step::Run(StateId(2)));
    }

    #[test]
    fn test_recursion_detection_delegates_to_snapshot() {
        let (m, entry, hit, _miss) = module();
        let s = searcher(&m, false);
        let snapshot = StateSnapshot {
            point: entry,
            stack: smallvec![StackEntry(hit)],
        };
        assert!(s.does_introduce_recursion(StackEntry(hit), &snapshot));
        assert!(!s.does_introduce_recursion(StackEntry(entry), &snapshot));
    }

    #[test]
    fn test_removed_states_are_forgotten() {
        let (m, entry, hit, _miss) = module();
        let mut view = MockEngine::new();
        view.set_point(StateId(1), entry);
        view.set_point(StateId(2), hit);

        let mut s = searcher(&m, false);
        s.update(None, &[StateId(1), StateId(2)], &[]);
        s.update(Some(StateId(2)), &[], &[StateId(2)]);
        assert_eq!(s.select(&view), Step::Run(StateId(1)));
    }
}
