//! Composable searcher decorators: interleaving, batching, and
//! iterative deepening.

use crate::searcher::{Searcher, StateId, StateView, Step};
use std::time::{Duration, Instant};
use tracing::debug;

/// Deterministic fair time-sharing: each `select` delegates to the next
/// child in fixed order. Children are never asked to agree with each
/// other.
pub struct InterleavedSearcher {
    children: Vec<Box<dyn Searcher>>,
    next: usize,
}

impl InterleavedSearcher {
    pub fn new(children: Vec<Box<dyn Searcher>>) -> Self {
        debug_assert!(!children.is_empty());
        Self { children, next: 0 }
    }
}

impl Searcher for InterleavedSearcher {
    fn select(&mut self, view: &dyn StateView) -> Step {
        let step = self.children[self.next].select(view);
        self.next = (self.next + 1) % self.children.len();
        step
    }

    fn update(&mut self, current: Option<StateId>, added: &[StateId], removed: &[StateId]) {
        for child in &mut self.children {
            child.update(current, added, removed);
        }
    }

    fn is_empty(&self) -> bool {
        self.children.iter().all(|c| c.is_empty())
    }

    fn description(&self) -> String {
        let children: Vec<String> = self.children.iter().map(|c| c.description()).collect();
        format!("interleaved({})", children.join(", "))
    }
}

/// Keeps returning the last selection until an instruction-count or
/// wall-clock budget is exhausted, then re-queries the wrapped child.
/// Amortizes expensive child policies and keeps the engine on one state
/// long enough for its caches to pay off.
pub struct BatchingSearcher {
    child: Box<dyn Searcher>,
    time_budget: Duration,
    instruction_budget: u64,
    current: Option<StateId>,
    batch_started: Instant,
    instructions_at_start: u64,
}

impl BatchingSearcher {
    pub fn new(child: Box<dyn Searcher>, time_budget: Duration, instruction_budget: u64) -> Self {
        Self {
            child,
            time_budget,
            instruction_budget,
            current: None,
            batch_started: Instant::now(),
            instructions_at_start: 0,
        }
    }
}

impl Searcher for BatchingSearcher {
    fn select(&mut self, view: &dyn StateView) -> Step {
        if let Some(state) = self.current {
            let executed = view
                .instructions_retired()
                .saturating_sub(self.instructions_at_start);
            if self.batch_started.elapsed() < self.time_budget
                && executed < self.instruction_budget
            {
                return Step::Run(state);
            }
            self.current = None;
        }
        match self.child.select(view) {
            Step::Run(state) => {
                self.current = Some(state);
                self.batch_started = Instant::now();
                self.instructions_at_start = view.instructions_retired();
                Step::Run(state)
            }
            step => step,
        }
    }

    fn update(&mut self, current: Option<StateId>, added: &[StateId], removed: &[StateId]) {
        if let Some(state) = self.current {
            if removed.contains(&state) {
                self.current = None;
            }
        }
        self.child.update(current, added, removed);
    }

    fn is_empty(&self) -> bool {
        self.child.is_empty()
    }

    fn description(&self) -> String {
        format!("batching({})", self.child.description())
    }
}

/// Runs the child under a per-round wall-clock budget. States that
/// out-run the budget are paused out of the child; once the child has
/// nothing left the budget doubles and the paused states are
/// re-admitted.
pub struct IterativeDeepeningSearcher {
    child: Box<dyn Searcher>,
    paused: Vec<StateId>,
    budget: Duration,
    round_started: Instant,
}

impl IterativeDeepeningSearcher {
    const INITIAL_BUDGET: Duration = Duration::from_secs(1);

    pub fn new(child: Box<dyn Searcher>) -> Self {
        Self {
            child,
            paused: Vec::new(),
            budget: Self::INITIAL_BUDGET,
            round_started: Instant::now(),
        }
    }
}

impl Searcher for IterativeDeepeningSearcher {
    fn select(&mut self, view: &dyn StateView) -> Step {
        if self.child.is_empty() && !self.paused.is_empty() {
            self.budget *= 2;
            debug!(
                budget_secs = self.budget.as_secs_f64(),
                resumed = self.paused.len(),
                "iterative deepening: starting next round"
            );
            let paused = std::mem::take(&mut self.paused);
            self.child.update(None, &paused, &[]);
            self.round_started = Instant::now();
        }
        self.child.select(view)
    }

    fn update(&mut self, current: Option<StateId>, added: &[StateId], removed: &[StateId]) {
        self.child.update(current, added, removed);
        if !removed.is_empty() {
            self.paused.retain(|s| !removed.contains(s));
        }
        if self.round_started.elapsed() >= self.budget {
            if let Some(state) = current {
                if !removed.contains(&state) && !self.paused.contains(&state) {
                    self.child.update(None, &[], &[state]);
                    self.paused.push(state);
                }
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.child.is_empty() && self.paused.is_empty()
    }

    fn description(&self) -> String {
        format!("iterative-deepening({})", self.child.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::{BfsSearcher, DfsSearcher};
    use crate::testing::MockEngine;

    /// A child that always offers the same fixed state.
    struct Fixed(StateId, &'static str);

    impl Searcher for Fixed {
        fn select(&mut self, _view: &dyn StateView) -> Step {
            Step::Run(self.0)
        }
        fn update(&mut self, _c: Option<StateId>, _a: &[StateId], _r: &[StateId]) {}
        fn is_empty(&self) -> bool {
            false
        }
        fn description(&self) -> String {
            self.1.to_string()
        }
    }

    #[test]
    fn test_interleaved_round_robin_order() {
        let view = MockEngine::new();
        let mut s = InterleavedSearcher::new(vec![
            Box::new(Fixed(StateId(1), "a")),
            Box::new(Fixed(StateId(2), "b")),
            Box::new(Fixed(StateId(3), "c")),
        ]);
        let picks: Vec<Step> = (0..6).map(|_| s.select(&view)).collect();
        let expected: Vec<Step> = [1, 2, 3, 1, 2, 3]
            .iter()
            .map(|&id| Step::Run(StateId(id)))
            .collect();
        assert_eq!(picks, expected);
        assert_eq!(s.description(), "interleaved(a, b, c)");
    }

    #[test]
    fn test_batching_caches_until_instruction_budget() {
        let mut view = MockEngine::new();
        let mut child = DfsSearcher::new();
        child.update(None, &[StateId(1), StateId(2)], &[]);
        let mut s = BatchingSearcher::new(Box::new(child), Duration::from_secs(3600), 100);

        // First query picks the child's choice and pins it.
        assert_eq!(s.select(&view), Step::Run(StateId(2)));
        view.retired = 50;
        assert_eq!(s.select(&view), Step::Run(StateId(2)));
        // Budget exhausted: the child is asked again.
        view.retired = 150;
        assert_eq!(s.select(&view), Step::Run(StateId(2)));
        // And the new batch starts counting from 150.
        view.retired = 200;
        assert_eq!(s.select(&view), Step::Run(StateId(2)));
    }

    #[test]
    fn test_batching_drops_removed_selection() {
        let mut view = MockEngine::new();
        let mut child = BfsSearcher::new();
        child.update(None, &[StateId(1), StateId(2)], &[]);
        let mut s = BatchingSearcher::new(
            Box::new(child),
            Duration::from_secs(3600),
            1_000_000,
        );
        view.retired = 0;
        assert_eq!(s.select(&view), Step::Run(StateId(1)));
        s.update(Some(StateId(1)), &[], &[StateId(1)]);
        assert_eq!(s.select(&view), Step::Run(StateId(2)));
    }

    #[test]
    fn test_iterative_deepening_pauses_and_readmits() {
        let view = MockEngine::new();
        let mut child = BfsSearcher::new();
        child.update(None, &[StateId(1)], &[]);
        let mut s = IterativeDeepeningSearcher::new(Box::new(child));
        // Force the round to be over immediately.
        s.budget = Duration::from_secs(0);

        assert_eq!(s.select(&view), Step::Run(StateId(1)));
        // The budget has expired, so the stepped state is paused out.
        s.update(Some(StateId(1)), &[], &[]);
        assert!(s.child.is_empty());
        assert!(!s.is_empty());

        // Next select starts a new round with the state back in play.
        assert_eq!(s.select(&view), Step::Run(StateId(1)));
        assert!(!s.child.is_empty());
    }
}
