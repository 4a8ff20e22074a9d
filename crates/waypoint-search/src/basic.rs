//! Depth-first, breadth-first, and uniform-random state selection.

use crate::searcher::{Searcher, StateId, StateView, Step};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// Depth-first: always advance the most recently added state.
#[derive(Debug, Default)]
pub struct DfsSearcher {
    states: Vec<StateId>,
}

impl DfsSearcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Searcher for DfsSearcher {
    fn select(&mut self, _view: &dyn StateView) -> Step {
        match self.states.last() {
            Some(&state) => Step::Run(state),
            None => Step::Done,
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
        "dfs".to_string()
    }
}

/// Breadth-first: always advance the oldest state.
#[derive(Debug, Default)]
pub struct BfsSearcher {
    states: VecDeque<StateId>,
}

impl BfsSearcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Searcher for BfsSearcher {
    fn select(&mut self, _view: &dyn StateView) -> Step {
        match self.states.front() {
            Some(&state) => Step::Run(state),
            None => Step::Done,
        }
    }

    fn update(&mut self, _current: Option<StateId>, added: &[StateId], removed: &[StateId]) {
        self.states.extend(added.iter().copied());
        if !removed.is_empty() {
            self.states.retain(|s| !removed.contains(s));
        }
    }

    fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn description(&self) -> String {
        "bfs".to_string()
    }
}

/// Uniform-random selection over all live states.
#[derive(Debug)]
pub struct RandomStateSearcher {
    states: Vec<StateId>,
    rng: ChaCha8Rng,
}

impl RandomStateSearcher {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            states: Vec::new(),
            rng,
        }
    }
}

impl Searcher for RandomStateSearcher {
    fn select(&mut self, _view: &dyn StateView) -> Step {
        if self.states.is_empty() {
            return Step::Done;
        }
        let idx = self.rng.gen_range(0..self.states.len());
        Step::Run(self.states[idx])
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
        "random-state".to_string()
    }
}
