//! Join-point merging decorators.
//!
//! States that reach a call to the configured join function are parked
//! out of the wrapped searcher; once more than one state sits at the
//! same join site the engine is signalled to combine them before the
//! search resumes. Reduces path-explosion blow-up at known joins.

use crate::searcher::{Searcher, StateId, StateView, Step};
use ahash::AHashMap;
use std::sync::Arc;
use waypoint_program::{InstId, Module};

/// Merging discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Let the child drain before combining waiting states.
    Patient,
    /// Combine as soon as two states share a join site.
    Eager,
}

pub struct MergingSearcher {
    child: Box<dyn Searcher>,
    module: Arc<Module>,
    join_function: String,
    mode: Mode,
    /// All live states in first-seen order; drives deterministic
    /// grouping and release.
    live: Vec<StateId>,
    /// States parked at a join call site.
    parked: AHashMap<StateId, InstId>,
}

impl MergingSearcher {
    /// Patient variant: waits until the child has nothing else to run.
    pub fn new(child: Box<dyn Searcher>, module: Arc<Module>, join_function: String) -> Self {
        Self::with_mode(child, module, join_function, Mode::Patient)
    }

    /// Bump variant: merges as soon as two states share a join site.
    pub fn new_bump(child: Box<dyn Searcher>, module: Arc<Module>, join_function: String) -> Self {
        Self::with_mode(child, module, join_function, Mode::Eager)
    }

    fn with_mode(
        child: Box<dyn Searcher>,
        module: Arc<Module>,
        join_function: String,
        mode: Mode,
    ) -> Self {
        Self {
            child,
            module,
            join_function,
            mode,
            live: Vec::new(),
            parked: AHashMap::new(),
        }
    }

    fn is_join_site(&self, point: InstId) -> bool {
        let inst = self.module.instruction(point);
        self.module.is_call_to(inst, &self.join_function)
    }

    /// Park every live state currently sitting at a join site.
    fn park_waiting(&mut self, view: &dyn StateView) {
        for i in 0..self.live.len() {
            let state = self.live[i];
            if self.parked.contains_key(&state) {
                continue;
            }
            let point = view.snapshot(state).point;
            if self.is_join_site(point) {
                self.parked.insert(state, point);
                self.child.update(None, &[], &[state]);
            }
        }
    }

    /// First join site shared by two or more parked states, with its
    /// waiting group in first-seen order.
    fn mergeable_group(&self) -> Option<Vec<StateId>> {
        let mut groups: AHashMap<InstId, Vec<StateId>> = AHashMap::new();
        for &state in &self.live {
            if let Some(&site) = self.parked.get(&state) {
                groups.entry(site).or_default().push(state);
            }
        }
        for &state in &self.live {
            if let Some(&site) = self.parked.get(&state) {
                let group = &groups[&site];
                if group.len() > 1 {
                    return Some(group.clone());
                }
            }
        }
        None
    }

    /// Hand every parked state back to the child.
    fn release_parked(&mut self) {
        let released: Vec<StateId> = self
            .live
            .iter()
            .copied()
            .filter(|s| self.parked.contains_key(s))
            .collect();
        self.parked.clear();
        if !released.is_empty() {
            self.child.update(None, &released, &[]);
        }
    }
}

impl Searcher for MergingSearcher {
    fn select(&mut self, view: &dyn StateView) -> Step {
        self.park_waiting(view);

        match self.mode {
            Mode::Eager => {
                if let Some(group) = self.mergeable_group() {
                    return Step::Merge(group);
                }
            }
            Mode::Patient => {
                if self.child.is_empty() {
                    if let Some(group) = self.mergeable_group() {
                        return Step::Merge(group);
                    }
                }
            }
        }

        if !self.child.is_empty() {
            return self.child.select(view);
        }
        if self.parked.is_empty() {
            return Step::Done;
        }
        // Only lone waiters remain; resume them past the join rather
        // than deadlocking.
        self.release_parked();
        self.child.select(view)
    }

    fn update(&mut self, current: Option<StateId>, added: &[StateId], removed: &[StateId]) {
        self.live.extend_from_slice(added);
        if !removed.is_empty() {
            self.live.retain(|s| !removed.contains(s));
            for state in removed {
                self.parked.remove(state);
            }
        }
        self.child.update(current, added, removed);
    }

    fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    fn description(&self) -> String {
        let mode = match self.mode {
            Mode::Patient => "merge",
            Mode::Eager => "bump-merge",
        };
        format!("{}({}, {})", mode, self.join_function, self.child.description())
    }
}
