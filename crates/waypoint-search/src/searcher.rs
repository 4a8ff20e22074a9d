//! The scheduling interface between the driving engine and the search
//! policies.
//!
//! The engine owns the live execution states; searchers hold only their
//! identities and ask the engine for fresh snapshots on every scheduling
//! request. `select` and `update` are invoked strictly sequentially by
//! one driving loop.

use smallvec::SmallVec;
use std::fmt;
use waypoint_program::InstId;

/// Opaque identity of an engine-owned live state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u64);

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// A call-site identity on a state's recorded stack. Compared for
/// equality only, to detect re-entry of a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEntry(pub InstId);

/// Engine-supplied view of one live state: where it is and how it got
/// there. Call-site identities are ordered innermost last.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub point: InstId,
    pub stack: SmallVec<[StackEntry; 8]>,
}

impl StateSnapshot {
    /// Whether stepping into `candidate` would re-enter a call site the
    /// state is already inside of. False on an empty stack.
    pub fn introduces_recursion(&self, candidate: StackEntry) -> bool {
        self.stack.contains(&candidate)
    }

    /// The stack as raw call-site points, for distance queries.
    pub fn call_sites(&self) -> SmallVec<[InstId; 8]> {
        self.stack.iter().map(|entry| entry.0).collect()
    }
}

/// Per-state statistics the weighted-random policies draw on. Engines
/// that do not track a statistic leave it at the default.
#[derive(Debug, Clone, Default)]
pub struct StateStats {
    /// Fork depth of the state.
    pub depth: u64,
    /// Instructions executed at the state's current point.
    pub instructions: u64,
    /// Instructions attributed to the state's current call path.
    pub call_path_instructions: u64,
    /// Accumulated solver time, in seconds.
    pub query_cost: f64,
    /// Instructions since the state last covered new code; `None` if it
    /// never has.
    pub instructions_since_fresh_coverage: Option<u64>,
    /// Static distance to the nearest uncovered instruction; 0 when
    /// unknown.
    pub min_dist_to_uncovered: u64,
}

/// What the engine exposes to searchers on each scheduling request.
pub trait StateView {
    /// Fresh snapshot of a live state. Callers only pass identities the
    /// engine has reported via `update` and not yet removed.
    fn snapshot(&self, state: StateId) -> StateSnapshot;

    /// Statistics for a live state.
    fn stats(&self, _state: StateId) -> StateStats {
        StateStats::default()
    }

    /// Total instructions the engine has executed so far.
    fn instructions_retired(&self) -> u64 {
        0
    }
}

/// Outcome of one scheduling request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Advance this state next.
    Run(StateId),
    /// Combine these states, parked at a shared join point, before
    /// resuming; the engine reports the result via `update`.
    Merge(Vec<StateId>),
    /// Nothing can make progress toward the goal; the search should
    /// stop.
    Done,
}

/// A scheduling policy: selects the next state to advance, and is told
/// about every change to the live-state set.
pub trait Searcher {
    /// Pick the next step. Called once per exploration step.
    fn select(&mut self, view: &dyn StateView) -> Step;

    /// The engine stepped `current` (if any) and the live set changed:
    /// `added` states appeared (forks, seeds), `removed` states
    /// terminated or were merged away.
    fn update(&mut self, current: Option<StateId>, added: &[StateId], removed: &[StateId]);

    /// Whether the searcher has any state left to offer.
    fn is_empty(&self) -> bool;

    /// Human-readable description of the assembled policy.
    fn description(&self) -> String;
}
