//! State scheduling for directed exploration.
//!
//! Atomic search policies (depth-first through distance-directed
//! Dijkstra), decorators that compose them (interleaving, batching,
//! merging, iterative deepening), and a factory that assembles one
//! searcher from an immutable configuration. The driving engine owns
//! the live states; searchers work with identities and engine-supplied
//! snapshots, one `select`/`update` pair per exploration step.

pub mod basic;
pub mod config;
pub mod dijkstra;
pub mod merging;
pub mod random_path;
pub mod searcher;
pub mod weighted;
pub mod wrappers;

pub use basic::{BfsSearcher, DfsSearcher, RandomStateSearcher};
pub use config::{
    build, BatchingConfig, BuildError, BuildResult, MergeMode, Policy, SearchConfig, TargetKind,
};
pub use dijkstra::{AfterCallSearcher, DijkstraSearcher};
pub use merging::MergingSearcher;
pub use random_path::RandomPathSearcher;
pub use searcher::{
    Searcher, StackEntry, StateId, StateSnapshot, StateStats, StateView, Step,
};
pub use weighted::{Weight, WeightedRandomSearcher};
pub use wrappers::{BatchingSearcher, InterleavedSearcher, IterativeDeepeningSearcher};

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic in-memory engine view shared by the unit tests.

    use crate::searcher::{StateId, StateSnapshot, StateStats, StateView};
    use ahash::AHashMap;
    use smallvec::SmallVec;
    use waypoint_program::InstId;

    #[derive(Default)]
    pub struct MockEngine {
        snapshots: AHashMap<StateId, StateSnapshot>,
        stats: AHashMap<StateId, StateStats>,
        pub retired: u64,
    }

    impl MockEngine {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_point(&mut self, state: StateId, point: InstId) {
            self.set_snapshot(
                state,
                StateSnapshot {
                    point,
                    stack: SmallVec::new(),
                },
            );
        }

        pub fn set_snapshot(&mut self, state: StateId, snapshot: StateSnapshot) {
            self.snapshots.insert(state, snapshot);
        }

        pub fn set_stats(&mut self, state: StateId, stats: StateStats) {
            self.stats.insert(state, stats);
        }
    }

    impl StateView for MockEngine {
        fn snapshot(&self, state: StateId) -> StateSnapshot {
            self.snapshots
                .get(&state)
                .cloned()
                .unwrap_or_else(|| StateSnapshot {
                    point: InstId {
                        function: 0,
                        block: 0,
                        inst: 0,
                    },
                    stack: SmallVec::new(),
                })
        }

        fn stats(&self, state: StateId) -> StateStats {
            self.stats.get(&state).cloned().unwrap_or_default()
        }

        fn instructions_retired(&self) -> u64 {
            self.retired
        }
    }
}
