//! Non-uniform random state selection weighted by engine statistics.

use crate::searcher::{Searcher, StateId, StateStats, StateView, Step};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::fmt;

/// Which statistic drives the weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    /// Favor deep states.
    Depth,
    /// Favor rarely-executed program points.
    InstructionCount,
    /// Favor cheap call paths.
    CallPathInstructionCount,
    /// Favor states with low solver cost.
    QueryCost,
    /// Favor states close to covering new code, strongly preferring
    /// ones that recently did.
    CoveringNew,
    /// Favor states close to any uncovered instruction.
    MinDistToUncovered,
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Weight::Depth => "depth",
            Weight::InstructionCount => "icnt",
            Weight::CallPathInstructionCount => "cpicnt",
            Weight::QueryCost => "qc",
            Weight::CoveringNew => "covnew",
            Weight::MinDistToUncovered => "md2u",
        };
        write!(f, "{}", name)
    }
}

impl Weight {
    fn of(self, stats: &StateStats) -> f64 {
        match self {
            Weight::Depth => (stats.depth as f64).max(1.0),
            Weight::InstructionCount => {
                let inv = 1.0 / stats.instructions.max(1) as f64;
                inv * inv
            }
            Weight::CallPathInstructionCount => 1.0 / stats.call_path_instructions.max(1) as f64,
            Weight::QueryCost => {
                if stats.query_cost < 0.1 {
                    1.0
                } else {
                    1.0 / stats.query_cost
                }
            }
            Weight::MinDistToUncovered => {
                let inv = inv_md2u(stats);
                inv * inv
            }
            Weight::CoveringNew => {
                let inv_cov = match stats.instructions_since_fresh_coverage {
                    Some(since) => 1.0 / since.saturating_sub(1000).max(1) as f64,
                    None => 0.0,
                };
                let inv_md2u = inv_md2u(stats);
                inv_cov * inv_cov + inv_md2u * inv_md2u
            }
        }
    }
}

fn inv_md2u(stats: &StateStats) -> f64 {
    let md2u = if stats.min_dist_to_uncovered == 0 {
        10_000
    } else {
        stats.min_dist_to_uncovered
    };
    1.0 / md2u as f64
}

#[derive(Debug)]
pub struct WeightedRandomSearcher {
    weight: Weight,
    states: Vec<StateId>,
    rng: ChaCha8Rng,
}

impl WeightedRandomSearcher {
    pub fn new(weight: Weight, rng: ChaCha8Rng) -> Self {
        Self {
            weight,
            states: Vec::new(),
            rng,
        }
    }
}

impl Searcher for WeightedRandomSearcher {
    fn select(&mut self, view: &dyn StateView) -> Step {
        if self.states.is_empty() {
            return Step::Done;
        }
        let weights: Vec<f64> = self
            .states
            .iter()
            .map(|&s| self.weight.of(&view.stats(s)))
            .collect();
        // Degenerate weights (all zero) fall back to a uniform draw.
        let idx = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => self.rng.gen_range(0..self.states.len()),
        };
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
        format!("nurs:{}", self.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEngine;
    use rand::SeedableRng;

    #[test]
    fn test_heavier_state_dominates_selection() {
        let mut view = MockEngine::new();
        view.set_stats(
            StateId(1),
            StateStats {
                depth: 1,
                ..StateStats::default()
            },
        );
        view.set_stats(
            StateId(2),
            StateStats {
                depth: 1000,
                ..StateStats::default()
            },
        );

        let mut s =
            WeightedRandomSearcher::new(Weight::Depth, ChaCha8Rng::seed_from_u64(11));
        s.update(None, &[StateId(1), StateId(2)], &[]);

        let mut deep = 0;
        for _ in 0..100 {
            if s.select(&view) == Step::Run(StateId(2)) {
                deep += 1;
            }
        }
        assert!(deep > 90);
    }

    #[test]
    fn test_never_covered_state_still_selectable() {
        // CoveringNew weight is zero for states that never covered new
        // code with md2u unknown; the searcher must not wedge on the
        // degenerate all-zero case.
        let mut view = MockEngine::new();
        view.set_stats(StateId(1), StateStats::default());
        let mut s =
            WeightedRandomSearcher::new(Weight::CoveringNew, ChaCha8Rng::seed_from_u64(5));
        s.update(None, &[StateId(1)], &[]);
        assert_eq!(s.select(&view), Step::Run(StateId(1)));
    }
}
