//! Search configuration and the composition factory.
//!
//! One immutable configuration value describes the whole searcher: the
//! atomic policies and the decorators around them. `build` assembles it
//! bottom-up and validates everything it can before the search starts.

use crate::basic::{BfsSearcher, DfsSearcher, RandomStateSearcher};
use crate::dijkstra::{AfterCallSearcher, DijkstraSearcher};
use crate::merging::MergingSearcher;
use crate::random_path::RandomPathSearcher;
use crate::searcher::Searcher;
use crate::weighted::{Weight, WeightedRandomSearcher};
use crate::wrappers::{BatchingSearcher, InterleavedSearcher, IterativeDeepeningSearcher};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use waypoint_analysis::{Criterion, Metric};
use waypoint_program::Module;

/// What a distance-directed policy aims at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetKind {
    /// Failing assertion calls.
    #[default]
    AssertFail,
    /// Calls to a named function; requires a target name.
    FunctionCall,
    /// Returns of a named function; requires a target name.
    FunctionEnd,
    /// Any return instruction.
    FinalReturn,
}

impl TargetKind {
    fn criterion(self, name: Option<&str>) -> Result<Criterion, BuildError> {
        let named = |target: &'static str| match name {
            Some(n) if !n.is_empty() => Ok(n.to_string()),
            _ => Err(BuildError::MissingTargetName { target }),
        };
        match self {
            TargetKind::AssertFail => Ok(Criterion::AssertFail),
            TargetKind::FinalReturn => Ok(Criterion::AllReturns),
            TargetKind::FunctionCall => Ok(Criterion::FunctionCall(named("function-call")?)),
            TargetKind::FunctionEnd => Ok(Criterion::FunctionReturn(named("function-end")?)),
        }
    }
}

/// An atomic scheduling policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    Dfs,
    Bfs,
    RandomState,
    RandomPath,
    WeightedRandom(Weight),
    Dijkstra {
        metric: Metric,
        target: TargetKind,
        target_name: Option<String>,
        continue_on_unreachable: bool,
    },
    AfterCall {
        function: String,
    },
}

/// Budgets for the batching decorator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchingConfig {
    pub instruction_budget: u64,
    pub time_budget: Duration,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            instruction_budget: 10_000,
            time_budget: Duration::from_secs(5),
        }
    }
}

/// Join-point merging selection. The two disciplines are mutually
/// exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MergeMode {
    #[default]
    None,
    /// Merge once the underlying searcher has drained.
    Merge { join_function: String },
    /// Merge as soon as two states share a join site.
    BumpMerge { join_function: String },
}

/// Complete, immutable description of a composed searcher.
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    /// Atomic policies; more than one is interleaved round-robin. Empty
    /// selects the default search.
    pub policies: Vec<Policy>,
    /// Optional batching decorator.
    pub batching: Option<BatchingConfig>,
    /// Optional merging decorator.
    pub merge: MergeMode,
    /// Optional iterative-deepening decorator.
    pub iterative_deepening: bool,
    /// Seed for every randomized policy; equal seeds give equal runs.
    pub seed: u64,
}

/// Configuration rejected at construction time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("{target} search requires a target name, but none was supplied")]
    MissingTargetName { target: &'static str },

    #[error("after-call search requires a function name")]
    MissingAfterCallFunction,

    #[error("merging search cannot be combined with random-path as the sole policy")]
    MergeWithRandomPath,

    #[error("merging search requires a join function name")]
    MissingJoinFunction,
}

/// Result type for searcher construction.
pub type BuildResult<T> = Result<T, BuildError>;

/// Assemble the searcher the configuration describes.
///
/// Decorators nest in a fixed order: interleaving innermost, then
/// batching, then merging, then iterative deepening outermost.
pub fn build(module: &Arc<Module>, config: &SearchConfig) -> BuildResult<Box<dyn Searcher>> {
    let default_policies;
    let policies: &[Policy] = if config.policies.is_empty() {
        default_policies = [Policy::RandomPath, Policy::WeightedRandom(Weight::CoveringNew)];
        &default_policies
    } else {
        &config.policies
    };

    if config.merge != MergeMode::None
        && policies.len() == 1
        && policies[0] == Policy::RandomPath
    {
        return Err(BuildError::MergeWithRandomPath);
    }

    let mut searcher = if policies.len() == 1 {
        atomic(module, &policies[0], config.seed)?
    } else {
        let children = policies
            .iter()
            .enumerate()
            .map(|(i, p)| atomic(module, p, config.seed.wrapping_add(i as u64)))
            .collect::<BuildResult<Vec<_>>>()?;
        Box::new(InterleavedSearcher::new(children))
    };

    if let Some(batching) = &config.batching {
        searcher = Box::new(BatchingSearcher::new(
            searcher,
            batching.time_budget,
            batching.instruction_budget,
        ));
    }

    match &config.merge {
        MergeMode::None => {}
        MergeMode::Merge { join_function } => {
            searcher = Box::new(MergingSearcher::new(
                searcher,
                Arc::clone(module),
                join_name(join_function)?,
            ));
        }
        MergeMode::BumpMerge { join_function } => {
            searcher = Box::new(MergingSearcher::new_bump(
                searcher,
                Arc::clone(module),
                join_name(join_function)?,
            ));
        }
    }

    if config.iterative_deepening {
        searcher = Box::new(IterativeDeepeningSearcher::new(searcher));
    }

    info!(searcher = %searcher.description(), "constructed searcher");
    Ok(searcher)
}

fn join_name(join_function: &str) -> BuildResult<String> {
    if join_function.is_empty() {
        return Err(BuildError::MissingJoinFunction);
    }
    Ok(join_function.to_string())
}

fn atomic(module: &Arc<Module>, policy: &Policy, seed: u64) -> BuildResult<Box<dyn Searcher>> {
    let rng = ChaCha8Rng::seed_from_u64(seed);
    Ok(match policy {
        Policy::Dfs => Box::new(DfsSearcher::new()),
        Policy::Bfs => Box::new(BfsSearcher::new()),
        Policy::RandomState => Box::new(RandomStateSearcher::new(rng)),
        Policy::RandomPath => Box::new(RandomPathSearcher::new(rng)),
        Policy::WeightedRandom(weight) => Box::new(WeightedRandomSearcher::new(*weight, rng)),
        Policy::Dijkstra {
            metric,
            target,
            target_name,
            continue_on_unreachable,
        } => {
            let criterion = target.criterion(target_name.as_deref())?;
            Box::new(DijkstraSearcher::new(
                module,
                criterion,
                *metric,
                *continue_on_unreachable,
            ))
        }
        Policy::AfterCall { function } => {
            if function.is_empty() {
                return Err(BuildError::MissingAfterCallFunction);
            }
            Box::new(AfterCallSearcher::new(module, function))
        }
    })
}
