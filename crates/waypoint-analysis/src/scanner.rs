//! Fixed-point distance scan over the call graph and per-function CFGs.
//!
//! Distances propagate backwards: each instruction's bound is derived
//! from its successors, blocks are walked in reverse, and both the
//! block-level and call-graph-level loops repeat until a full pass over
//! the current SCC changes nothing. Additions saturate, so any path
//! through an unreachable point stays at [`INFINITY`].

use crate::store::{AnnotationStore, INFINITY};
use std::fmt;
use tracing::info;
use waypoint_program::{
    block_sccs, Block, BlockId, CallGraph, FunctionId, InstId, InstKind, Instruction, Module,
};

/// Name of the libc assertion-failure hook the [`Criterion::AssertFail`]
/// target matches calls to.
const ASSERT_FAIL: &str = "__assert_fail";

/// What the search is aiming for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    /// Any return instruction.
    AllReturns,
    /// A call to the assertion-failure hook.
    AssertFail,
    /// A call to the named function.
    FunctionCall(String),
    /// A return from the named function.
    FunctionReturn(String),
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::AllReturns => write!(f, "all-returns"),
            Criterion::AssertFail => write!(f, "assert-fail"),
            Criterion::FunctionCall(name) => write!(f, "function-call({})", name),
            Criterion::FunctionReturn(name) => write!(f, "function-return({})", name),
        }
    }
}

/// How distance is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    /// Every instruction costs 1.
    InstructionCount,
    /// Only terminators with more than one successor cost 1.
    #[default]
    DecisionCount,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::InstructionCount => write!(f, "instructions"),
            Metric::DecisionCount => write!(f, "decisions"),
        }
    }
}

/// Call-handling rule, selected once per scan. Replaces the virtual
/// scanner hierarchy of classic directed-search implementations with a
/// closed variant.
enum CallRule<'a> {
    /// Distance to the containing function's own exit: a call always
    /// charges the full cost of returning from the callee.
    ReturnDistance,
    /// Distance to the criterion: a call may either reach the target
    /// inside the callee or return from it and continue here.
    TargetDistance { returns: &'a AnnotationStore },
}

/// Distance from every instruction to its containing function's exit.
pub fn return_distances(module: &Module, metric: Metric) -> AnnotationStore {
    scan(module, &Criterion::AllReturns, metric, CallRule::ReturnDistance)
}

/// Distance from every instruction to the criterion, shortcutting
/// through calls via the return-distance store.
pub fn target_distances(
    module: &Module,
    criterion: &Criterion,
    metric: Metric,
    returns: &AnnotationStore,
) -> AnnotationStore {
    scan(module, criterion, metric, CallRule::TargetDistance { returns })
}

fn scan(
    module: &Module,
    criterion: &Criterion,
    metric: Metric,
    rule: CallRule<'_>,
) -> AnnotationStore {
    let mut store = AnnotationStore::new();
    let callgraph = CallGraph::build(module);
    let mut passes = 0usize;

    for scc in callgraph.sccs() {
        // Block SCCs are a property of each function body; compute them
        // once per call-graph component, not once per pass.
        let bodies: Vec<(FunctionId, Vec<Vec<u32>>)> = scc
            .iter()
            .filter(|&&f| module.function(f).has_body())
            .map(|&f| (f, block_sccs(module, f)))
            .collect();

        loop {
            passes += 1;
            let mut changed = false;
            for (function, fn_sccs) in &bodies {
                for block_scc in fn_sccs {
                    loop {
                        let mut scc_changed = false;
                        for &block in block_scc {
                            let improved = scan_block(
                                module, criterion, metric, &rule, *function, block, &mut store,
                            );
                            if improved {
                                scc_changed = true;
                                changed = true;
                            }
                        }
                        if !scc_changed {
                            break;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    info!(
        criterion = %criterion,
        metric = %metric,
        points = store.len(),
        passes,
        "distance scan complete"
    );
    store
}

/// One backward pass over a block. Returns whether any instruction's
/// bound improved.
fn scan_block(
    module: &Module,
    criterion: &Criterion,
    metric: Metric,
    rule: &CallRule<'_>,
    function: FunctionId,
    block_idx: u32,
    store: &mut AnnotationStore,
) -> bool {
    let block_id = BlockId {
        function: function.0,
        block: block_idx,
    };
    let block = module.block(block_id);
    let mut changed = false;

    // Shortest distance over all successor block entries; infinity when
    // the block has none.
    let mut prev = INFINITY;
    for &succ in &block.successors {
        let succ_id = BlockId {
            function: function.0,
            block: succ,
        };
        prev = prev.min(store.at_block_entry(module, succ_id));
    }

    for inst_idx in (0..block.instructions.len()).rev() {
        let inst = &block.instructions[inst_idx];
        let point = InstId {
            function: function.0,
            block: block_idx,
            inst: inst_idx as u32,
        };
        let step = step_cost(metric, block, inst_idx);

        let new_dist = if matches_criterion(module, criterion, function, inst) {
            0
        } else if let InstKind::Call(callee) = inst.kind {
            call_distance(module, rule, store, prev, callee, step)
        } else {
            prev.saturating_add(step)
        };

        if store.record(point, new_dist) {
            changed = true;
        }
        prev = store.get(point);
    }
    changed
}

fn matches_criterion(
    module: &Module,
    criterion: &Criterion,
    function: FunctionId,
    inst: &Instruction,
) -> bool {
    match criterion {
        Criterion::AllReturns => inst.kind == InstKind::Return,
        Criterion::AssertFail => module.is_call_to(inst, ASSERT_FAIL),
        Criterion::FunctionCall(name) => module.is_call_to(inst, name),
        Criterion::FunctionReturn(name) => {
            inst.kind == InstKind::Return && module.function(function).name == *name
        }
    }
}

fn step_cost(metric: Metric, block: &Block, inst_idx: usize) -> u64 {
    match metric {
        Metric::InstructionCount => 1,
        Metric::DecisionCount => {
            let terminator = inst_idx + 1 == block.instructions.len();
            u64::from(terminator && block.successors.len() > 1)
        }
    }
}

fn call_distance(
    module: &Module,
    rule: &CallRule<'_>,
    store: &AnnotationStore,
    prev: u64,
    callee: Option<FunctionId>,
    step: u64,
) -> u64 {
    // Indirect calls and declaration-only callees are opaque single
    // steps.
    let callee = callee.filter(|&c| module.function(c).has_body());
    match (rule, callee) {
        (CallRule::ReturnDistance, Some(c)) => prev
            .saturating_add(store.at_function_entry(module, c))
            .saturating_add(step),
        (CallRule::TargetDistance { returns }, Some(c)) => {
            // Shortest of two choices: reach the target inside the
            // callee, or return from the callee and continue in the
            // current frame.
            let through = store.at_function_entry(module, c).saturating_add(step);
            let around = prev
                .saturating_add(returns.at_function_entry(module, c))
                .saturating_add(step);
            through.min(around)
        }
        (_, None) => prev.saturating_add(step),
    }
}
