//! Call graph over a module's functions.

use crate::module::{FunctionId, InstKind, Module};
use crate::scc::strongly_connected_components;

/// Function-level call graph: one node per function, a directed edge for
/// every direct call site. Indirect calls contribute no edges.
#[derive(Debug)]
pub struct CallGraph {
    callees: Vec<Vec<usize>>,
}

impl CallGraph {
    pub fn build(module: &Module) -> Self {
        let mut callees: Vec<Vec<usize>> = vec![Vec::new(); module.functions().len()];
        for (caller, func) in module.functions().iter().enumerate() {
            for block in &func.blocks {
                for inst in &block.instructions {
                    if let InstKind::Call(Some(callee)) = inst.kind {
                        let edges = &mut callees[caller];
                        if !edges.contains(&(callee.0 as usize)) {
                            edges.push(callee.0 as usize);
                        }
                    }
                }
            }
        }
        Self { callees }
    }

    /// Direct callees of a function.
    pub fn callees(&self, function: FunctionId) -> impl Iterator<Item = FunctionId> + '_ {
        self.callees[function.0 as usize]
            .iter()
            .map(|&f| FunctionId(f as u32))
    }

    /// Strongly connected components in callee-before-caller order.
    pub fn sccs(&self) -> Vec<Vec<FunctionId>> {
        strongly_connected_components(&self.callees)
            .into_iter()
            .map(|scc| scc.into_iter().map(|f| FunctionId(f as u32)).collect())
            .collect()
    }
}

/// Block-level SCCs of a function body, successor-before-predecessor,
/// as block indexes within the function.
pub fn block_sccs(module: &Module, function: FunctionId) -> Vec<Vec<u32>> {
    let func = module.function(function);
    let adj: Vec<Vec<usize>> = func
        .blocks
        .iter()
        .map(|b| b.successors.iter().map(|&s| s as usize).collect())
        .collect();
    strongly_connected_components(&adj)
        .into_iter()
        .map(|scc| scc.into_iter().map(|b| b as u32).collect())
        .collect()
}
