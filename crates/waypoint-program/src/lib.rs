//! Program representation consumed by the distance analysis and the
//! directed search: modules, functions, blocks, instructions, and the
//! graphs built over them.
//!
//! How this structure is extracted from a real intermediate
//! representation is the embedding engine's business; this crate only
//! defines the shape the analyzer and schedulers operate on.

pub mod callgraph;
pub mod module;
pub mod scc;

pub use callgraph::{block_sccs, CallGraph};
pub use module::{
    Block, BlockId, Function, FunctionId, InstId, InstKind, Instruction, Module, ModuleBuilder,
};
pub use scc::strongly_connected_components;
