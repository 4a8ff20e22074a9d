//! Module, function, block, and instruction model with stable
//! program-point identities.

use ahash::AHashMap;
use std::fmt;

/// Identity of a function within a module.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

/// Identity of a basic block within a module.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    pub function: u32,
    pub block: u32,
}

/// Identity of an instruction within a module. Usable as a map key and
/// stable for the lifetime of the module.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId {
    pub function: u32,
    pub block: u32,
    pub inst: u32,
}

impl InstId {
    /// The block containing this instruction.
    pub fn block(self) -> BlockId {
        BlockId {
            function: self.function,
            block: self.block,
        }
    }

    /// The function containing this instruction.
    pub fn function(self) -> FunctionId {
        FunctionId(self.function)
    }
}

impl fmt::Debug for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}.b{}", self.function, self.block)
    }
}

impl fmt::Debug for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}.b{}.i{}", self.function, self.block, self.inst)
    }
}

/// What an instruction does, as far as the distance analysis cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstKind {
    /// A call; `None` is an indirect call with an unresolved callee.
    Call(Option<FunctionId>),
    /// Return from the containing function.
    Return,
    /// Anything else.
    Other,
}

/// A single instruction.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub kind: InstKind,
}

/// A basic block: an instruction sequence ending in its terminator, plus
/// successor edges to other blocks of the same function.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub instructions: Vec<Instruction>,
    /// Successor block indexes within the containing function.
    pub successors: Vec<u32>,
}

/// A function. External (declaration-only) functions carry no blocks.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub blocks: Vec<Block>,
}

impl Function {
    /// Whether the function has a body. Declaration-only functions are
    /// treated as opaque by the analysis.
    pub fn has_body(&self) -> bool {
        !self.blocks.is_empty()
    }
}

/// An analyzed program: functions indexed by `FunctionId`, with a name
/// lookup table.
#[derive(Debug, Default)]
pub struct Module {
    functions: Vec<Function>,
    by_name: AHashMap<String, FunctionId>,
}

impl Module {
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn function_ids(&self) -> impl Iterator<Item = FunctionId> {
        (0..self.functions.len() as u32).map(FunctionId)
    }

    pub fn function_by_name(&self, name: &str) -> Option<FunctionId> {
        self.by_name.get(name).copied()
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.functions[id.function as usize].blocks[id.block as usize]
    }

    pub fn instruction(&self, id: InstId) -> &Instruction {
        &self.functions[id.function as usize].blocks[id.block as usize].instructions
            [id.inst as usize]
    }

    /// First instruction of a block, if the block has one.
    pub fn block_entry(&self, id: BlockId) -> Option<InstId> {
        let block = self.block(id);
        if block.instructions.is_empty() {
            return None;
        }
        Some(InstId {
            function: id.function,
            block: id.block,
            inst: 0,
        })
    }

    /// Entry instruction of a function: first instruction of its first
    /// block. `None` for declaration-only functions.
    pub fn entry_point(&self, id: FunctionId) -> Option<InstId> {
        let func = self.function(id);
        if !func.has_body() {
            return None;
        }
        self.block_entry(BlockId {
            function: id.0,
            block: 0,
        })
    }

    /// Whether an instruction is a direct call to the named function.
    pub fn is_call_to(&self, inst: &Instruction, name: &str) -> bool {
        match inst.kind {
            InstKind::Call(Some(callee)) => self.function(callee).name == name,
            _ => false,
        }
    }

    /// Whether the instruction is its block's terminator.
    pub fn is_terminator(&self, id: InstId) -> bool {
        let block = self.block(id.block());
        id.inst as usize + 1 == block.instructions.len()
    }
}

/// Incremental module construction for embedders and tests.
///
/// Functions must be declared (to obtain ids) before calls to them are
/// emitted; bodies can be filled in any order.
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a function with no body (external / declaration-only).
    pub fn declare(&mut self, name: &str) -> FunctionId {
        if let Some(id) = self.module.by_name.get(name) {
            return *id;
        }
        let id = FunctionId(self.module.functions.len() as u32);
        self.module.functions.push(Function {
            name: name.to_string(),
            blocks: Vec::new(),
        });
        self.module.by_name.insert(name.to_string(), id);
        id
    }

    /// Append a block to a function's body, returning its id. The first
    /// block appended is the function's entry.
    pub fn block(&mut self, function: FunctionId, instructions: Vec<InstKind>) -> BlockId {
        let func = &mut self.module.functions[function.0 as usize];
        let block = func.blocks.len() as u32;
        func.blocks.push(Block {
            instructions: instructions
                .into_iter()
                .map(|kind| Instruction { kind })
                .collect(),
            successors: Vec::new(),
        });
        BlockId {
            function: function.0,
            block,
        }
    }

    /// Add a control-flow edge between two blocks of the same function.
    pub fn edge(&mut self, from: BlockId, to: BlockId) {
        debug_assert_eq!(from.function, to.function);
        self.module.functions[from.function as usize].blocks[from.block as usize]
            .successors
            .push(to.block);
    }

    pub fn finish(self) -> Module {
        self.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_declares_and_resolves() {
        let mut b = ModuleBuilder::new();
        let main = b.declare("main");
        let ext = b.declare("abort");
        assert_ne!(main, ext);
        assert_eq!(b.declare("main"), main);

        let entry = b.block(main, vec![InstKind::Call(Some(ext)), InstKind::Return]);
        let m = b.finish();

        assert_eq!(m.function_by_name("main"), Some(main));
        assert_eq!(m.function_by_name("missing"), None);
        assert!(m.function(main).has_body());
        assert!(!m.function(ext).has_body());
        assert_eq!(m.entry_point(main), m.block_entry(entry));
        assert_eq!(m.entry_point(ext), None);
    }

    #[test]
    fn test_terminator_classification() {
        let mut b = ModuleBuilder::new();
        let f = b.declare("f");
        b.block(f, vec![InstKind::Other, InstKind::Other, InstKind::Return]);
        let m = b.finish();

        let last = InstId {
            function: f.0,
            block: 0,
            inst: 2,
        };
        let mid = InstId { inst: 1, ..last };
        assert!(m.is_terminator(last));
        assert!(!m.is_terminator(mid));
    }

    #[test]
    fn test_is_call_to() {
        let mut b = ModuleBuilder::new();
        let f = b.declare("f");
        let g = b.declare("g");
        b.block(f, vec![InstKind::Call(Some(g)), InstKind::Call(None)]);
        let m = b.finish();

        let direct = m.instruction(InstId {
            function: f.0,
            block: 0,
            inst: 0,
        });
        let indirect = m.instruction(InstId {
            function: f.0,
            block: 0,
            inst: 1,
        });
        assert!(m.is_call_to(direct, "g"));
        assert!(!m.is_call_to(direct, "h"));
        assert!(!m.is_call_to(indirect, "g"));
    }
}
