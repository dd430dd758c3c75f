// Bytecode compiler - walks the emmylua_parser AST and emits opcodes.
mod expr;
mod helpers;
mod stmt;

use crate::gc::{GC, ObjectPool, ProtoId};
use crate::lua_value::{LocalVarDesc, LuaValue, Prototype, UpvalueDesc};
use crate::lua_vm::{Instruction, OpCode};
use emmylua_parser::{LuaLanguageLevel, LuaParser, ParserConfig};
use std::cell::RefCell;
use std::rc::Rc;

/// Scope chain for variable and upvalue resolution. Child function bodies
/// link to their parent's chain so free names resolve outward.
pub(crate) struct ScopeChain {
    pub(crate) locals: Vec<Local>,
    pub(crate) upvalues: Vec<Upvalue>,
    pub(crate) parent: Option<Rc<RefCell<ScopeChain>>>,
}

impl ScopeChain {
    pub(crate) fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(ScopeChain {
            locals: Vec::new(),
            upvalues: Vec::new(),
            parent: None,
        }))
    }

    pub(crate) fn new_with_parent(parent: Rc<RefCell<ScopeChain>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(ScopeChain {
            locals: Vec::new(),
            upvalues: Vec::new(),
            parent: Some(parent),
        }))
    }
}

/// Local variable info
#[derive(Clone)]
pub(crate) struct Local {
    pub(crate) name: String,
    pub(crate) depth: usize,
    pub(crate) register: u32,
    /// Index of this local's entry in the debug table, for end-pc patching.
    pub(crate) debug_index: usize,
}

/// Upvalue information gathered during resolution.
#[derive(Clone)]
pub(crate) struct Upvalue {
    pub(crate) name: String,
    /// true if this captures a local of the immediate parent frame,
    /// false if it captures an entry of the parent's upvalue list.
    pub(crate) is_local: bool,
    pub(crate) index: u32,
}

/// Loop information for break statements
pub(crate) struct LoopInfo {
    pub(crate) break_jumps: Vec<usize>,
}

/// Byte offset -> 1-based source line, built once per compile.
pub(crate) struct LineMap {
    starts: Vec<u32>,
}

impl LineMap {
    pub(crate) fn new(source: &str) -> Self {
        let mut starts = vec![0u32];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i as u32 + 1);
            }
        }
        Self { starts }
    }

    pub(crate) fn line_at(&self, offset: u32) -> u32 {
        match self.starts.binary_search(&offset) {
            Ok(i) => i as u32 + 1,
            Err(i) => i as u32,
        }
    }
}

/// Compiler state for one function body.
pub(crate) struct Compiler<'a> {
    pub(crate) pool: &'a mut ObjectPool,
    pub(crate) gc: &'a mut GC,
    pub(crate) lines: &'a LineMap,
    pub(crate) source_name: String,

    pub(crate) code: Vec<u32>,
    pub(crate) constants: Vec<LuaValue>,
    pub(crate) children: Vec<ProtoId>,
    pub(crate) line_info: Vec<u32>,
    pub(crate) last_line: u32,
    pub(crate) locals_debug: Vec<LocalVarDesc>,

    pub(crate) scope_chain: Rc<RefCell<ScopeChain>>,
    pub(crate) scope_depth: usize,
    pub(crate) next_register: u32,
    pub(crate) max_register: u32,
    pub(crate) loop_stack: Vec<LoopInfo>,

    pub(crate) fixed_arg_count: usize,
    pub(crate) is_vararg: bool,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(
        pool: &'a mut ObjectPool,
        gc: &'a mut GC,
        lines: &'a LineMap,
        source_name: String,
    ) -> Self {
        Compiler {
            pool,
            gc,
            lines,
            source_name,
            code: Vec::new(),
            constants: Vec::new(),
            children: Vec::new(),
            line_info: Vec::new(),
            last_line: 0,
            locals_debug: Vec::new(),
            scope_chain: ScopeChain::new(),
            scope_depth: 0,
            next_register: 0,
            max_register: 0,
            loop_stack: Vec::new(),
            fixed_arg_count: 0,
            is_vararg: false,
        }
    }

    pub(crate) fn new_with_parent(
        pool: &'a mut ObjectPool,
        gc: &'a mut GC,
        lines: &'a LineMap,
        parent_scope: Rc<RefCell<ScopeChain>>,
        source_name: String,
    ) -> Self {
        let mut c = Self::new(pool, gc, lines, source_name);
        c.scope_chain = ScopeChain::new_with_parent(parent_scope);
        c
    }

    /// Seal the accumulated code into a prototype in the pool.
    pub(crate) fn finish(self) -> ProtoId {
        let end_pc = self.code.len() as u32;
        let mut locals = self.locals_debug;
        for l in locals.iter_mut() {
            if l.end_pc == u32::MAX {
                l.end_pc = end_pc;
            }
        }

        let upvalues: Vec<UpvalueDesc> = self
            .scope_chain
            .borrow()
            .upvalues
            .iter()
            .map(|uv| UpvalueDesc {
                name: uv.name.clone(),
                in_parent_stack: uv.is_local,
                index: uv.index,
            })
            .collect();

        let proto = Prototype {
            code: self.code,
            constants: self.constants,
            children: self.children,
            upvalues,
            fixed_arg_count: self.fixed_arg_count,
            is_vararg: self.is_vararg,
            line_info: self.line_info,
            locals,
            max_stack_size: self.max_register as usize + 1,
            source_name: self.source_name,
        };
        self.pool.create_proto(proto, self.gc)
    }
}

/// Compile a chunk into a top-level prototype. The main chunk is vararg.
pub fn compile(
    source: &str,
    chunk_name: &str,
    pool: &mut ObjectPool,
    gc: &mut GC,
) -> Result<ProtoId, String> {
    let tree = LuaParser::parse(source, ParserConfig::with_level(LuaLanguageLevel::Lua54));
    if tree.has_syntax_errors() {
        let errors: Vec<String> = tree
            .get_errors()
            .iter()
            .map(|e| format!("{:?}", e))
            .collect();
        return Err(format!("syntax error: {}", errors.join(", ")));
    }

    let chunk = tree.get_chunk_node();
    let lines = LineMap::new(source);
    let mut c = Compiler::new(pool, gc, &lines, chunk_name.to_string());
    c.is_vararg = true;

    if let Some(block) = chunk.get_block() {
        stmt::compile_block(&mut c, &block)?;
    }

    // Implicit final return with no values.
    let free = c.next_register;
    helpers::emit(&mut c, Instruction::create_asbx(OpCode::Ret, free, 0));

    Ok(c.finish())
}
