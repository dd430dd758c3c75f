// Value cell, interned string and the immutable compiled prototype.
mod lua_table;
mod lua_value;

pub use lua_table::LuaTable;
pub use lua_value::{
    ID_MASK, LuaValue, LuaValueKind, TAG_CFUNCTION, TAG_CLOSURE, TAG_FALSE, TAG_MASK, TAG_NIL,
    TAG_NUMBER, TAG_STRING, TAG_TABLE, TAG_TRUE, TAG_UPVALUE,
};

use crate::gc::ProtoId;

/// Interned immutable string with its cached hash.
#[derive(Debug, Clone)]
pub struct LuaString {
    hash: u64,
    data: String,
}

impl LuaString {
    pub fn with_hash(s: String, hash: u64) -> Self {
        LuaString { hash, data: s }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn cached_hash(&self) -> u64 {
        self.hash
    }
}

/// How a closure captures one upvalue: either a register slot in the
/// immediate parent frame, or a position in the parent closure's own
/// upvalue list.
#[derive(Debug, Clone)]
pub struct UpvalueDesc {
    pub name: String,
    pub in_parent_stack: bool,
    pub index: u32,
}

/// Debug record mapping a register to a local variable name over a pc range.
/// Only consulted when building error messages.
#[derive(Debug, Clone)]
pub struct LocalVarDesc {
    pub name: String,
    pub register: u32,
    pub start_pc: u32,
    pub end_pc: u32,
}

/// Immutable compiled form of one function body.
pub struct Prototype {
    pub code: Vec<u32>,
    pub constants: Vec<LuaValue>,
    pub children: Vec<ProtoId>,
    pub upvalues: Vec<UpvalueDesc>,
    pub fixed_arg_count: usize,
    pub is_vararg: bool,
    /// Source line for each code word.
    pub line_info: Vec<u32>,
    pub locals: Vec<LocalVarDesc>,
    /// Register count the dispatcher must reserve for a frame of this function.
    pub max_stack_size: usize,
    pub source_name: String,
}

impl Prototype {
    #[inline]
    pub fn op_count(&self) -> usize {
        self.code.len()
    }

    #[inline]
    pub fn const_value(&self, index: usize) -> LuaValue {
        self.constants[index]
    }

    #[inline]
    pub fn child(&self, index: usize) -> ProtoId {
        self.children[index]
    }

    #[inline]
    pub fn upvalue(&self, index: usize) -> &UpvalueDesc {
        &self.upvalues[index]
    }

    #[inline]
    pub fn upvalue_count(&self) -> usize {
        self.upvalues.len()
    }

    pub fn instruction_line(&self, pc: usize) -> u32 {
        self.line_info.get(pc).copied().unwrap_or(0)
    }

    /// Name of the local stored in `register` at `pc`, if any.
    pub fn search_local_var(&self, register: u32, pc: u32) -> Option<&str> {
        self.locals
            .iter()
            .find(|l| l.register == register && l.start_pc <= pc && pc < l.end_pc)
            .map(|l| l.name.as_str())
    }
}
