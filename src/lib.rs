// lunar - a compact Lua-family scripting runtime
// Register-based bytecode VM with a tracing mark-sweep GC, first-class
// functions with shared upvalues, hybrid tables, and a host FFI.

#[cfg(test)]
mod test;

pub mod compiler;
pub mod gc;
pub mod lib_registry;
pub mod lua_value;
pub mod lua_vm;
pub mod stdlib;

pub use gc::{ClosureId, ObjectPool, ProtoId, StringId, TableId, UpvalueId};
pub use lib_registry::LibraryRegistry;
pub use lua_value::{LuaString, LuaTable, LuaValue, LuaValueKind, Prototype};
pub use lua_vm::{
    CFunction, CFunctionError, Instruction, LuaError, LuaResult, LuaState, OpCode,
};

/// Main entry point: run a chunk in a fresh state with the standard
/// library loaded and return its first result.
pub fn execute(source: &str) -> LuaResult<LuaValue> {
    let mut state = LuaState::new();
    state.open_libs();
    let results = state.execute_string(source)?;
    Ok(results.into_iter().next().unwrap_or_else(LuaValue::nil))
}
