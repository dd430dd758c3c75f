// Register access helpers. A register whose local was captured is tagged
// Upvalue and redirects reads/writes through the shared cell; `real_get`
// and `real_set` chase that one level of indirection.

use crate::gc::ProtoId;
use crate::lua_value::LuaValue;
use crate::lua_vm::LuaState;

#[inline(always)]
pub(crate) fn real_get(state: &LuaState, index: usize) -> LuaValue {
    let raw = state.stack_get(index);
    if let Some(id) = raw.as_upvalue_id() {
        return state
            .object_pool
            .get_upvalue(id)
            .map(|uv| uv.value)
            .unwrap_or_else(LuaValue::nil);
    }
    raw
}

#[inline(always)]
pub(crate) fn real_set(state: &mut LuaState, index: usize, value: LuaValue) {
    let raw = state.stack_get(index);
    if let Some(id) = raw.as_upvalue_id() {
        if let Some(uv) = state.object_pool.get_upvalue_mut(id) {
            uv.value = value;
        }
        return;
    }
    state.stack_set(index, value);
}

/// Prototype of the frame's closure.
pub(crate) fn frame_proto_id(state: &LuaState, frame_idx: usize) -> Option<ProtoId> {
    let frame = state.calls.get(frame_idx)?;
    let cl_id = state.stack_get(frame.func).as_closure_id()?;
    Some(state.object_pool.get_closure(cl_id)?.proto)
}

pub(crate) fn code_word(state: &LuaState, frame_idx: usize, pc: usize) -> Option<u32> {
    let proto_id = frame_proto_id(state, frame_idx)?;
    let proto = state.object_pool.get_proto(proto_id)?;
    proto.code.get(pc).copied()
}

pub(crate) fn const_value(state: &LuaState, frame_idx: usize, index: usize) -> LuaValue {
    frame_proto_id(state, frame_idx)
        .and_then(|id| state.object_pool.get_proto(id))
        .and_then(|p| p.constants.get(index).copied())
        .unwrap_or_else(LuaValue::nil)
}

/// Upvalue id at `index` in the frame's closure.
pub(crate) fn closure_upvalue(
    state: &LuaState,
    frame_idx: usize,
    index: usize,
) -> Option<crate::gc::UpvalueId> {
    let frame = state.calls.get(frame_idx)?;
    let cl_id = state.stack_get(frame.func).as_closure_id()?;
    state
        .object_pool
        .get_closure(cl_id)?
        .upvalues
        .get(index)
        .copied()
}
