// Calling convention: frame construction for interpreted closures, the
// host-callable bridge, the return protocol, closure construction with
// register promotion, and the vararg copy.

use crate::lua_value::{LuaValue, LuaValueKind};
use crate::lua_vm::{
    CFunctionError, CallInfo, EXPECT_ANY, Instruction, LuaError, LuaResult, LuaState,
    MAX_CALL_DEPTH, debug_info,
};

/// Dispatch a Call opcode. Returns true when a new interpreted frame was
/// pushed and the dispatcher must re-enter its outer loop; host calls
/// complete in place.
pub(crate) fn handle_call(state: &mut LuaState, a: usize, instr: u32) -> LuaResult<bool> {
    let b = Instruction::get_b(instr) as usize;
    let c = Instruction::get_c(instr) as usize;

    // B encodes argc + 1; 0 means the arguments already extend to top.
    if b != 0 {
        state.set_top(a + b);
    }
    let expect = c as i32 - 1;

    match state.stack_get(a).kind() {
        LuaValueKind::Closure => {
            push_closure_frame(state, a, expect)?;
            Ok(true)
        }
        LuaValueKind::CFunction => {
            call_c_function(state, a, expect)?;
            Ok(false)
        }
        _ => Err(debug_info::type_error(state, a, "call")),
    }
}

/// Build a frame for the closure sitting at `func_idx`. Arguments occupy
/// `func_idx + 1 .. top`. Vararg functions get their register base above
/// the incoming arguments, with the fixed ones copied up.
pub(crate) fn push_closure_frame(
    state: &mut LuaState,
    func_idx: usize,
    expect_results: i32,
) -> LuaResult<()> {
    if state.calls.len() >= MAX_CALL_DEPTH {
        return Err(debug_info::runtime_error(state, "call stack overflow"));
    }

    let cl_id = match state.stack_get(func_idx).as_closure_id() {
        Some(id) => id,
        None => return Err(debug_info::type_error(state, func_idx, "call")),
    };
    let (fixed, is_vararg, end, max_stack) = {
        let proto_id = state.object_pool.get_closure(cl_id).map(|cl| cl.proto);
        let proto = proto_id.and_then(|id| state.object_pool.get_proto(id));
        match proto {
            Some(p) => (p.fixed_arg_count, p.is_vararg, p.op_count(), p.max_stack_size),
            None => return Err(debug_info::runtime_error(state, "closure has no prototype")),
        }
    };

    let arg_start = func_idx + 1;
    let available = state.top.saturating_sub(arg_start);

    let base = if is_vararg {
        // Fixed params move to the bottom of the new window; the varargs
        // stay below the base in [arg_start, base).
        let base = state.top;
        for i in 0..available.min(fixed) {
            let v = state.stack_get(arg_start + i);
            state.stack_set(base + i, v);
        }
        base
    } else {
        arg_start
    };

    // Clean window: missing parameters and scratch registers read nil.
    state.grow_stack(base + max_stack);
    for i in (base + available.min(fixed))..(base + max_stack) {
        state.stack_set(i, LuaValue::nil());
    }

    state.set_top(base + fixed);
    state
        .calls
        .push(CallInfo::new_lua(func_idx, base, end, expect_results));
    Ok(())
}

/// Bridge to a host callable. Runs the function, checks its error record,
/// marshals results back to the function slot and pops the host frame.
pub(crate) fn call_c_function(
    state: &mut LuaState,
    func_idx: usize,
    expect_results: i32,
) -> LuaResult<()> {
    let Some(cfunc) = state.stack_get(func_idx).as_cfunction() else {
        return Err(debug_info::type_error(state, func_idx, "call"));
    };

    state
        .calls
        .push(CallInfo::new_host(func_idx, func_idx + 1, expect_results));
    state.clear_cfunc_error();

    let result_count = cfunc(state);
    check_cfunction_error(state)?;

    let src = state.top.saturating_sub(result_count);
    let dst = func_idx;

    let copied = if expect_results == EXPECT_ANY {
        for i in 0..result_count {
            let v = state.stack_get(src + i);
            state.stack_set(dst + i, v);
        }
        result_count
    } else {
        let expect = expect_results as usize;
        let count = expect.min(result_count);
        for i in 0..count {
            let v = state.stack_get(src + i);
            state.stack_set(dst + i, v);
        }
        for i in count..expect {
            state.stack_set(dst + i, LuaValue::nil());
        }
        expect
    };

    state.set_top(dst + copied);
    state.calls.pop();
    Ok(())
}

/// Convert a non-empty CFunctionError record into a runtime error. The
/// host frame is popped first so the reported line is the caller's call
/// instruction.
fn check_cfunction_error(state: &mut LuaState) -> LuaResult<()> {
    let message = match state.cfunc_error {
        CFunctionError::NoError => return Ok(()),
        CFunctionError::ArgCount { expected } => {
            format!("expect {} arguments", expected)
        }
        CFunctionError::ArgType { index, expected } => {
            let arg = state.arg(index);
            format!(
                "argument #{} is a {} value, expect a {} value",
                index + 1,
                arg.type_name(),
                kind_name(expected)
            )
        }
    };

    state.calls.pop();
    let line = debug_info::current_line(state);
    Err(LuaError::Runtime { message, line })
}

fn kind_name(kind: LuaValueKind) -> &'static str {
    match kind {
        LuaValueKind::Nil => "nil",
        LuaValueKind::Boolean => "boolean",
        LuaValueKind::Number => "number",
        LuaValueKind::String => "string",
        LuaValueKind::Table => "table",
        LuaValueKind::Closure | LuaValueKind::CFunction => "function",
        LuaValueKind::Upvalue => "upvalue",
    }
}

/// Ret A sBx. Copies results from `a` to the frame's function slot,
/// honoring the caller's expected count with nil fill, then pops.
pub(crate) fn do_return(state: &mut LuaState, a: usize, sbx: i32) {
    if sbx != EXPECT_ANY {
        state.set_top(a + sbx as usize);
    }

    let frame = *state.calls.last().expect("return without a frame");
    let src = a;
    let dst = frame.func;
    let result_count = state.top.saturating_sub(src);

    let copied = if frame.expect_results == EXPECT_ANY {
        for i in 0..result_count {
            let v = state.stack_get(src + i);
            state.stack_set(dst + i, v);
        }
        result_count
    } else {
        let expect = frame.expect_results as usize;
        let count = expect.min(result_count);
        for i in 0..count {
            let v = state.stack_get(src + i);
            state.stack_set(dst + i, v);
        }
        for i in count..expect {
            state.stack_set(dst + i, LuaValue::nil());
        }
        expect
    };

    state.set_top(dst + copied);
    state.calls.pop();
}

/// Closure A Bx. Instantiates a child prototype, capturing upvalues per
/// its descriptor list. Capturing a parent local promotes that register
/// in place, so sibling closures observe the same upvalue identity.
pub(crate) fn generate_closure(
    state: &mut LuaState,
    frame_idx: usize,
    a: usize,
    bx: usize,
) -> LuaResult<()> {
    let frame = state.calls[frame_idx];

    let parent_cl_id = match state.stack_get(frame.func).as_closure_id() {
        Some(id) => id,
        None => return Err(debug_info::runtime_error(state, "frame has no closure")),
    };
    let (child_proto, descs) = {
        let parent = state.object_pool.get_closure(parent_cl_id);
        let proto = parent
            .and_then(|cl| state.object_pool.get_proto(cl.proto));
        match proto {
            Some(p) => {
                let child = p.child(bx);
                let descs = state
                    .object_pool
                    .get_proto(child)
                    .map(|cp| cp.upvalues.clone())
                    .unwrap_or_default();
                (child, descs)
            }
            None => return Err(debug_info::runtime_error(state, "frame has no prototype")),
        }
    };

    // The closure lands in its register before any capture runs: a
    // self-recursive local function captures its own slot, and the
    // promotion below must find the closure value already there.
    let closure = state.create_closure(child_proto, Vec::with_capacity(descs.len()));
    state.stack_set(a, closure);
    let Some(new_cl_id) = closure.as_closure_id() else {
        return Err(debug_info::runtime_error(state, "closure allocation failed"));
    };

    for desc in &descs {
        let captured = if desc.in_parent_stack {
            let reg = frame.base + desc.index as usize;
            let cell = state.stack_get(reg);
            if let Some(existing) = cell.as_upvalue_id() {
                existing
            } else {
                // First capture: promote the register in place.
                let id = state.create_upvalue(cell);
                state.stack_set(reg, LuaValue::upvalue(id));
                id
            }
        } else {
            let inherited = state
                .object_pool
                .get_closure(parent_cl_id)
                .and_then(|cl| cl.upvalues.get(desc.index as usize).copied());
            match inherited {
                Some(id) => id,
                None => {
                    return Err(debug_info::runtime_error(
                        state,
                        "closure captures missing upvalue",
                    ));
                }
            }
        };
        if let Some(cl) = state.object_pool.get_closure_mut(new_cl_id) {
            cl.upvalues.push(captured);
        }
    }
    Ok(())
}

/// VarArg A sBx. Copies the extra arguments of the current vararg frame
/// into registers starting at `a`.
pub(crate) fn copy_vararg(state: &mut LuaState, frame_idx: usize, a: usize, sbx: i32) {
    let frame = state.calls[frame_idx];
    let fixed = state
        .stack_get(frame.func)
        .as_closure_id()
        .and_then(|id| state.object_pool.get_closure(id))
        .and_then(|cl| state.object_pool.get_proto(cl.proto))
        .map(|p| p.fixed_arg_count)
        .unwrap_or(0);

    let arg_base = frame.func + 1;
    let total_args = frame.base.saturating_sub(arg_base);
    let vararg_count = total_args.saturating_sub(fixed);
    let src = arg_base + fixed;

    if sbx == EXPECT_ANY {
        for i in 0..vararg_count {
            let v = state.stack_get(src + i);
            state.stack_set(a + i, v);
        }
        state.set_top(a + vararg_count);
    } else {
        let expect = sbx as usize;
        let count = expect.min(vararg_count);
        for i in 0..count {
            let v = state.stack_get(src + i);
            state.stack_set(a + i, v);
        }
        for i in count..expect {
            state.stack_set(a + i, LuaValue::nil());
        }
    }
}
