// Error construction: source line lookup and operand naming.
//
// When an opcode traps on a bad operand, the register that produced it is
// traced by scanning backwards from the current pc for the most recent
// instruction that wrote to it; the name comes from that instruction.

use crate::lua_value::LuaValue;
use crate::lua_vm::{Instruction, LuaError, LuaState, OpCode};

/// Line of the instruction the current frame just executed. Zero when no
/// interpreted frame is live.
pub(crate) fn current_line(state: &LuaState) -> u32 {
    let Some(frame) = state.calls.last() else {
        return 0;
    };
    if frame.is_host() {
        return 0;
    }
    let proto = state
        .stack_get(frame.func)
        .as_closure_id()
        .and_then(|id| state.object_pool.get_closure(id))
        .and_then(|cl| state.object_pool.get_proto(cl.proto));
    match proto {
        Some(p) => p.instruction_line(frame.pc.saturating_sub(1)),
        None => 0,
    }
}

/// Name and scope of the operand in `reg_abs`, when recoverable.
pub(crate) fn operand_name_and_scope(state: &LuaState, reg_abs: usize) -> (String, &'static str) {
    let unknown = ("?".to_string(), "");

    let Some(frame) = state.calls.last() else {
        return unknown;
    };
    if frame.is_host() || reg_abs < frame.base {
        return unknown;
    }
    let reg = (reg_abs - frame.base) as u32;

    let Some(proto) = state
        .stack_get(frame.func)
        .as_closure_id()
        .and_then(|id| state.object_pool.get_closure(id))
        .and_then(|cl| state.object_pool.get_proto(cl.proto))
    else {
        return unknown;
    };

    let current_pc = frame.pc.saturating_sub(1);
    let mut pc = current_pc;
    while pc > 0 {
        pc -= 1;
        let instr = proto.code[pc];
        match Instruction::get_opcode(instr) {
            OpCode::GetGlobal => {
                if Instruction::get_a(instr) == reg {
                    let key = proto.const_value(Instruction::get_bx(instr) as usize);
                    return match state.get_string(&key) {
                        Some(s) => (s.as_str().to_string(), "global"),
                        None => unknown,
                    };
                }
            }
            OpCode::Move => {
                if Instruction::get_a(instr) == reg {
                    let src = Instruction::get_b(instr);
                    return match proto.search_local_var(src, current_pc as u32) {
                        Some(name) => (name.to_string(), "local"),
                        None => unknown,
                    };
                }
            }
            OpCode::GetUpvalue => {
                if Instruction::get_a(instr) == reg {
                    let index = Instruction::get_b(instr) as usize;
                    if index < proto.upvalue_count() {
                        return (proto.upvalue(index).name.clone(), "upvalue");
                    }
                    return unknown;
                }
            }
            OpCode::GetTable => {
                if Instruction::get_c(instr) == reg {
                    let key_reg = frame.base + Instruction::get_b(instr) as usize;
                    let key = state.stack_get(key_reg);
                    return match state.get_string(&key) {
                        Some(s) => (s.as_str().to_string(), "table member"),
                        None => ("?".to_string(), "table member"),
                    };
                }
            }
            _ => {}
        }
    }

    unknown
}

/// Operand type error on a single register, e.g. "call", "length of".
pub(crate) fn type_error(state: &LuaState, reg_abs: usize, op: &str) -> LuaError {
    let value = state.stack_get(reg_abs);
    let (name, scope) = operand_name_and_scope(state, reg_abs);
    let line = current_line(state);
    let message = if scope.is_empty() {
        format!("attempt to {} a {} value", op, value.type_name())
    } else {
        format!(
            "attempt to {} {} '{}' (a {} value)",
            op,
            scope,
            name,
            value.type_name()
        )
    };
    LuaError::Runtime { message, line }
}

/// Two-operand type error for arithmetic, comparison and concat.
pub(crate) fn binary_op_error(
    state: &LuaState,
    lhs: &LuaValue,
    rhs: &LuaValue,
    op: &str,
) -> LuaError {
    LuaError::Runtime {
        message: format!(
            "attempt to {} a '{}' with a '{}'",
            op,
            lhs.type_name(),
            rhs.type_name()
        ),
        line: current_line(state),
    }
}

/// Indexing a non-table, for both reads and writes.
pub(crate) fn table_error(
    state: &LuaState,
    table_reg: usize,
    key: &LuaValue,
    op: &str,
    direction: &str,
) -> LuaError {
    let key_name = state
        .get_string(key)
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|| "?".to_string());
    let op_desc = format!("{} table key '{}' {}", op, key_name, direction);
    type_error(state, table_reg, &op_desc)
}

/// Numeric-for control value with the wrong type.
pub(crate) fn for_error(state: &LuaState, value: &LuaValue, role: &str) -> LuaError {
    LuaError::Runtime {
        message: format!("{} must be a number (got {})", role, value.type_name()),
        line: current_line(state),
    }
}

pub(crate) fn runtime_error(state: &LuaState, message: &str) -> LuaError {
    LuaError::Runtime {
        message: message.to_string(),
        line: current_line(state),
    }
}
