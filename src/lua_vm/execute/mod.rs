/*----------------------------------------------------------------------
  The instruction dispatcher.

  Single outer loop: a Call into an interpreted closure pushes a frame
  and returns control here so the new frame becomes current; Ret pops
  and returns likewise. Host calls complete inside the current frame.
  The back frame is re-read after every push/pop, and the frame's pc is
  committed before each instruction executes so error reporting always
  sees the offending pc.
----------------------------------------------------------------------*/

mod call;
mod concat;
mod helper;

pub(crate) use call::push_closure_frame;
pub(crate) use concat::number_to_string;

use crate::lua_value::{LuaValue, LuaValueKind};
use crate::lua_vm::{
    EXPECT_ANY, Instruction, LuaResult, LuaState, OpCode, debug_info,
};
use helper::{closure_upvalue, code_word, const_value, real_get, real_set};

/// Run frames until the call list shrinks back to `target_depth`.
pub(crate) fn run(state: &mut LuaState, target_depth: usize) -> LuaResult<()> {
    while state.calls.len() > target_depth {
        execute_frame(state)?;
    }
    Ok(())
}

/// Execute the back frame until it returns, or until it pushes a new
/// interpreted frame (the outer loop then re-enters with that frame).
fn execute_frame(state: &mut LuaState) -> LuaResult<()> {
    let frame_idx = state.calls.len() - 1;

    loop {
        let frame = state.calls[frame_idx];
        if frame.pc >= frame.end {
            break;
        }

        state.check_gc();

        let instr = match code_word(state, frame_idx, frame.pc) {
            Some(w) => w,
            None => break,
        };
        state.calls[frame_idx].pc = frame.pc + 1;

        let base = frame.base;
        let a = base + Instruction::get_a(instr) as usize;

        match Instruction::get_opcode(instr) {
            OpCode::LoadNil => {
                real_set(state, a, LuaValue::nil());
            }
            OpCode::LoadBool => {
                let b = Instruction::get_b(instr);
                real_set(state, a, LuaValue::boolean(b != 0));
            }
            OpCode::LoadInt => {
                // The next code word is a raw integer. Written without the
                // upvalue indirection: the compiler only targets registers
                // that cannot have been promoted yet.
                let pc = state.calls[frame_idx].pc;
                let word = code_word(state, frame_idx, pc).unwrap_or(0);
                state.calls[frame_idx].pc = pc + 1;
                state.stack_set(a, LuaValue::number(word as i32 as f64));
            }
            OpCode::LoadConst => {
                let k = const_value(state, frame_idx, Instruction::get_bx(instr) as usize);
                real_set(state, a, k);
            }
            OpCode::Move => {
                let v = real_get(state, base + Instruction::get_b(instr) as usize);
                real_set(state, a, v);
            }
            OpCode::GetUpvalue => {
                let index = Instruction::get_b(instr) as usize;
                let v = closure_upvalue(state, frame_idx, index)
                    .and_then(|id| state.object_pool.get_upvalue(id))
                    .map(|uv| uv.value)
                    .unwrap_or_else(LuaValue::nil);
                real_set(state, a, v);
            }
            OpCode::SetUpvalue => {
                let index = Instruction::get_b(instr) as usize;
                let v = state.stack_get(a);
                if let Some(id) = closure_upvalue(state, frame_idx, index) {
                    if let Some(uv) = state.object_pool.get_upvalue_mut(id) {
                        uv.value = v;
                    }
                }
            }
            OpCode::GetGlobal => {
                let key = const_value(state, frame_idx, Instruction::get_bx(instr) as usize);
                let v = state
                    .object_pool
                    .get_table(state.globals_id())
                    .map(|t| t.get(&key))
                    .unwrap_or_else(LuaValue::nil);
                real_set(state, a, v);
            }
            OpCode::SetGlobal => {
                let key = const_value(state, frame_idx, Instruction::get_bx(instr) as usize);
                let v = state.stack_get(a);
                let global = state.globals_id();
                if let Some(t) = state.object_pool.get_table_mut(global) {
                    t.set(key, v);
                }
            }
            OpCode::NewTable => {
                let t = state.create_table();
                state.stack_set(a, t);
            }
            OpCode::SetTable => {
                let key = state.stack_get(base + Instruction::get_b(instr) as usize);
                let value = state.stack_get(base + Instruction::get_c(instr) as usize);
                let Some(tid) = state.stack_get(a).as_table_id() else {
                    return Err(debug_info::table_error(state, a, &key, "set", "to"));
                };
                if key.is_nil() {
                    return Err(debug_info::runtime_error(state, "table index is nil"));
                }
                if let Some(t) = state.object_pool.get_table_mut(tid) {
                    t.set(key, value);
                }
            }
            OpCode::GetTable => {
                let key = state.stack_get(base + Instruction::get_b(instr) as usize);
                let c = base + Instruction::get_c(instr) as usize;
                let Some(tid) = state.stack_get(a).as_table_id() else {
                    return Err(debug_info::table_error(state, a, &key, "get", "from"));
                };
                let v = state
                    .object_pool
                    .get_table(tid)
                    .map(|t| t.get(&key))
                    .unwrap_or_else(LuaValue::nil);
                state.stack_set(c, v);
            }
            OpCode::Closure => {
                call::generate_closure(
                    state,
                    frame_idx,
                    a,
                    Instruction::get_bx(instr) as usize,
                )?;
            }
            OpCode::VarArg => {
                call::copy_vararg(state, frame_idx, a, Instruction::get_sbx(instr));
            }
            OpCode::Call => {
                if call::handle_call(state, a, instr)? {
                    return Ok(());
                }
            }
            OpCode::Ret => {
                call::do_return(state, a, Instruction::get_sbx(instr));
                return Ok(());
            }
            OpCode::JmpFalse => {
                if real_get(state, a).is_falsey() {
                    jump(state, frame_idx, Instruction::get_sbx(instr));
                }
            }
            OpCode::JmpTrue => {
                if real_get(state, a).is_truthy() {
                    jump(state, frame_idx, Instruction::get_sbx(instr));
                }
            }
            OpCode::JmpNil => {
                if state.stack_get(a).is_nil() {
                    jump(state, frame_idx, Instruction::get_sbx(instr));
                }
            }
            OpCode::Jmp => {
                jump(state, frame_idx, Instruction::get_sbx(instr));
            }
            OpCode::Neg => {
                let Some(n) = state.stack_get(a).as_number() else {
                    return Err(debug_info::type_error(state, a, "neg"));
                };
                state.stack_set(a, LuaValue::number(-n));
            }
            OpCode::Not => {
                let v = state.stack_get(a);
                state.stack_set(a, LuaValue::boolean(v.is_falsey()));
            }
            OpCode::Len => {
                let v = state.stack_get(a);
                match v.kind() {
                    LuaValueKind::Table => {
                        let len = v
                            .as_table_id()
                            .and_then(|id| state.object_pool.get_table(id))
                            .map(|t| t.array_len())
                            .unwrap_or(0);
                        state.stack_set(a, LuaValue::number(len as f64));
                    }
                    LuaValueKind::String => {
                        let len = state.get_string(&v).map(|s| s.len()).unwrap_or(0);
                        state.stack_set(a, LuaValue::number(len as f64));
                    }
                    _ => return Err(debug_info::type_error(state, a, "length of")),
                }
            }
            OpCode::Add => arith(state, instr, base, a, "add", |x, y| x + y)?,
            OpCode::Sub => arith(state, instr, base, a, "sub", |x, y| x - y)?,
            OpCode::Mul => arith(state, instr, base, a, "multiply", |x, y| x * y)?,
            OpCode::Div => arith(state, instr, base, a, "div", |x, y| x / y)?,
            OpCode::Pow => arith(state, instr, base, a, "power", f64::powf)?,
            // Floating remainder, same sign as the dividend.
            OpCode::Mod => arith(state, instr, base, a, "mod", |x, y| x % y)?,
            OpCode::Concat => {
                let b = base + Instruction::get_b(instr) as usize;
                let c = base + Instruction::get_c(instr) as usize;
                concat::concat(state, a, b, c)?;
            }
            OpCode::Less => compare(state, instr, base, a, "compare(<)", CmpOp::Lt)?,
            OpCode::Greater => compare(state, instr, base, a, "compare(>)", CmpOp::Gt)?,
            OpCode::LessEqual => compare(state, instr, base, a, "compare(<=)", CmpOp::Le)?,
            OpCode::GreaterEqual => compare(state, instr, base, a, "compare(>=)", CmpOp::Ge)?,
            OpCode::Equal => {
                let b = state.stack_get(base + Instruction::get_b(instr) as usize);
                let c = state.stack_get(base + Instruction::get_c(instr) as usize);
                state.stack_set(a, LuaValue::boolean(b == c));
            }
            OpCode::UnEqual => {
                let b = state.stack_get(base + Instruction::get_b(instr) as usize);
                let c = state.stack_get(base + Instruction::get_c(instr) as usize);
                state.stack_set(a, LuaValue::boolean(b != c));
            }
            OpCode::ForInit => {
                let b = base + Instruction::get_b(instr) as usize;
                let c = base + Instruction::get_c(instr) as usize;
                for (idx, role) in [(a, "'for' init"), (b, "'for' limit"), (c, "'for' step")] {
                    let v = state.stack_get(idx);
                    if !v.is_number() {
                        return Err(debug_info::for_error(state, &v, role));
                    }
                }
            }
            OpCode::ForStep => {
                // The trailing word is the exit jump, consumed here.
                let pc = state.calls[frame_idx].pc;
                let word = code_word(state, frame_idx, pc).unwrap_or(0);
                state.calls[frame_idx].pc = pc + 1;

                let var = state.stack_get(a).as_number().unwrap_or(0.0);
                let limit = state
                    .stack_get(base + Instruction::get_b(instr) as usize)
                    .as_number()
                    .unwrap_or(0.0);
                let step = state
                    .stack_get(base + Instruction::get_c(instr) as usize)
                    .as_number()
                    .unwrap_or(0.0);

                if (step > 0.0 && var > limit) || (step <= 0.0 && var < limit) {
                    jump(state, frame_idx, Instruction::get_sbx(word));
                }
            }
        }
    }

    // Fell off the end of the code without a Ret: only the bootstrap path
    // takes this, compiled functions always end in Ret.
    let frame = state.calls[frame_idx];
    state.set_top(frame.func);
    if frame.expect_results != EXPECT_ANY {
        let want = frame.expect_results as usize;
        for i in 0..want {
            state.stack_set(frame.func + i, LuaValue::nil());
        }
        state.set_top(frame.func + want);
    }
    state.calls.pop();
    Ok(())
}

#[inline(always)]
fn jump(state: &mut LuaState, frame_idx: usize, sbx: i32) {
    let pc = state.calls[frame_idx].pc as i64 + sbx as i64 - 1;
    state.calls[frame_idx].pc = pc.max(0) as usize;
}

#[inline(always)]
fn arith(
    state: &mut LuaState,
    instr: u32,
    base: usize,
    a: usize,
    op: &str,
    f: impl Fn(f64, f64) -> f64,
) -> LuaResult<()> {
    let b = state.stack_get(base + Instruction::get_b(instr) as usize);
    let c = state.stack_get(base + Instruction::get_c(instr) as usize);
    match (b.as_number(), c.as_number()) {
        (Some(x), Some(y)) => {
            state.stack_set(a, LuaValue::number(f(x, y)));
            Ok(())
        }
        _ => Err(debug_info::binary_op_error(state, &b, &c, op)),
    }
}

#[derive(Clone, Copy)]
enum CmpOp {
    Lt,
    Gt,
    Le,
    Ge,
}

/// Inequality comparisons require matching Number or String tags; strings
/// order lexicographically by bytes. NaN operands compare false, they do
/// not raise.
#[inline(always)]
fn compare(
    state: &mut LuaState,
    instr: u32,
    base: usize,
    a: usize,
    name: &str,
    op: CmpOp,
) -> LuaResult<()> {
    let b = state.stack_get(base + Instruction::get_b(instr) as usize);
    let c = state.stack_get(base + Instruction::get_c(instr) as usize);

    let result = if b.is_number() && c.is_number() {
        let x = b.as_number().unwrap();
        let y = c.as_number().unwrap();
        Some(match op {
            CmpOp::Lt => x < y,
            CmpOp::Gt => x > y,
            CmpOp::Le => x <= y,
            CmpOp::Ge => x >= y,
        })
    } else if b.is_string() && c.is_string() {
        let lhs = state.get_string(&b).map(|s| s.as_str().as_bytes().to_vec());
        let rhs = state.get_string(&c).map(|s| s.as_str().as_bytes().to_vec());
        match (lhs, rhs) {
            (Some(l), Some(r)) => Some(match op {
                CmpOp::Lt => l < r,
                CmpOp::Gt => l > r,
                CmpOp::Le => l <= r,
                CmpOp::Ge => l >= r,
            }),
            _ => None,
        }
    } else {
        None
    };

    match result {
        Some(v) => {
            state.stack_set(a, LuaValue::boolean(v));
            Ok(())
        }
        None => Err(debug_info::binary_op_error(state, &b, &c, name)),
    }
}
