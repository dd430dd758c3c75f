// Statement compilation

use super::expr::{
    compile_call_expr_with_returns, compile_closure_expr, compile_closure_expr_to, compile_expr,
    compile_expr_to, compile_index_key, is_dots_expr,
};
use super::helpers::*;
use super::Compiler;
use crate::lua_vm::{EXPECT_ANY, Instruction, OpCode};
use emmylua_parser::{
    LuaAssignStat, LuaBlock, LuaCallExprStat, LuaDoStat, LuaExpr, LuaForStat, LuaFuncStat,
    LuaIfStat, LuaLocalFuncStat, LuaLocalStat, LuaRepeatStat, LuaReturnStat, LuaStat,
    LuaVarExpr, LuaWhileStat,
};

pub(crate) fn compile_block(c: &mut Compiler, block: &LuaBlock) -> Result<(), String> {
    for stat in block.get_stats() {
        let mark = c.next_register;
        mark_line(c, &stat);
        compile_stat(c, &stat)?;

        // Statement temporaries are dead; registers that now hold locals
        // stay reserved. Block-bearing statements keep theirs too, since a
        // register promoted inside the block must never be reissued.
        match &stat {
            LuaStat::AssignStat(_)
            | LuaStat::CallExprStat(_)
            | LuaStat::ReturnStat(_)
            | LuaStat::EmptyStat(_) => {
                c.next_register = mark;
            }
            _ => {}
        }
    }
    Ok(())
}

fn compile_stat(c: &mut Compiler, stat: &LuaStat) -> Result<(), String> {
    match stat {
        LuaStat::LocalStat(s) => compile_local_stat(c, s),
        LuaStat::AssignStat(s) => compile_assign_stat(c, s),
        LuaStat::CallExprStat(s) => compile_call_stat(c, s),
        LuaStat::ReturnStat(s) => compile_return_stat(c, s),
        LuaStat::IfStat(s) => compile_if_stat(c, s),
        LuaStat::WhileStat(s) => compile_while_stat(c, s),
        LuaStat::RepeatStat(s) => compile_repeat_stat(c, s),
        LuaStat::ForStat(s) => compile_numeric_for_stat(c, s),
        LuaStat::ForRangeStat(_) => Err("generic 'for' is not supported".to_string()),
        LuaStat::DoStat(s) => compile_do_stat(c, s),
        LuaStat::BreakStat(_) => emit_break(c),
        LuaStat::GotoStat(_) | LuaStat::LabelStat(_) => Err("goto is not supported".to_string()),
        LuaStat::FuncStat(s) => compile_function_stat(c, s),
        LuaStat::LocalFuncStat(s) => compile_local_function_stat(c, s),
        LuaStat::EmptyStat(_) => Ok(()),
        _ => Ok(()),
    }
}

/// Fill destination registers `dests[from..]` from the expression list's
/// trailing expression, expanding calls and `...` to as many values as the
/// targets need, with nil fill.
fn compile_tail_values(
    c: &mut Compiler,
    last: &LuaExpr,
    dests: &[u32],
    from: usize,
) -> Result<(), String> {
    let remaining = dests.len() - from;
    if remaining == 1 {
        compile_expr_to(c, last, Some(dests[from]))?;
        return Ok(());
    }

    if let LuaExpr::CallExpr(call) = last {
        let base = compile_call_expr_with_returns(c, call, remaining as i32)?;
        for k in 0..remaining {
            touch_register(c, base + k as u32);
            emit_move(c, dests[from + k], base + k as u32);
        }
        return Ok(());
    }

    if is_dots_expr(last) {
        // Destination registers are consecutive; VarArg fills them directly.
        emit(
            c,
            Instruction::create_asbx(OpCode::VarArg, dests[from], remaining as i32),
        );
        return Ok(());
    }

    compile_expr_to(c, last, Some(dests[from]))?;
    for k in 1..remaining {
        emit_load_nil(c, dests[from + k]);
    }
    Ok(())
}

fn compile_local_stat(c: &mut Compiler, stat: &LuaLocalStat) -> Result<(), String> {
    let names: Vec<_> = stat.get_local_name_list().collect();
    let exprs: Vec<_> = stat.get_value_exprs().collect();

    let base = c.next_register;
    let dest_regs: Vec<u32> = (0..names.len()).map(|_| alloc_register(c)).collect();

    if exprs.is_empty() {
        for &r in &dest_regs {
            emit_load_nil(c, r);
        }
    } else {
        let value_count = exprs.len().min(names.len());
        for (i, expr) in exprs.iter().enumerate().take(value_count.saturating_sub(1)) {
            compile_expr_to(c, expr, Some(dest_regs[i]))?;
        }
        if exprs.len() >= names.len() {
            // No expansion needed; surplus expressions still run for
            // their side effects.
            compile_expr_to(c, &exprs[names.len() - 1], Some(dest_regs[names.len() - 1]))?;
            for expr in exprs.iter().skip(names.len()) {
                compile_expr(c, expr)?;
            }
        } else {
            compile_tail_values(c, exprs.last().unwrap(), &dest_regs, exprs.len() - 1)?;
        }
    }

    for (i, name) in names.iter().enumerate() {
        if let Some(token) = name.get_name_token() {
            add_local(c, token.get_name_text().to_string(), dest_regs[i]);
        }
    }

    c.next_register = base + names.len() as u32;
    Ok(())
}

fn compile_assign_stat(c: &mut Compiler, stat: &LuaAssignStat) -> Result<(), String> {
    let (vars, exprs) = stat.get_var_and_expr_list();
    if vars.is_empty() {
        return Ok(());
    }

    let val_regs: Vec<u32> = (0..vars.len()).map(|_| alloc_register(c)).collect();

    if exprs.is_empty() {
        for &r in &val_regs {
            emit_load_nil(c, r);
        }
    } else {
        let value_count = exprs.len().min(vars.len());
        for (i, expr) in exprs.iter().enumerate().take(value_count.saturating_sub(1)) {
            compile_expr_to(c, expr, Some(val_regs[i]))?;
        }
        if exprs.len() >= vars.len() {
            compile_expr_to(c, &exprs[vars.len() - 1], Some(val_regs[vars.len() - 1]))?;
            for expr in exprs.iter().skip(vars.len()) {
                compile_expr(c, expr)?;
            }
        } else {
            compile_tail_values(c, exprs.last().unwrap(), &val_regs, exprs.len() - 1)?;
        }
    }

    for (i, var) in vars.iter().enumerate() {
        store_var(c, var, val_regs[i])?;
    }
    Ok(())
}

/// Store `value_reg` into an assignable expression.
fn store_var(c: &mut Compiler, var: &LuaVarExpr, value_reg: u32) -> Result<(), String> {
    match var {
        LuaVarExpr::NameExpr(name_expr) => {
            let name = name_expr.get_name_text().unwrap_or_default();

            if let Some(local) = resolve_local(c, &name) {
                // Move writes through a promoted register, so assignment
                // to a captured local reaches the shared upvalue.
                emit_move(c, local.register, value_reg);
                return Ok(());
            }

            if let Some(upvalue_index) = resolve_upvalue_from_chain(c, &name) {
                emit(
                    c,
                    Instruction::create_abc(
                        OpCode::SetUpvalue,
                        value_reg,
                        upvalue_index as u32,
                        0,
                    ),
                );
                return Ok(());
            }

            emit_set_global(c, &name, value_reg);
            Ok(())
        }
        LuaVarExpr::IndexExpr(index_expr) => {
            let prefix = index_expr
                .get_prefix_expr()
                .ok_or("index assignment missing table")?;
            let table_reg = compile_expr(c, &prefix)?;
            let key_reg = compile_index_key(c, index_expr)?;
            emit(
                c,
                Instruction::create_abc(OpCode::SetTable, table_reg, key_reg, value_reg),
            );
            Ok(())
        }
    }
}

fn compile_call_stat(c: &mut Compiler, stat: &LuaCallExprStat) -> Result<(), String> {
    let call = stat.get_call_expr().ok_or("call statement missing expression")?;
    compile_call_expr_with_returns(c, &call, 0)?;
    Ok(())
}

fn compile_return_stat(c: &mut Compiler, stat: &LuaReturnStat) -> Result<(), String> {
    let exprs: Vec<_> = stat.get_expr_list().collect();

    if exprs.is_empty() {
        let free = c.next_register;
        emit(c, Instruction::create_asbx(OpCode::Ret, free, 0));
        return Ok(());
    }

    let base = c.next_register;
    for expr in exprs.iter().take(exprs.len() - 1) {
        let target = alloc_register(c);
        compile_expr_to(c, expr, Some(target))?;
        c.next_register = target + 1;
    }

    let last = exprs.last().unwrap();
    if let LuaExpr::CallExpr(call) = last {
        // The trailing call's results are forwarded without copying.
        let inner_base = compile_call_expr_with_returns(c, call, EXPECT_ANY)?;
        debug_assert_eq!(inner_base, base + exprs.len() as u32 - 1);
        emit(c, Instruction::create_asbx(OpCode::Ret, base, EXPECT_ANY));
    } else if is_dots_expr(last) {
        let target = alloc_register(c);
        emit(c, Instruction::create_asbx(OpCode::VarArg, target, EXPECT_ANY));
        emit(c, Instruction::create_asbx(OpCode::Ret, base, EXPECT_ANY));
    } else {
        let target = alloc_register(c);
        compile_expr_to(c, last, Some(target))?;
        emit(
            c,
            Instruction::create_asbx(OpCode::Ret, base, exprs.len() as i32),
        );
    }
    Ok(())
}

fn compile_if_stat(c: &mut Compiler, stat: &LuaIfStat) -> Result<(), String> {
    let mut end_jumps = Vec::new();

    if let Some(cond) = stat.get_condition_expr() {
        let cond_reg = compile_expr(c, &cond)?;
        let next_jump = emit_jump(c, OpCode::JmpFalse, cond_reg);

        if let Some(body) = stat.get_block() {
            begin_scope(c);
            compile_block(c, &body)?;
            end_scope(c);
        }
        end_jumps.push(emit_jump(c, OpCode::Jmp, 0));
        patch_jump_here(c, next_jump);
    }

    for clause in stat.get_else_if_clause_list() {
        if let Some(cond) = clause.get_condition_expr() {
            let cond_reg = compile_expr(c, &cond)?;
            let next_jump = emit_jump(c, OpCode::JmpFalse, cond_reg);

            if let Some(body) = clause.get_block() {
                begin_scope(c);
                compile_block(c, &body)?;
                end_scope(c);
            }
            end_jumps.push(emit_jump(c, OpCode::Jmp, 0));
            patch_jump_here(c, next_jump);
        }
    }

    if let Some(else_clause) = stat.get_else_clause() {
        if let Some(body) = else_clause.get_block() {
            begin_scope(c);
            compile_block(c, &body)?;
            end_scope(c);
        }
    }

    for pos in end_jumps {
        patch_jump_here(c, pos);
    }
    Ok(())
}

fn compile_while_stat(c: &mut Compiler, stat: &LuaWhileStat) -> Result<(), String> {
    let cond = stat
        .get_condition_expr()
        .ok_or("while statement missing condition")?;

    begin_loop(c);
    let head = c.code.len();

    let cond_reg = compile_expr(c, &cond)?;
    let exit_jump = emit_jump(c, OpCode::JmpFalse, cond_reg);

    if let Some(body) = stat.get_block() {
        begin_scope(c);
        compile_block(c, &body)?;
        end_scope(c);
    }

    let back_pos = c.code.len();
    emit(
        c,
        Instruction::create_asbx(OpCode::Jmp, 0, jump_offset(back_pos, head)),
    );
    patch_jump_here(c, exit_jump);
    end_loop(c);
    Ok(())
}

fn compile_repeat_stat(c: &mut Compiler, stat: &LuaRepeatStat) -> Result<(), String> {
    begin_loop(c);
    let head = c.code.len();

    // Body locals stay in scope for the until condition.
    begin_scope(c);
    if let Some(body) = stat.get_block() {
        compile_block(c, &body)?;
    }
    if let Some(cond) = stat.get_condition_expr() {
        let cond_reg = compile_expr(c, &cond)?;
        let pos = c.code.len();
        emit(
            c,
            Instruction::create_asbx(OpCode::JmpFalse, cond_reg, jump_offset(pos, head)),
        );
    }
    end_scope(c);

    end_loop(c);
    Ok(())
}

/// Numeric for. The internal counter, limit and step live in dedicated
/// registers; the named variable is a copy refreshed each iteration so
/// body writes cannot derail the loop. ForStep runs once before the first
/// iteration (unadvanced) and after every advance.
fn compile_numeric_for_stat(c: &mut Compiler, stat: &LuaForStat) -> Result<(), String> {
    let var_name = stat
        .get_var_name()
        .ok_or("'for' missing loop variable")?
        .get_name_text()
        .to_string();

    let exprs: Vec<_> = stat.get_iter_expr().collect();
    if exprs.len() < 2 {
        return Err("'for' needs start and limit expressions".to_string());
    }

    let counter_reg = alloc_register(c);
    let limit_reg = alloc_register(c);
    let step_reg = alloc_register(c);
    let user_reg = alloc_register(c);

    compile_expr_to(c, &exprs[0], Some(counter_reg))?;
    compile_expr_to(c, &exprs[1], Some(limit_reg))?;
    if exprs.len() >= 3 {
        compile_expr_to(c, &exprs[2], Some(step_reg))?;
    } else {
        emit_number(c, step_reg, 1.0);
    }

    emit(
        c,
        Instruction::create_abc(OpCode::ForInit, counter_reg, limit_reg, step_reg),
    );

    begin_loop(c);
    let head = c.code.len();
    emit(
        c,
        Instruction::create_abc(OpCode::ForStep, counter_reg, limit_reg, step_reg),
    );
    // ForStep consumes this word as its exit jump.
    let exit_word = emit(c, Instruction::create_asbx(OpCode::Jmp, 0, 0));

    begin_scope(c);
    add_local(c, var_name, user_reg);
    emit_move(c, user_reg, counter_reg);
    if let Some(body) = stat.get_block() {
        compile_block(c, &body)?;
    }
    end_scope(c);

    emit(
        c,
        Instruction::create_abc(OpCode::Add, counter_reg, counter_reg, step_reg),
    );
    let back_pos = c.code.len();
    emit(
        c,
        Instruction::create_asbx(OpCode::Jmp, 0, jump_offset(back_pos, head)),
    );

    patch_jump_here(c, exit_word);
    end_loop(c);
    Ok(())
}

fn compile_do_stat(c: &mut Compiler, stat: &LuaDoStat) -> Result<(), String> {
    begin_scope(c);
    if let Some(block) = stat.get_block() {
        compile_block(c, &block)?;
    }
    end_scope(c);
    Ok(())
}

fn compile_function_stat(c: &mut Compiler, stat: &LuaFuncStat) -> Result<(), String> {
    let func_name_var = stat
        .get_func_name()
        .ok_or("function statement missing name")?;
    let closure = stat
        .get_closure()
        .ok_or("function statement missing body")?;

    let is_colon = match &func_name_var {
        LuaVarExpr::IndexExpr(index_expr) => index_expr
            .get_index_token()
            .map(|t| t.is_colon())
            .unwrap_or(false),
        _ => false,
    };

    let func_reg = compile_closure_expr(c, &closure, is_colon)?;
    store_var(c, &func_name_var, func_reg)
}

fn compile_local_function_stat(c: &mut Compiler, stat: &LuaLocalFuncStat) -> Result<(), String> {
    let name = stat
        .get_local_name()
        .and_then(|n| n.get_name_token())
        .ok_or("local function missing name")?
        .get_name_text()
        .to_string();
    let closure = stat
        .get_closure()
        .ok_or("local function missing body")?;

    // Declared before the body compiles so the function can recurse.
    let func_reg = alloc_register(c);
    add_local(c, name, func_reg);
    compile_closure_expr_to(c, &closure, Some(func_reg), false)?;
    Ok(())
}
