// Expression compilation - strong-typed AST nodes in, registers out.

use super::helpers::*;
use super::{Compiler, stmt};
use crate::lua_vm::{EXPECT_ANY, Instruction, OpCode};
use emmylua_parser::{
    BinaryOperator, LuaAstNode, LuaBinaryExpr, LuaCallExpr, LuaClosureExpr, LuaExpr,
    LuaIndexExpr, LuaIndexKey, LuaLiteralExpr, LuaLiteralToken, LuaNameExpr, LuaParenExpr,
    LuaTableExpr, LuaUnaryExpr, UnaryOperator,
};

/// Compile any expression and return the register holding its value.
pub(crate) fn compile_expr(c: &mut Compiler, expr: &LuaExpr) -> Result<u32, String> {
    compile_expr_to(c, expr, None)
}

/// Compile into a specific register when the caller has one reserved.
pub(crate) fn compile_expr_to(
    c: &mut Compiler,
    expr: &LuaExpr,
    dest: Option<u32>,
) -> Result<u32, String> {
    match expr {
        LuaExpr::LiteralExpr(e) => compile_literal_expr(c, e, dest),
        LuaExpr::NameExpr(e) => compile_name_expr(c, e, dest),
        LuaExpr::BinaryExpr(e) => compile_binary_expr(c, e, dest),
        LuaExpr::UnaryExpr(e) => compile_unary_expr(c, e, dest),
        LuaExpr::ParenExpr(e) => compile_paren_expr(c, e, dest),
        LuaExpr::CallExpr(e) => compile_call_expr_to(c, e, dest),
        LuaExpr::IndexExpr(e) => compile_index_expr(c, e, dest),
        LuaExpr::TableExpr(e) => compile_table_expr(c, e, dest),
        LuaExpr::ClosureExpr(e) => compile_closure_expr_to(c, e, dest, false),
    }
}

pub(crate) fn is_dots_expr(expr: &LuaExpr) -> bool {
    matches!(expr, LuaExpr::LiteralExpr(lit)
        if matches!(lit.get_literal(), Some(LuaLiteralToken::Dots(_))))
}

fn compile_literal_expr(
    c: &mut Compiler,
    expr: &LuaLiteralExpr,
    dest: Option<u32>,
) -> Result<u32, String> {
    let reg = dest.unwrap_or_else(|| alloc_register(c));

    let token = expr.get_literal().ok_or("literal expression missing token")?;
    match token {
        LuaLiteralToken::Bool(b) => emit_load_bool(c, reg, b.is_true()),
        LuaLiteralToken::Nil(_) => emit_load_nil(c, reg),
        LuaLiteralToken::Number(num) => {
            let value = if num.is_float() {
                num.get_float_value()
            } else {
                num.get_int_value() as f64
            };
            emit_number(c, reg, value);
        }
        LuaLiteralToken::String(s) => emit_load_string(c, reg, &s.get_value()),
        LuaLiteralToken::Dots(_) => {
            // One value in expression position.
            emit(c, Instruction::create_asbx(OpCode::VarArg, reg, 1));
        }
        _ => return Err("unsupported literal".to_string()),
    }

    Ok(reg)
}

/// Named reads always copy into a fresh register: a captured local's own
/// register may be promoted, and Move dereferences the indirection.
fn compile_name_expr(
    c: &mut Compiler,
    expr: &LuaNameExpr,
    dest: Option<u32>,
) -> Result<u32, String> {
    let name = expr.get_name_text().unwrap_or_default();

    if let Some(local) = resolve_local(c, &name) {
        let reg = dest.unwrap_or_else(|| alloc_register(c));
        emit_move(c, reg, local.register);
        return Ok(reg);
    }

    if let Some(upvalue_index) = resolve_upvalue_from_chain(c, &name) {
        let reg = dest.unwrap_or_else(|| alloc_register(c));
        emit(
            c,
            Instruction::create_abc(OpCode::GetUpvalue, reg, upvalue_index as u32, 0),
        );
        return Ok(reg);
    }

    let reg = dest.unwrap_or_else(|| alloc_register(c));
    emit_get_global(c, &name, reg);
    Ok(reg)
}

fn compile_binary_expr(
    c: &mut Compiler,
    expr: &LuaBinaryExpr,
    dest: Option<u32>,
) -> Result<u32, String> {
    let (left, right) = expr.get_exprs().ok_or("binary expression missing operands")?;
    let op = expr.get_op_token().ok_or("binary expression missing operator")?;
    let op_kind = op.get_op();

    // Short-circuit forms keep the operand value, not a forced boolean.
    match op_kind {
        BinaryOperator::OpAnd => {
            let reg = dest.unwrap_or_else(|| alloc_register(c));
            compile_expr_to(c, &left, Some(reg))?;
            let skip = emit_jump(c, OpCode::JmpFalse, reg);
            compile_expr_to(c, &right, Some(reg))?;
            patch_jump_here(c, skip);
            return Ok(reg);
        }
        BinaryOperator::OpOr => {
            let reg = dest.unwrap_or_else(|| alloc_register(c));
            compile_expr_to(c, &left, Some(reg))?;
            let skip = emit_jump(c, OpCode::JmpTrue, reg);
            compile_expr_to(c, &right, Some(reg))?;
            patch_jump_here(c, skip);
            return Ok(reg);
        }
        _ => {}
    }

    let opcode = match op_kind {
        BinaryOperator::OpAdd => OpCode::Add,
        BinaryOperator::OpSub => OpCode::Sub,
        BinaryOperator::OpMul => OpCode::Mul,
        BinaryOperator::OpDiv => OpCode::Div,
        BinaryOperator::OpMod => OpCode::Mod,
        BinaryOperator::OpPow => OpCode::Pow,
        BinaryOperator::OpConcat => OpCode::Concat,
        BinaryOperator::OpLt => OpCode::Less,
        BinaryOperator::OpGt => OpCode::Greater,
        BinaryOperator::OpLe => OpCode::LessEqual,
        BinaryOperator::OpGe => OpCode::GreaterEqual,
        BinaryOperator::OpEq => OpCode::Equal,
        BinaryOperator::OpNe => OpCode::UnEqual,
        _ => return Err(format!("unsupported binary operator: {:?}", op_kind)),
    };

    let left_reg = compile_expr(c, &left)?;
    let right_reg = compile_expr(c, &right)?;
    let result_reg = dest.unwrap_or_else(|| alloc_register(c));
    emit(
        c,
        Instruction::create_abc(opcode, result_reg, left_reg, right_reg),
    );
    Ok(result_reg)
}

/// Unary operators work in place on their register, so the operand is
/// first materialized into the result register.
fn compile_unary_expr(
    c: &mut Compiler,
    expr: &LuaUnaryExpr,
    dest: Option<u32>,
) -> Result<u32, String> {
    let operand = expr.get_expr().ok_or("unary expression missing operand")?;
    let op = expr.get_op_token().ok_or("unary expression missing operator")?;

    let reg = dest.unwrap_or_else(|| alloc_register(c));
    compile_expr_to(c, &operand, Some(reg))?;

    match op.get_op() {
        UnaryOperator::OpUnm => {
            emit(c, Instruction::create_abc(OpCode::Neg, reg, 0, 0));
        }
        UnaryOperator::OpNot => {
            emit(c, Instruction::create_abc(OpCode::Not, reg, 0, 0));
        }
        UnaryOperator::OpLen => {
            emit(c, Instruction::create_abc(OpCode::Len, reg, 0, 0));
        }
        UnaryOperator::OpNop => {}
        other => return Err(format!("unsupported unary operator: {:?}", other)),
    }

    Ok(reg)
}

fn compile_paren_expr(
    c: &mut Compiler,
    expr: &LuaParenExpr,
    dest: Option<u32>,
) -> Result<u32, String> {
    let inner = expr.get_expr().ok_or("parenthesized expression is empty")?;
    compile_expr_to(c, &inner, dest)
}

fn compile_index_expr(
    c: &mut Compiler,
    expr: &LuaIndexExpr,
    dest: Option<u32>,
) -> Result<u32, String> {
    let prefix = expr.get_prefix_expr().ok_or("index expression missing table")?;
    let table_reg = compile_expr(c, &prefix)?;
    let key_reg = compile_index_key(c, expr)?;
    let result_reg = dest.unwrap_or_else(|| alloc_register(c));
    emit(
        c,
        Instruction::create_abc(OpCode::GetTable, table_reg, key_reg, result_reg),
    );
    Ok(result_reg)
}

/// Materialize the key of `t.k` / `t[e]` into a register.
pub(crate) fn compile_index_key(c: &mut Compiler, expr: &LuaIndexExpr) -> Result<u32, String> {
    let key = expr.get_index_key().ok_or("index expression missing key")?;
    match key {
        LuaIndexKey::Name(name_token) => {
            let reg = alloc_register(c);
            emit_load_string(c, reg, name_token.get_name_text());
            Ok(reg)
        }
        LuaIndexKey::String(string_token) => {
            let reg = alloc_register(c);
            emit_load_string(c, reg, &string_token.get_value());
            Ok(reg)
        }
        LuaIndexKey::Integer(number_token) => {
            let reg = alloc_register(c);
            emit_number(c, reg, number_token.get_int_value() as f64);
            Ok(reg)
        }
        LuaIndexKey::Expr(key_expr) => compile_expr(c, &key_expr),
        LuaIndexKey::Idx(_) => Err("unsupported index key".to_string()),
    }
}

// ============ Calls ============

fn compile_call_expr_to(
    c: &mut Compiler,
    expr: &LuaCallExpr,
    dest: Option<u32>,
) -> Result<u32, String> {
    let reg = compile_call_expr_with_returns(c, expr, 1)?;
    match dest {
        Some(d) if d != reg => {
            emit_move(c, d, reg);
            Ok(d)
        }
        _ => Ok(reg),
    }
}

/// Compile a call. `expect` is the result count the surrounding context
/// needs, or EXPECT_ANY to leave everything on the stack top. Returns the
/// base register: the function slot, where results land.
pub(crate) fn compile_call_expr_with_returns(
    c: &mut Compiler,
    expr: &LuaCallExpr,
    expect: i32,
) -> Result<u32, String> {
    let prefix = expr.get_prefix_expr().ok_or("call missing function expression")?;
    let args: Vec<LuaExpr> = expr
        .get_args_list()
        .ok_or("call missing argument list")?
        .get_args()
        .collect();

    let is_method = match &prefix {
        LuaExpr::IndexExpr(ie) => ie
            .get_index_token()
            .map(|t| t.is_colon())
            .unwrap_or(false),
        _ => false,
    };

    let func_reg = alloc_register(c);

    if is_method {
        // obj:m(...) sugar: m looked up in obj, obj passed as first arg.
        let LuaExpr::IndexExpr(index_expr) = &prefix else {
            return Err("method call without index expression".to_string());
        };
        let self_reg = alloc_register(c);
        let obj_expr = index_expr
            .get_prefix_expr()
            .ok_or("method call missing receiver")?;
        let obj_reg = compile_expr(c, &obj_expr)?;
        emit_move(c, self_reg, obj_reg);
        let key_reg = compile_index_key(c, index_expr)?;
        emit(
            c,
            Instruction::create_abc(OpCode::GetTable, obj_reg, key_reg, func_reg),
        );
    } else {
        compile_expr_to(c, &prefix, Some(func_reg))?;
    }

    let args_start = if is_method { func_reg + 2 } else { func_reg + 1 };
    c.next_register = args_start;
    touch_register(c, args_start);

    let mut spread_tail = false;
    for (i, arg) in args.iter().enumerate() {
        let is_last = i == args.len() - 1;
        let target = alloc_register(c);

        if is_last && is_dots_expr(arg) {
            // Forward every vararg; the callee's argument list runs to top.
            emit(c, Instruction::create_asbx(OpCode::VarArg, target, EXPECT_ANY));
            spread_tail = true;
            break;
        }
        if is_last {
            if let LuaExpr::CallExpr(inner) = arg {
                // Trailing call spreads all of its results.
                let inner_base = compile_call_expr_with_returns_at(c, inner, EXPECT_ANY, target)?;
                debug_assert_eq!(inner_base, target);
                spread_tail = true;
                break;
            }
        }

        compile_expr_to(c, arg, Some(target))?;
        c.next_register = target + 1;
    }

    let fixed_args = args_start - func_reg - 1 + args.len() as u32;
    let b_param = if spread_tail { 0 } else { fixed_args + 1 };
    let c_param = (expect + 1) as u32;
    emit(
        c,
        Instruction::create_abc(OpCode::Call, func_reg, b_param, c_param),
    );

    c.next_register = func_reg + expect.max(1) as u32;
    touch_register(c, c.next_register.saturating_sub(1));
    Ok(func_reg)
}

/// Compile an inner call whose function slot must land exactly at `base`.
fn compile_call_expr_with_returns_at(
    c: &mut Compiler,
    expr: &LuaCallExpr,
    expect: i32,
    base: u32,
) -> Result<u32, String> {
    c.next_register = base;
    touch_register(c, base);
    compile_call_expr_with_returns(c, expr, expect)
}

// ============ Table constructors ============

fn compile_table_expr(
    c: &mut Compiler,
    expr: &LuaTableExpr,
    dest: Option<u32>,
) -> Result<u32, String> {
    let reg = dest.unwrap_or_else(|| alloc_register(c));
    emit(c, Instruction::create_abc(OpCode::NewTable, reg, 0, 0));

    let fields: Vec<_> = expr.get_fields().collect();
    let mut array_index = 1usize;
    let scratch = c.next_register;

    for field in &fields {
        if field.is_value_field() {
            let Some(value_expr) = field.get_value_expr() else {
                continue;
            };
            let key_reg = alloc_register(c);
            emit_number(c, key_reg, array_index as f64);
            let value_reg = compile_expr(c, &value_expr)?;
            emit(
                c,
                Instruction::create_abc(OpCode::SetTable, reg, key_reg, value_reg),
            );
            array_index += 1;
        } else {
            let Some(field_key) = field.get_field_key() else {
                continue;
            };
            let key_reg = match field_key {
                LuaIndexKey::Name(name_token) => {
                    let r = alloc_register(c);
                    emit_load_string(c, r, name_token.get_name_text());
                    r
                }
                LuaIndexKey::String(string_token) => {
                    let r = alloc_register(c);
                    emit_load_string(c, r, &string_token.get_value());
                    r
                }
                LuaIndexKey::Integer(number_token) => {
                    let r = alloc_register(c);
                    emit_number(c, r, number_token.get_int_value() as f64);
                    r
                }
                LuaIndexKey::Expr(key_expr) => compile_expr(c, &key_expr)?,
                LuaIndexKey::Idx(_) => {
                    return Err("unsupported table field key".to_string());
                }
            };
            let value_reg = match field.get_value_expr() {
                Some(value_expr) => compile_expr(c, &value_expr)?,
                None => {
                    let r = alloc_register(c);
                    emit_load_nil(c, r);
                    r
                }
            };
            emit(
                c,
                Instruction::create_abc(OpCode::SetTable, reg, key_reg, value_reg),
            );
        }
        // Entry temps are dead once stored.
        c.next_register = scratch;
    }

    Ok(reg)
}

// ============ Closures ============

pub(crate) fn compile_closure_expr(
    c: &mut Compiler,
    closure: &LuaClosureExpr,
    is_method: bool,
) -> Result<u32, String> {
    compile_closure_expr_to(c, closure, None, is_method)
}

pub(crate) fn compile_closure_expr_to(
    c: &mut Compiler,
    closure: &LuaClosureExpr,
    dest: Option<u32>,
    is_method: bool,
) -> Result<u32, String> {
    let params: Vec<_> = closure
        .get_params_list()
        .ok_or("function missing parameter list")?
        .get_params()
        .collect();
    let body = closure.get_block();

    let source_name = c.source_name.clone();
    let parent_scope = c.scope_chain.clone();
    let line = u32::from(closure.get_range().start());

    let child_id = {
        let mut fc = super::Compiler::new_with_parent(
            &mut *c.pool,
            &mut *c.gc,
            c.lines,
            parent_scope,
            source_name,
        );
        fc.last_line = fc.lines.line_at(line);

        let mut param_count = 0usize;
        if is_method {
            let reg = alloc_register(&mut fc);
            add_local(&mut fc, "self".to_string(), reg);
            param_count += 1;
        }
        for (i, param) in params.iter().enumerate() {
            if param.is_dots() {
                fc.is_vararg = true;
                continue;
            }
            let name = match param.get_name_token() {
                Some(t) => t.get_name_text().to_string(),
                None => format!("param{}", i + 1),
            };
            let reg = alloc_register(&mut fc);
            add_local(&mut fc, name, reg);
            param_count += 1;
        }
        fc.fixed_arg_count = param_count;

        if let Some(block) = &body {
            stmt::compile_block(&mut fc, block)?;
        }

        let free = fc.next_register;
        emit(&mut fc, Instruction::create_asbx(OpCode::Ret, free, 0));
        fc.finish()
    };

    c.children.push(child_id);
    let child_index = (c.children.len() - 1) as u32;

    let reg = dest.unwrap_or_else(|| alloc_register(c));
    emit(c, Instruction::create_abx(OpCode::Closure, reg, child_index));
    Ok(reg)
}
