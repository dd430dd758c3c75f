// Concatenation. Operands must be strings or numbers; the result is a
// freshly interned string.

use crate::lua_value::{LuaValue, LuaValueKind};
use crate::lua_vm::{LuaResult, LuaState, debug_info};

/// Numbers stringify as integers when the value equals its floor,
/// otherwise in shortest decimal form.
pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_finite() && n.floor() == n && n.abs() < 9.2e18 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn operand_to_string(state: &LuaState, v: &LuaValue) -> Option<String> {
    match v.kind() {
        LuaValueKind::String => state.get_string(v).map(|s| s.as_str().to_string()),
        LuaValueKind::Number => Some(number_to_string(v.as_number().unwrap())),
        _ => None,
    }
}

pub(crate) fn concat(
    state: &mut LuaState,
    dst: usize,
    lhs: usize,
    rhs: usize,
) -> LuaResult<()> {
    let b = state.stack_get(lhs);
    let c = state.stack_get(rhs);

    let left = operand_to_string(state, &b);
    let right = operand_to_string(state, &c);
    let (left, right) = match (left, right) {
        (Some(l), Some(r)) => (l, r),
        _ => return Err(debug_info::binary_op_error(state, &b, &c, "concat")),
    };

    let result = state.create_string(&format!("{}{}", left, right));
    state.stack_set(dst, result);
    Ok(())
}
