// Basic library (_G global functions)
// Implements: print, type, tostring, tonumber, select, collectgarbage

use crate::lib_registry::LibraryModule;
use crate::lua_value::{LuaValue, LuaValueKind};
use crate::lua_vm::{CFunctionError, LuaState};

pub fn create_basic_lib() -> LibraryModule {
    crate::lib_module!("_G", {
        "print" => lua_print,
        "type" => lua_type,
        "tostring" => lua_tostring,
        "tonumber" => lua_tonumber,
        "select" => lua_select,
        "collectgarbage" => lua_collectgarbage,
    })
}

/// print(...) - write every argument to stdout, tab separated.
fn lua_print(state: &mut LuaState) -> usize {
    let count = state.arg_count();
    let parts: Vec<String> = (0..count)
        .map(|i| {
            let v = state.arg(i);
            state.display_value(&v)
        })
        .collect();
    println!("{}", parts.join("\t"));
    0
}

/// type(v) - the type of a value as a string.
fn lua_type(state: &mut LuaState) -> usize {
    if state.arg_count() != 1 {
        state.set_cfunc_error(CFunctionError::ArgCount { expected: 1 });
        return 0;
    }
    let name = state.arg(0).type_name();
    state.push_string(name);
    1
}

/// tostring(v) - human-readable rendering of any value.
fn lua_tostring(state: &mut LuaState) -> usize {
    if state.arg_count() != 1 {
        state.set_cfunc_error(CFunctionError::ArgCount { expected: 1 });
        return 0;
    }
    let v = state.arg(0);
    let text = state.display_value(&v);
    state.push_string(&text);
    1
}

/// tonumber(v) - number for numbers and numeric strings, nil otherwise.
fn lua_tonumber(state: &mut LuaState) -> usize {
    if state.arg_count() != 1 {
        state.set_cfunc_error(CFunctionError::ArgCount { expected: 1 });
        return 0;
    }
    let v = state.arg(0);
    match v.kind() {
        LuaValueKind::Number => state.push_value(v),
        LuaValueKind::String => {
            let parsed = state
                .get_string(&v)
                .and_then(|s| s.as_str().trim().parse::<f64>().ok());
            match parsed {
                Some(n) => state.push_number(n),
                None => state.push_nil(),
            }
        }
        _ => state.push_nil(),
    }
    1
}

/// select('#', ...) - vararg count; select(n, ...) - values from n on.
fn lua_select(state: &mut LuaState) -> usize {
    let count = state.arg_count();
    if count == 0 {
        state.set_cfunc_error(CFunctionError::ArgCount { expected: 1 });
        return 0;
    }

    let selector = state.arg(0);
    if let Some(s) = state.get_string(&selector) {
        if s.as_str() == "#" {
            state.push_number((count - 1) as f64);
            return 1;
        }
    }

    let Some(n) = selector.as_number() else {
        state.set_cfunc_error(CFunctionError::ArgType {
            index: 0,
            expected: LuaValueKind::Number,
        });
        return 0;
    };
    if n < 1.0 || n.floor() != n {
        state.set_cfunc_error(CFunctionError::ArgType {
            index: 0,
            expected: LuaValueKind::Number,
        });
        return 0;
    }

    let start = n as usize;
    let mut pushed = 0;
    for i in start..count {
        let v = state.arg(i);
        state.push_value(v);
        pushed += 1;
    }
    pushed
}

/// collectgarbage([opt]) - force a full cycle, or report usage with "count".
fn lua_collectgarbage(state: &mut LuaState) -> usize {
    let opt = if state.arg_count() > 0 {
        state
            .get_string(&state.arg(0))
            .map(|s| s.as_str().to_string())
            .unwrap_or_default()
    } else {
        String::new()
    };

    if opt == "count" {
        let kb = state.gc().total_bytes() as f64 / 1024.0;
        state.push_number(kb);
        return 1;
    }

    state.collect_garbage();
    0
}
