/// Host callables: the Stack API, result marshalling, error records.
use crate::{CFunctionError, LuaState, LuaValue, LuaValueKind};

fn host_add(state: &mut LuaState) -> usize {
    if !state.check_arg_count(2) {
        return 0;
    }
    let Some(a) = state.arg_number(0) else { return 0 };
    let Some(b) = state.arg_number(1) else { return 0 };
    state.push_number(a + b);
    1
}

fn host_three_values(state: &mut LuaState) -> usize {
    state.push_number(1.0);
    state.push_string("two");
    state.push_bool(true);
    3
}

fn host_table_len(state: &mut LuaState) -> usize {
    let Some(id) = state.arg_table(0) else { return 0 };
    let len = state
        .object_pool
        .get_table(id)
        .map(|t| t.array_len())
        .unwrap_or(0);
    state.push_number(len as f64);
    1
}

fn new_state_with(name: &str, func: crate::CFunction) -> LuaState {
    let mut state = LuaState::new();
    state.open_libs();
    state.set_global(name, LuaValue::cfunction(func));
    state
}

#[test]
fn test_host_function_reads_arguments() {
    let mut state = new_state_with("add", host_add);
    let results = state.execute_string("return add(2, 3)").unwrap();
    assert_eq!(results[0].as_number(), Some(5.0));
}

#[test]
fn test_host_multiple_results() {
    let mut state = new_state_with("three", host_three_values);
    let results = state.execute_string("return three()").unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_number(), Some(1.0));
    assert_eq!(state.get_string(&results[1]).unwrap().as_str(), "two");
    assert_eq!(results[2].as_bool(), Some(true));
}

#[test]
fn test_host_results_truncate_and_nil_fill() {
    let mut state = new_state_with("three", host_three_values);
    let results = state
        .execute_string("local a, b = three() return b")
        .unwrap();
    assert_eq!(state.get_string(&results[0]).unwrap().as_str(), "two");

    let results = state
        .execute_string("local a, b, c, d = three() return d")
        .unwrap();
    assert!(results[0].is_nil());
}

#[test]
fn test_host_arg_count_mismatch_raises() {
    let mut state = new_state_with("add", host_add);
    let err = state.execute_string("return add(1)").unwrap_err();
    assert!(
        err.message().contains("expect 2 arguments"),
        "got: {}",
        err.message()
    );
}

#[test]
fn test_host_arg_type_mismatch_raises() {
    let mut state = new_state_with("add", host_add);
    let err = state.execute_string("return add(1, 'x')").unwrap_err();
    assert!(
        err.message().contains("argument #2 is a string value"),
        "got: {}",
        err.message()
    );
}

#[test]
fn test_host_error_line_is_the_call_site() {
    let mut state = new_state_with("add", host_add);
    let err = state
        .execute_string("local ok = 1\nlocal also_ok = 2\nreturn add(1)")
        .unwrap_err();
    assert_eq!(err.line(), Some(3));
}

#[test]
fn test_host_function_receiving_table() {
    let mut state = new_state_with("tlen", host_table_len);
    let results = state
        .execute_string("return tlen({10, 20, 30})")
        .unwrap();
    assert_eq!(results[0].as_number(), Some(3.0));
}

#[test]
fn test_host_call_continues_interpreted_frame() {
    // The interpreter resumes the caller after the host frame pops.
    let mut state = new_state_with("add", host_add);
    let results = state
        .execute_string("local x = add(1, 2) return x * add(3, 4)")
        .unwrap();
    assert_eq!(results[0].as_number(), Some(21.0));
}

fn host_frame_probe(state: &mut LuaState) -> usize {
    let frame = state.current_call().expect("host frame missing");
    assert!(frame.is_host());
    state.push_number(state.arg_count() as f64);
    1
}

#[test]
fn test_host_frame_is_current_call_during_host_code() {
    let mut state = new_state_with("probe", host_frame_probe);
    let results = state.execute_string("return probe(1, 2, 3)").unwrap();
    assert_eq!(results[0].as_number(), Some(3.0));
}

#[test]
fn test_error_record_default_is_no_error() {
    let state = LuaState::new();
    assert_eq!(state.cfunc_error(), CFunctionError::NoError);
}

#[test]
fn test_arg_type_record_contents() {
    let mut state = LuaState::new();
    state.set_cfunc_error(CFunctionError::ArgType {
        index: 1,
        expected: LuaValueKind::Number,
    });
    assert!(matches!(
        state.cfunc_error(),
        CFunctionError::ArgType { index: 1, .. }
    ));
    state.clear_cfunc_error();
    assert_eq!(state.cfunc_error(), CFunctionError::NoError);
}
