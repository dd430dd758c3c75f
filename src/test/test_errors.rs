/// Runtime errors: operand typing, operand naming, line attribution.
use super::run_err;
use crate::LuaError;

#[test]
fn test_add_number_and_string() {
    let err = run_err("return 1 + 'a'");
    assert!(err.message().contains("add"), "got: {}", err.message());
    assert!(err.message().contains("string"), "got: {}", err.message());
    assert_eq!(err.line(), Some(1));
}

#[test]
fn test_error_line_attribution() {
    let err = run_err(
        "local x = 1\n\
         local y = 2\n\
         return x + 'bad'",
    );
    assert_eq!(err.line(), Some(3));
}

#[test]
fn test_call_nil_global_names_the_global() {
    let err = run_err("return no_such_function()");
    assert!(err.message().contains("call"), "got: {}", err.message());
    assert!(
        err.message().contains("global 'no_such_function'"),
        "got: {}",
        err.message()
    );
    assert!(err.message().contains("nil"), "got: {}", err.message());
}

#[test]
fn test_call_nil_local_names_the_local() {
    let err = run_err("local handler return handler()");
    assert!(
        err.message().contains("local 'handler'"),
        "got: {}",
        err.message()
    );
}

#[test]
fn test_call_missing_table_member_names_the_member() {
    let err = run_err("local t = {} return t.missing()");
    assert!(
        err.message().contains("table member 'missing'"),
        "got: {}",
        err.message()
    );
}

#[test]
fn test_unnamed_operand_reports_question_mark_form() {
    let err = run_err("return (1)()");
    // No producer: plain message without a name.
    assert!(
        err.message().contains("attempt to call a number value"),
        "got: {}",
        err.message()
    );
}

#[test]
fn test_index_non_table_names_key_and_source() {
    let err = run_err("local x = 5 return x.y");
    assert!(
        err.message().contains("table key 'y'"),
        "got: {}",
        err.message()
    );
    assert!(err.message().contains("local 'x'"), "got: {}", err.message());
}

#[test]
fn test_length_of_unsupported_type() {
    let err = run_err("return #true");
    assert!(err.message().contains("length of"), "got: {}", err.message());
}

#[test]
fn test_compare_mismatched_types() {
    let err = run_err("return 1 < 'a'");
    assert!(err.message().contains("compare"), "got: {}", err.message());
}

#[test]
fn test_compare_unsupported_tags() {
    let err = run_err("return {} < {}");
    assert!(err.message().contains("compare"), "got: {}", err.message());
}

#[test]
fn test_concat_unsupported_operand() {
    let err = run_err("return 'x' .. true");
    assert!(err.message().contains("concat"), "got: {}", err.message());
    assert!(err.message().contains("boolean"), "got: {}", err.message());
}

#[test]
fn test_neg_non_number() {
    let err = run_err("return -'abc'");
    assert!(err.message().contains("neg"), "got: {}", err.message());
}

#[test]
fn test_for_control_values_must_be_numbers() {
    let err = run_err("for i = {}, 2 do end");
    assert!(err.message().contains("'for' init"), "got: {}", err.message());

    let err = run_err("for i = 1, 'x' do end");
    assert!(
        err.message().contains("'for' limit"),
        "got: {}",
        err.message()
    );

    let err = run_err("for i = 1, 2, nil do end");
    assert!(err.message().contains("'for' step"), "got: {}", err.message());
}

#[test]
fn test_host_arg_count_error_points_at_caller_line() {
    let err = run_err("local a = 1\nreturn type()");
    assert!(
        err.message().contains("expect 1 arguments"),
        "got: {}",
        err.message()
    );
    assert_eq!(err.line(), Some(2));
}

#[test]
fn test_host_arg_type_error() {
    let err = run_err("return select(true, 1, 2)");
    assert!(
        err.message().contains("argument #1 is a boolean value"),
        "got: {}",
        err.message()
    );
    assert!(err.message().contains("expect a number"), "got: {}", err.message());
}

#[test]
fn test_syntax_error_is_a_compile_error() {
    let err = run_err("local = = 1");
    assert!(matches!(err, LuaError::Compile { .. }));
}

#[test]
fn test_error_unwinds_all_frames() {
    let mut state = crate::LuaState::new();
    state.open_libs();
    let depth = state.call_depth();
    let result = state.execute_string(
        "local function deep(n)
             if n == 0 then return nil + 1 end
             return deep(n - 1)
         end
         return deep(10)",
    );
    assert!(result.is_err());
    assert_eq!(state.call_depth(), depth);

    // The state stays usable after an error.
    let results = state.execute_string("return 5").unwrap();
    assert_eq!(results[0].as_number(), Some(5.0));
}

#[test]
fn test_table_index_nil_is_an_error_on_write() {
    let err = run_err("local t = {} t[nil] = 1");
    assert!(err.message().contains("nil"), "got: {}", err.message());
}
