/// Calls, returns, multiple values and the expected-result protocol.
use super::{expect_nil, expect_number, run, run_err};

#[test]
fn test_simple_call() {
    expect_number(
        "local function double(x) return x * 2 end
         return double(21)",
        42.0,
    );
}

#[test]
fn test_zero_arg_zero_return() {
    expect_nil(
        "local function noop() end
         return noop()",
    );
}

#[test]
fn test_multiple_returns() {
    let (_, results) = run(
        "local function pair() return 1, 2 end
         return pair()",
    );
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_number(), Some(1.0));
    assert_eq!(results[1].as_number(), Some(2.0));
}

#[test]
fn test_missing_results_fill_with_nil() {
    // Two values into three destinations: the third is nil.
    expect_nil("local a, b, c = (function() return 1, 2 end)() return c");
    expect_number("local a, b, c = (function() return 1, 2 end)() return b", 2.0);
}

#[test]
fn test_extra_results_are_dropped() {
    expect_number(
        "local a = (function() return 7, 8, 9 end)()
         return a",
        7.0,
    );
}

#[test]
fn test_missing_arguments_read_nil() {
    expect_nil(
        "local function second(a, b) return b end
         return second(1)",
    );
}

#[test]
fn test_extra_arguments_are_ignored() {
    expect_number(
        "local function first(a) return a end
         return first(5, 6, 7)",
        5.0,
    );
}

#[test]
fn test_call_in_middle_of_list_yields_one_value() {
    expect_number(
        "local function pair() return 1, 2 end
         local a, b = pair(), 10
         return a + b",
        11.0,
    );
}

#[test]
fn test_trailing_call_spreads_into_call_arguments() {
    expect_number(
        "local function pair() return 3, 4 end
         local function add(a, b) return a + b end
         return add(pair())",
        7.0,
    );
}

#[test]
fn test_parenthesized_call_truncates_to_one() {
    expect_number(
        "local function pair() return 3, 4 end
         local function add(a, b) return a + (b or 100) end
         return add((pair()))",
        103.0,
    );
}

#[test]
fn test_call_stack_depth_restored_after_call() {
    let mut state = crate::LuaState::new();
    state.open_libs();
    let depth_before = state.call_depth();
    state
        .execute_string("local function f() return 1 end f() f() return f()")
        .unwrap();
    assert_eq!(state.call_depth(), depth_before);
}

#[test]
fn test_nested_calls() {
    expect_number(
        "local function inc(x) return x + 1 end
         return inc(inc(inc(0)))",
        3.0,
    );
}

#[test]
fn test_function_as_value() {
    expect_number(
        "local t = {}
         t.f = function(x) return x * x end
         return t.f(9)",
        81.0,
    );
}

#[test]
fn test_method_call_sugar() {
    expect_number(
        "local obj = { factor = 3 }
         obj.scale = function(self, x) return self.factor * x end
         return obj:scale(5)",
        15.0,
    );
}

#[test]
fn test_runaway_recursion_overflows() {
    let err = run_err("local function f() return f() + 1 end return f()");
    assert!(err.message().contains("overflow"), "got: {}", err.message());
}

#[test]
fn test_results_spread_in_return_position() {
    let (_, results) = run(
        "local function pair() return 1, 2 end
         local function wrap() return pair() end
         return wrap()",
    );
    assert_eq!(results.len(), 2);
    assert_eq!(results[1].as_number(), Some(2.0));
}
