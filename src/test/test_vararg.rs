/// Vararg functions: copy, forwarding, counting.
use super::{expect_nil, expect_number, run};

#[test]
fn test_select_count() {
    expect_number(
        "return (function(...) return select('#', ...) end)(1, 2, 3, 4)",
        4.0,
    );
    expect_number("return (function(...) return select('#', ...) end)()", 0.0);
}

#[test]
fn test_vararg_passthrough_preserves_count_and_order() {
    let (_, results) = run(
        "local function id(...) return ... end
         return id(10, 20, 30)",
    );
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_number(), Some(10.0));
    assert_eq!(results[1].as_number(), Some(20.0));
    assert_eq!(results[2].as_number(), Some(30.0));
}

#[test]
fn test_vararg_fixed_copy_nil_fills() {
    expect_nil(
        "local function f(...)
             local a, b, c = ...
             return c
         end
         return f(1, 2)",
    );
    expect_number(
        "local function f(...)
             local a, b = ...
             return a + b
         end
         return f(4, 5, 6)",
        9.0,
    );
}

#[test]
fn test_fixed_params_before_vararg() {
    expect_number(
        "local function f(first, ...)
             return first + select('#', ...)
         end
         return f(100, 'a', 'b', 'c')",
        103.0,
    );
}

#[test]
fn test_vararg_single_value_in_expression() {
    expect_number(
        "local function f(...)
             local x = ...
             return x
         end
         return f(8, 9)",
        8.0,
    );
}

#[test]
fn test_vararg_forwarded_to_call() {
    expect_number(
        "local function sum3(a, b, c) return a + b + c end
         local function fwd(...) return sum3(...) end
         return fwd(1, 2, 3)",
        6.0,
    );
}

#[test]
fn test_select_from_position() {
    let (_, results) = run(
        "return (function(...) return select(2, ...) end)('a', 'b', 'c')",
    );
    assert_eq!(results.len(), 2);
}

#[test]
fn test_empty_vararg_forwarding() {
    let (_, results) = run(
        "local function id(...) return ... end
         return id()",
    );
    assert!(results.is_empty());
}
