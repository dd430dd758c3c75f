/// Numeric for: iteration counts, steps, break.
use super::expect_number;

#[test]
fn test_for_basic_count() {
    expect_number(
        "local n = 0
         for i = 1, 10 do n = n + 1 end
         return n",
        10.0,
    );
}

#[test]
fn test_for_accumulates_loop_variable() {
    expect_number(
        "local sum = 0
         for i = 1, 5 do sum = sum + i end
         return sum",
        15.0,
    );
}

#[test]
fn test_for_with_step() {
    expect_number(
        "local n = 0
         for i = 1, 10, 2 do n = n + 1 end
         return n",
        5.0,
    );
}

#[test]
fn test_for_negative_step() {
    expect_number(
        "local sum = 0
         for i = 5, 1, -1 do sum = sum + i end
         return sum",
        15.0,
    );
}

#[test]
fn test_for_zero_iterations() {
    expect_number(
        "local n = 0
         for i = 2, 1 do n = n + 1 end
         return n",
        0.0,
    );
    expect_number(
        "local n = 0
         for i = 1, 5, -1 do n = n + 1 end
         return n",
        0.0,
    );
}

#[test]
fn test_for_single_iteration_when_start_equals_limit() {
    expect_number(
        "local n = 0
         for i = 3, 3 do n = n + i end
         return n",
        3.0,
    );
}

#[test]
fn test_for_fractional_step() {
    // floor((2 - 1) / 0.5) + 1 = 3 iterations
    expect_number(
        "local n = 0
         for i = 1, 2, 0.5 do n = n + 1 end
         return n",
        3.0,
    );
}

#[test]
fn test_for_body_writes_do_not_derail_iteration() {
    expect_number(
        "local n = 0
         for i = 1, 3 do
             i = 100
             n = n + 1
         end
         return n",
        3.0,
    );
}

#[test]
fn test_for_concat_digits() {
    super::expect_string(
        "local s = ''
         for i = 1, 3 do s = s .. i end
         return s",
        "123",
    );
}

#[test]
fn test_break_exits_for() {
    expect_number(
        "local n = 0
         for i = 1, 100 do
             if i > 4 then break end
             n = n + 1
         end
         return n",
        4.0,
    );
}

#[test]
fn test_break_exits_while() {
    expect_number(
        "local n = 0
         while true do
             n = n + 1
             if n == 7 then break end
         end
         return n",
        7.0,
    );
}

#[test]
fn test_nested_for_loops() {
    expect_number(
        "local n = 0
         for i = 1, 3 do
             for j = 1, 4 do n = n + 1 end
         end
         return n",
        12.0,
    );
}

#[test]
fn test_for_limit_evaluated_once() {
    expect_number(
        "local limit = 3
         local n = 0
         for i = 1, limit do
             limit = 100
             n = n + 1
         end
         return n",
        3.0,
    );
}
