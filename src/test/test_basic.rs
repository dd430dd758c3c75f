/// Literals, locals, globals, control flow.
use super::{expect_bool, expect_nil, expect_number, expect_string, run};
use crate::lua_vm::disasm;
use crate::LuaState;

#[test]
fn test_return_literals() {
    expect_number("return 42", 42.0);
    expect_number("return 3.5", 3.5);
    expect_bool("return true", true);
    expect_bool("return false", false);
    expect_nil("return nil");
    expect_string("return 'hello'", "hello");
}

#[test]
fn test_local_variables() {
    expect_number("local x = 10 return x", 10.0);
    expect_number("local x = 1 local y = 2 return x + y", 3.0);
    expect_nil("local x return x");
}

#[test]
fn test_multiple_locals() {
    expect_number("local a, b, c = 1, 2, 3 return b", 2.0);
    expect_nil("local a, b = 1 return b");
    expect_number("local a, b = 1, 2, 3 return a + b", 3.0);
}

#[test]
fn test_globals() {
    expect_number("x = 7 return x", 7.0);
    expect_nil("return undefined_global");
    expect_number("x = 1 x = x + 1 return x", 2.0);
}

#[test]
fn test_assignment() {
    expect_number("local x = 1 x = 5 return x", 5.0);
    expect_number("local a, b = 1, 2 a, b = b, a return a * 10 + b", 21.0);
}

#[test]
fn test_if_statement() {
    expect_number("if true then return 1 end return 2", 1.0);
    expect_number("if false then return 1 end return 2", 2.0);
    expect_number("if nil then return 1 else return 2 end", 2.0);
    expect_number(
        "local x = 5
         if x > 10 then return 1
         elseif x > 3 then return 2
         else return 3 end",
        2.0,
    );
}

#[test]
fn test_zero_and_empty_string_are_true() {
    expect_number("if 0 then return 1 else return 2 end", 1.0);
    expect_number("if '' then return 1 else return 2 end", 1.0);
}

#[test]
fn test_while_loop() {
    expect_number(
        "local n = 0
         while n < 10 do n = n + 1 end
         return n",
        10.0,
    );
    expect_number("while false do end return 1", 1.0);
}

#[test]
fn test_repeat_loop() {
    expect_number(
        "local n = 0
         repeat n = n + 1 until n >= 5
         return n",
        5.0,
    );
    // Body runs at least once.
    expect_number("local n = 0 repeat n = n + 1 until true return n", 1.0);
}

#[test]
fn test_and_or_keep_operand_values() {
    expect_number("return 1 and 2", 2.0);
    expect_nil("return nil and 2");
    expect_number("return nil or 3", 3.0);
    expect_number("return false or 3", 3.0);
    expect_number("return 1 or error_not_evaluated()", 1.0);
    expect_bool("return false and error_not_evaluated()", false);
}

#[test]
fn test_do_block_scoping() {
    expect_number(
        "local x = 1
         do local x = 2 end
         return x",
        1.0,
    );
}

#[test]
fn test_nested_blocks() {
    expect_number(
        "local total = 0
         do
             local a = 1
             do
                 local b = 2
                 total = a + b
             end
         end
         return total",
        3.0,
    );
}

#[test]
fn test_string_values_are_interned() {
    let (state, results) = run("return 'abc', 'ab' .. 'c', 'abd'");
    assert_eq!(results.len(), 3);
    // Same byte sequence, same id: value equality is reference equality.
    assert_eq!(results[0].as_string_id(), results[1].as_string_id());
    assert_ne!(results[0].as_string_id(), results[2].as_string_id());
    assert_eq!(state.get_string(&results[0]).unwrap().as_str(), "abc");
}

#[test]
fn test_disassembler_lists_opcodes() {
    let mut state = LuaState::new();
    let proto = state
        .compile("local t = {} t[1] = 10 return #t", "<test>")
        .unwrap();
    let listing = disasm::disassemble(&state, proto);
    assert!(listing.contains("NewTable"));
    assert!(listing.contains("SetTable"));
    assert!(listing.contains("Len"));
    assert!(listing.contains("Ret"));
}
