// Test module organization
pub mod test_basic;
pub mod test_c_functions;
pub mod test_errors;
pub mod test_functions;
pub mod test_gc;
pub mod test_loops;
pub mod test_vararg;

use crate::{LuaError, LuaState, LuaValue};

/// Run a chunk in a fresh state with the standard library loaded.
pub(crate) fn run(source: &str) -> (LuaState, Vec<LuaValue>) {
    let mut state = LuaState::new();
    state.open_libs();
    let results = state
        .execute_string(source)
        .unwrap_or_else(|e| panic!("script failed: {}", e));
    (state, results)
}

pub(crate) fn run_err(source: &str) -> LuaError {
    let mut state = LuaState::new();
    state.open_libs();
    match state.execute_string(source) {
        Ok(_) => panic!("script succeeded but an error was expected"),
        Err(e) => e,
    }
}

pub(crate) fn expect_number(source: &str, expected: f64) {
    let (_, results) = run(source);
    let got = results
        .first()
        .and_then(|v| v.as_number())
        .unwrap_or_else(|| panic!("expected a number from: {}", source));
    assert_eq!(got, expected, "source: {}", source);
}

pub(crate) fn expect_bool(source: &str, expected: bool) {
    let (_, results) = run(source);
    let got = results
        .first()
        .and_then(|v| v.as_bool())
        .unwrap_or_else(|| panic!("expected a boolean from: {}", source));
    assert_eq!(got, expected, "source: {}", source);
}

pub(crate) fn expect_string(source: &str, expected: &str) {
    let (state, results) = run(source);
    let first = results.first().copied().unwrap_or_else(LuaValue::nil);
    let got = state
        .get_string(&first)
        .unwrap_or_else(|| panic!("expected a string from: {}", source));
    assert_eq!(got.as_str(), expected, "source: {}", source);
}

pub(crate) fn expect_nil(source: &str) {
    let (_, results) = run(source);
    let first = results.first().copied().unwrap_or_else(LuaValue::nil);
    assert!(first.is_nil(), "expected nil from: {}", source);
}
