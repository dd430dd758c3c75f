/// Collector behavior: reachability, identity preservation, reclamation.
use crate::LuaState;

#[test]
fn test_reachable_objects_survive_forced_collection() {
    let mut state = LuaState::new();
    state.open_libs();
    state
        .execute_string(
            "keep = { nested = { 'deep' }, n = 42 }
             keep_fn = function() return keep end",
        )
        .unwrap();

    state.collect_garbage();
    state.collect_garbage();

    let results = state
        .execute_string("return keep.nested[1], keep.n, keep_fn().n")
        .unwrap();
    assert_eq!(state.get_string(&results[0]).unwrap().as_str(), "deep");
    assert_eq!(results[1].as_number(), Some(42.0));
    assert_eq!(results[2].as_number(), Some(42.0));
}

#[test]
fn test_identity_preserved_across_collection() {
    let mut state = LuaState::new();
    state.open_libs();
    state.execute_string("t = {}").unwrap();
    let before = state.get_global("t");
    state.collect_garbage();
    let after = state.get_global("t");
    assert_eq!(before.as_table_id(), after.as_table_id());
    assert!(state.object_pool.contains_table(before.as_table_id().unwrap()));
}

#[test]
fn test_unreachable_objects_are_reclaimed() {
    let mut state = LuaState::new();
    state.open_libs();
    state
        .execute_string("for i = 1, 100 do local t = { i } end")
        .unwrap();

    state.collect_garbage();
    let live_tables = state.object_pool.table_count();

    // Nothing kept those loop tables alive; almost everything goes. The
    // globals table itself always survives.
    assert!(live_tables < 10, "live tables after collect: {}", live_tables);
}

#[test]
fn test_captured_upvalue_survives_creator_and_collection() {
    let mut state = LuaState::new();
    state.open_libs();
    state
        .execute_string(
            "local function mk()
                 local secret = 'survivor'
                 return function() return secret end
             end
             get = mk()",
        )
        .unwrap();

    state.collect_garbage();

    let results = state.execute_string("return get()").unwrap();
    assert_eq!(state.get_string(&results[0]).unwrap().as_str(), "survivor");
}

#[test]
fn test_dead_strings_leave_the_intern_pool() {
    let mut state = LuaState::new();
    state.open_libs();
    state
        .execute_string("local s = 'only' .. '-' .. 'transient'")
        .unwrap();
    let before = state.object_pool.string_count();
    state.collect_garbage();
    let after = state.object_pool.string_count();
    assert!(after <= before);

    // Re-interning after collection must still work.
    let v = state.create_string("only-transient");
    assert!(v.is_string());
}

#[test]
fn test_allocation_pressure_triggers_collection() {
    let mut state = LuaState::new();
    state.open_libs();
    let before = state.gc().collection_count();
    state
        .execute_string(
            "local acc = ''
             for i = 1, 2000 do
                 local t = { 'x' .. i }
                 acc = t[1]
             end
             return acc",
        )
        .unwrap();
    assert!(
        state.gc().collection_count() > before,
        "no automatic collection ran"
    );
}

#[test]
fn test_collectgarbage_host_function() {
    let mut state = LuaState::new();
    state.open_libs();
    let results = state
        .execute_string("collectgarbage() return collectgarbage('count')")
        .unwrap();
    assert!(results[0].as_number().unwrap() > 0.0);
}

#[test]
fn test_values_on_stack_are_roots_during_execution() {
    // The table passed through the host call must survive collections
    // triggered mid-script.
    let mut state = LuaState::new();
    state.open_libs();
    let results = state
        .execute_string(
            "local t = { marker = 'alive' }
             for i = 1, 2000 do
                 local junk = { i, i + 1, 'garbage' .. i }
             end
             return t.marker",
        )
        .unwrap();
    assert_eq!(state.get_string(&results[0]).unwrap().as_str(), "alive");
}
