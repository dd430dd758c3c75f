// Library registration: named host functions grouped into modules and
// installed into the global table.

use crate::lua_value::LuaValue;
use crate::lua_vm::{CFunction, LuaState};

/// A library module: a set of named host functions. The module named "_G"
/// registers its entries directly as globals; any other name gets a table.
pub struct LibraryModule {
    pub name: &'static str,
    pub entries: Vec<(&'static str, CFunction)>,
}

impl LibraryModule {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    pub fn with_function(mut self, name: &'static str, func: CFunction) -> Self {
        self.entries.push((name, func));
        self
    }
}

#[macro_export]
macro_rules! lib_module {
    ($name:expr, {
        $($item_name:expr => $item:expr),* $(,)?
    }) => {{
        let mut module = $crate::lib_registry::LibraryModule::new($name);
        $(
            module.entries.push(($item_name, $item));
        )*
        module
    }};
}

pub struct LibraryRegistry {
    modules: Vec<LibraryModule>,
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    pub fn register(&mut self, module: LibraryModule) {
        self.modules.push(module);
    }

    pub fn load_all(&self, state: &mut LuaState) {
        for module in &self.modules {
            self.load_module(state, module);
        }
    }

    fn load_module(&self, state: &mut LuaState, module: &LibraryModule) {
        if module.name == "_G" {
            for (name, func) in &module.entries {
                state.set_global(name, LuaValue::cfunction(*func));
            }
            return;
        }

        let lib_table = state.create_table();
        for (name, func) in &module.entries {
            let key = state.create_string(name);
            if let Some(id) = lib_table.as_table_id() {
                if let Some(t) = state.object_pool.get_table_mut(id) {
                    t.set(key, LuaValue::cfunction(*func));
                }
            }
        }
        state.set_global(module.name, lib_table);
    }
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The standard library wired into every state by `open_libs`.
pub fn create_standard_registry() -> LibraryRegistry {
    let mut registry = LibraryRegistry::new();
    registry.register(crate::stdlib::basic::create_basic_lib());
    registry
}
