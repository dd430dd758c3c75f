// Execution state: the value stack, the call list, the global table and
// the collectable-object pool all live here. Single-threaded; host
// callables run to completion on the caller's thread.

use crate::compiler;
use crate::gc::{GC, ObjectPool, ProtoId, TableId, UpvalueId};
use crate::lua_value::{LuaString, LuaValue, LuaValueKind};
use crate::lua_vm::{
    CFunctionError, CallInfo, EXPECT_ANY, LuaError, LuaResult, ModuleManager,
};

use super::execute;

pub struct LuaState {
    /// Flat value stack. `top` marks the live prefix; cells above it are
    /// dead unless they fall inside an active frame's register window.
    pub(crate) stack: Vec<LuaValue>,
    pub(crate) top: usize,

    /// Activation records, innermost last. The dispatcher always works on
    /// the back frame and re-reads it after any push or pop.
    pub(crate) calls: Vec<CallInfo>,

    pub(crate) object_pool: ObjectPool,
    pub(crate) gc: GC,

    global: TableId,
    modules: ModuleManager,

    /// Error record for the host callable currently running.
    pub(crate) cfunc_error: CFunctionError,
}

impl LuaState {
    pub fn new() -> Self {
        let mut object_pool = ObjectPool::new();
        let mut gc = GC::new();
        let global = object_pool.create_table(&mut gc);
        Self {
            stack: Vec::with_capacity(256),
            top: 0,
            calls: Vec::new(),
            object_pool,
            gc,
            global,
            modules: ModuleManager::new(),
            cfunc_error: CFunctionError::NoError,
        }
    }

    /// Register the standard host library into the global table.
    pub fn open_libs(&mut self) {
        crate::lib_registry::create_standard_registry().load_all(self);
    }

    // ============ Modules ============

    pub fn add_module_path(&mut self, path: impl AsRef<std::path::Path>) {
        self.modules.add_path(path);
    }

    /// Resolve, compile and run `<name>.lua` once. Later loads are no-ops.
    pub fn load_module(&mut self, name: &str) -> LuaResult<()> {
        if self.modules.is_loaded(name) {
            return Ok(());
        }
        let Some(path) = self.modules.resolve(name) else {
            return Err(LuaError::Runtime {
                message: format!("module '{}' not found", name),
                line: 0,
            });
        };
        let source = std::fs::read_to_string(&path).map_err(|e| LuaError::Runtime {
            message: format!("cannot read module '{}': {}", name, e),
            line: 0,
        })?;
        let chunk_name = path.display().to_string();
        let proto = self.compile(&source, &chunk_name)?;
        self.execute_proto(proto)?;
        self.modules.mark_loaded(name);
        Ok(())
    }

    /// Compile and run an in-memory chunk, discarding its results.
    pub fn load_string(&mut self, source: &str) -> LuaResult<()> {
        self.execute_string(source)?;
        Ok(())
    }

    // ============ Compile and execute ============

    pub fn compile(&mut self, source: &str, chunk_name: &str) -> LuaResult<ProtoId> {
        compiler::compile(source, chunk_name, &mut self.object_pool, &mut self.gc)
            .map_err(|message| LuaError::Compile { message })
    }

    /// Compile and run a chunk, returning everything it returned.
    pub fn execute_string(&mut self, source: &str) -> LuaResult<Vec<LuaValue>> {
        let proto = self.compile(source, "<input>")?;
        self.execute_proto(proto)
    }

    /// Wrap a top-level prototype in a closure and run it to completion.
    /// On error the call list is drained back to its depth on entry.
    pub fn execute_proto(&mut self, proto: ProtoId) -> LuaResult<Vec<LuaValue>> {
        let base_depth = self.calls.len();
        let func_idx = self.top;
        let closure = self.create_closure(proto, Vec::new());
        self.stack_set(func_idx, closure);
        self.set_top(func_idx + 1);

        let run = execute::push_closure_frame(self, func_idx, EXPECT_ANY)
            .and_then(|_| execute::run(self, base_depth));

        match run {
            Ok(()) => {
                let results: Vec<LuaValue> =
                    (func_idx..self.top).map(|i| self.stack_get(i)).collect();
                self.top = func_idx;
                self.stack.truncate(func_idx);
                Ok(results)
            }
            Err(e) => {
                self.calls.truncate(base_depth);
                self.top = func_idx;
                self.stack.truncate(func_idx);
                Err(e)
            }
        }
    }

    // ============ Object creation ============

    pub fn create_string(&mut self, s: &str) -> LuaValue {
        let id = self.object_pool.create_string(s, &mut self.gc);
        LuaValue::string(id)
    }

    pub fn create_table(&mut self) -> LuaValue {
        let id = self.object_pool.create_table(&mut self.gc);
        LuaValue::table(id)
    }

    pub fn create_closure(&mut self, proto: ProtoId, upvalues: Vec<UpvalueId>) -> LuaValue {
        let id = self.object_pool.create_closure(proto, upvalues, &mut self.gc);
        LuaValue::closure(id)
    }

    pub fn create_upvalue(&mut self, value: LuaValue) -> UpvalueId {
        self.object_pool.create_upvalue(value, &mut self.gc)
    }

    pub fn get_string(&self, value: &LuaValue) -> Option<&LuaString> {
        let id = value.as_string_id()?;
        self.object_pool.get_string(id)
    }

    // ============ Globals ============

    pub fn globals_id(&self) -> TableId {
        self.global
    }

    pub fn get_global(&mut self, name: &str) -> LuaValue {
        let key = self.create_string(name);
        self.object_pool
            .get_table(self.global)
            .map(|t| t.get(&key))
            .unwrap_or_else(LuaValue::nil)
    }

    pub fn set_global(&mut self, name: &str, value: LuaValue) {
        let key = self.create_string(name);
        if let Some(t) = self.object_pool.get_table_mut(self.global) {
            t.set(key, value);
        }
    }

    // ============ Frames ============

    #[inline(always)]
    pub fn current_call(&self) -> Option<&CallInfo> {
        self.calls.last()
    }

    #[inline(always)]
    pub fn call_depth(&self) -> usize {
        self.calls.len()
    }

    // ============ Stack ============

    #[inline(always)]
    pub fn stack_get(&self, index: usize) -> LuaValue {
        self.stack
            .get(index)
            .copied()
            .unwrap_or_else(LuaValue::nil)
    }

    #[inline(always)]
    pub fn stack_set(&mut self, index: usize, value: LuaValue) {
        if index >= self.stack.len() {
            self.stack.resize(index + 1, LuaValue::nil());
        }
        self.stack[index] = value;
    }

    /// Reposition the top. Growth nils the new cells; shrinking leaves the
    /// old cells in place - the dispatcher nils explicitly where required.
    #[inline(always)]
    pub fn set_top(&mut self, new_top: usize) {
        if new_top > self.stack.len() {
            self.stack.resize(new_top, LuaValue::nil());
        }
        self.top = new_top;
    }

    #[inline(always)]
    pub fn get_top(&self) -> usize {
        self.top
    }

    /// Ensure the stack vector covers a frame's register window.
    pub fn grow_stack(&mut self, needed: usize) {
        if self.stack.len() < needed {
            self.stack.resize(needed, LuaValue::nil());
        }
    }

    // ============ GC ============

    /// Cheap per-opcode trigger check.
    #[inline(always)]
    pub fn check_gc(&mut self) {
        if self.gc.should_collect() {
            self.run_gc();
        }
    }

    /// Force a full collection.
    pub fn collect_garbage(&mut self) {
        self.run_gc();
    }

    fn run_gc(&mut self) {
        let roots = self.collect_roots();
        self.gc.collect(&roots, &mut self.object_pool);
    }

    pub fn gc(&self) -> &GC {
        &self.gc
    }

    /// Everything the collector must treat as alive: the global table, the
    /// live stack prefix, and each frame's function slot plus register
    /// window (a window may extend past the current top).
    fn collect_roots(&self) -> Vec<LuaValue> {
        let mut roots = Vec::with_capacity(self.top + 8);
        roots.push(LuaValue::table(self.global));

        for i in 0..self.top.min(self.stack.len()) {
            let v = self.stack[i];
            if !v.is_nil() {
                roots.push(v);
            }
        }

        for frame in &self.calls {
            roots.push(self.stack_get(frame.func));
            if frame.is_host() {
                continue;
            }
            let window = self
                .stack_get(frame.func)
                .as_closure_id()
                .and_then(|id| self.object_pool.get_closure(id))
                .and_then(|cl| self.object_pool.get_proto(cl.proto))
                .map(|p| p.max_stack_size)
                .unwrap_or(0);
            let end = (frame.base + window).min(self.stack.len());
            for i in frame.base..end {
                let v = self.stack[i];
                if !v.is_nil() {
                    roots.push(v);
                }
            }
        }

        roots
    }

    // ============ Host callable error record ============

    pub fn clear_cfunc_error(&mut self) {
        self.cfunc_error = CFunctionError::NoError;
    }

    pub fn set_cfunc_error(&mut self, error: CFunctionError) {
        self.cfunc_error = error;
    }

    pub fn cfunc_error(&self) -> CFunctionError {
        self.cfunc_error
    }

    // ============ Stack API for host callables ============
    // Argument indices are zero-based and relative to the host frame base.

    pub fn arg_count(&self) -> usize {
        match self.calls.last() {
            Some(frame) => self.top.saturating_sub(frame.base),
            None => 0,
        }
    }

    pub fn arg(&self, index: usize) -> LuaValue {
        match self.calls.last() {
            Some(frame) if frame.base + index < self.top => self.stack_get(frame.base + index),
            _ => LuaValue::nil(),
        }
    }

    /// Record ArgCount and return false unless exactly `expected` args.
    pub fn check_arg_count(&mut self, expected: usize) -> bool {
        if self.arg_count() != expected {
            self.cfunc_error = CFunctionError::ArgCount { expected };
            return false;
        }
        true
    }

    pub fn arg_number(&mut self, index: usize) -> Option<f64> {
        match self.arg(index).as_number() {
            Some(n) => Some(n),
            None => {
                self.cfunc_error = CFunctionError::ArgType {
                    index,
                    expected: LuaValueKind::Number,
                };
                None
            }
        }
    }

    pub fn arg_string(&mut self, index: usize) -> Option<String> {
        let v = self.arg(index);
        match self.get_string(&v) {
            Some(s) => Some(s.as_str().to_string()),
            None => {
                self.cfunc_error = CFunctionError::ArgType {
                    index,
                    expected: LuaValueKind::String,
                };
                None
            }
        }
    }

    pub fn arg_table(&mut self, index: usize) -> Option<TableId> {
        match self.arg(index).as_table_id() {
            Some(id) => Some(id),
            None => {
                self.cfunc_error = CFunctionError::ArgType {
                    index,
                    expected: LuaValueKind::Table,
                };
                None
            }
        }
    }

    pub fn push_value(&mut self, value: LuaValue) {
        let top = self.top;
        self.stack_set(top, value);
        self.top = top + 1;
    }

    pub fn push_nil(&mut self) {
        self.push_value(LuaValue::nil());
    }

    pub fn push_bool(&mut self, b: bool) {
        self.push_value(LuaValue::boolean(b));
    }

    pub fn push_number(&mut self, n: f64) {
        self.push_value(LuaValue::number(n));
    }

    pub fn push_string(&mut self, s: &str) {
        let v = self.create_string(s);
        self.push_value(v);
    }

    // ============ Display ============

    /// Human-readable rendering used by print/tostring.
    pub fn display_value(&self, value: &LuaValue) -> String {
        match value.kind() {
            LuaValueKind::Nil => "nil".to_string(),
            LuaValueKind::Boolean => value.as_bool().unwrap().to_string(),
            LuaValueKind::Number => execute::number_to_string(value.as_number().unwrap()),
            LuaValueKind::String => self
                .get_string(value)
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            LuaValueKind::Table => {
                format!("table: 0x{:x}", value.as_table_id().map(|i| i.0).unwrap_or(0))
            }
            LuaValueKind::Closure => {
                format!(
                    "function: 0x{:x}",
                    value.as_closure_id().map(|i| i.0).unwrap_or(0)
                )
            }
            LuaValueKind::CFunction => "function: builtin".to_string(),
            LuaValueKind::Upvalue => "upvalue".to_string(),
        }
    }
}

impl Default for LuaState {
    fn default() -> Self {
        Self::new()
    }
}
