// Mark-sweep garbage collector over the object pool.
//
// Collection is debt-driven: every allocation raises the debt, the
// dispatcher polls `should_collect` once per opcode, and a collection
// resets the debt from the bytes that survived. Roots are supplied by the
// state: the global table, every live stack cell, and every frame's
// function slot; everything else is reached by tracing.

mod object_pool;
mod string_interner;

pub use object_pool::{
    Arena, ClosureId, GcClosure, GcHeader, GcString, GcUpvalue, ObjectPool, ProtoId, StringId,
    TableId, UpvalueId,
};
pub use string_interner::StringInterner;

use crate::lua_value::{LuaValue, LuaValueKind};

/// Debt threshold before the first collection.
const INITIAL_THRESHOLD: usize = 64 * 1024;

pub struct GC {
    /// Bytes allocated beyond the current threshold. Collection runs when
    /// this crosses zero.
    debt: i64,
    threshold: usize,
    total_bytes: usize,
    collection_count: usize,
}

enum WorkItem {
    Value(LuaValue),
    Proto(ProtoId),
    Upvalue(UpvalueId),
}

impl GC {
    pub fn new() -> Self {
        Self {
            debt: -(INITIAL_THRESHOLD as i64),
            threshold: INITIAL_THRESHOLD,
            total_bytes: 0,
            collection_count: 0,
        }
    }

    #[inline(always)]
    pub fn track(&mut self, size: usize) {
        self.total_bytes += size;
        self.debt += size as i64;
    }

    #[inline(always)]
    pub fn should_collect(&self) -> bool {
        self.debt > 0
    }

    pub fn collection_count(&self) -> usize {
        self.collection_count
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Full mark-sweep. Identity of every object reachable from `roots` is
    /// preserved; unreachable objects are freed and dead strings fall out
    /// of the intern map.
    pub fn collect(&mut self, roots: &[LuaValue], pool: &mut ObjectPool) {
        pool.clear_marks();

        let mut work: Vec<WorkItem> = roots.iter().map(|v| WorkItem::Value(*v)).collect();

        while let Some(item) = work.pop() {
            match item {
                WorkItem::Value(v) => Self::mark_value(v, pool, &mut work),
                WorkItem::Proto(id) => Self::mark_proto(id, pool, &mut work),
                WorkItem::Upvalue(id) => {
                    if pool.mark_upvalue(id) {
                        if let Some(uv) = pool.get_upvalue(id) {
                            work.push(WorkItem::Value(uv.value));
                        }
                    }
                }
            }
        }

        let freed = pool.sweep();
        self.total_bytes = self.total_bytes.saturating_sub(freed);
        self.collection_count += 1;
        self.threshold = (self.total_bytes * 2).max(INITIAL_THRESHOLD);
        self.debt = self.total_bytes as i64 - self.threshold as i64;
    }

    fn mark_value(v: LuaValue, pool: &mut ObjectPool, work: &mut Vec<WorkItem>) {
        match v.kind() {
            LuaValueKind::String => {
                if let Some(id) = v.as_string_id() {
                    pool.mark_string(id);
                }
            }
            LuaValueKind::Table => {
                let Some(id) = v.as_table_id() else { return };
                if pool.mark_table(id) {
                    let mut entries: Vec<LuaValue> = Vec::new();
                    if let Some(table) = pool.get_table(id) {
                        table.for_each_entry(|k, val| {
                            entries.push(*k);
                            entries.push(*val);
                        });
                    }
                    for e in entries {
                        work.push(WorkItem::Value(e));
                    }
                }
            }
            LuaValueKind::Closure => {
                let Some(id) = v.as_closure_id() else { return };
                if pool.mark_closure(id) {
                    let (proto, upvalues) = match pool.get_closure(id) {
                        Some(cl) => (cl.proto, cl.upvalues.clone()),
                        None => return,
                    };
                    work.push(WorkItem::Proto(proto));
                    for uid in upvalues {
                        work.push(WorkItem::Upvalue(uid));
                    }
                }
            }
            LuaValueKind::Upvalue => {
                // Register-promoted stack cell.
                if let Some(id) = v.as_upvalue_id() {
                    work.push(WorkItem::Upvalue(id));
                }
            }
            _ => {}
        }
    }

    fn mark_proto(id: ProtoId, pool: &mut ObjectPool, work: &mut Vec<WorkItem>) {
        if !pool.mark_proto(id) {
            return;
        }
        let (constants, children) = match pool.get_proto(id) {
            Some(p) => (p.constants.clone(), p.children.clone()),
            None => return,
        };
        for c in constants {
            work.push(WorkItem::Value(c));
        }
        for child in children {
            work.push(WorkItem::Proto(child));
        }
    }
}

impl Default for GC {
    fn default() -> Self {
        Self::new()
    }
}
