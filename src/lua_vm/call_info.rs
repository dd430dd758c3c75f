// CallInfo - one activation record on the call list.

/// Sentinel for "caller accepts all results" / "return everything".
/// Encoded as 0 in the Call opcode's B/C fields and as -1 in sBx.
pub const EXPECT_ANY: i32 = -1;

/// A single frame. All stack positions are absolute indices so that frames
/// stay valid across stack growth; the dispatcher re-reads the back frame
/// after every push or pop.
#[derive(Clone, Copy)]
pub struct CallInfo {
    /// Stack index of the callable's own cell. Results are copied here on
    /// return.
    pub func: usize,

    /// First register of this frame's window. For vararg functions this is
    /// above the incoming arguments (fixed args are copied up).
    pub base: usize,

    /// Index of the next instruction to execute.
    pub pc: usize,

    /// One past the last instruction (the prototype's opcode count).
    /// Zero for host frames.
    pub end: usize,

    /// How many results the caller expects, or EXPECT_ANY.
    pub expect_results: i32,
}

impl CallInfo {
    /// Frame for an interpreted function.
    pub fn new_lua(func: usize, base: usize, end: usize, expect_results: i32) -> Self {
        Self {
            func,
            base,
            pc: 0,
            end,
            expect_results,
        }
    }

    /// Frame for a host callable; it has no bytecode to run.
    pub fn new_host(func: usize, base: usize, expect_results: i32) -> Self {
        Self {
            func,
            base,
            pc: 0,
            end: 0,
            expect_results,
        }
    }

    #[inline(always)]
    pub fn is_host(&self) -> bool {
        // Compiled functions always carry at least their final Ret.
        self.end == 0
    }
}
