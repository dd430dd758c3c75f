use std::fmt;

/// Errors surfaced to the host. A runtime error unwinds every frame pushed
/// since the execute call that raised it; the state drains its call list
/// back to the pre-call depth before handing the error out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LuaError {
    /// Source could not be compiled.
    Compile { message: String },
    /// The dispatcher or a host callable aborted the script. `line` is
    /// taken from the prototype's line map at the offending pc.
    Runtime { message: String, line: u32 },
}

impl LuaError {
    pub fn message(&self) -> &str {
        match self {
            LuaError::Compile { message } => message,
            LuaError::Runtime { message, .. } => message,
        }
    }

    pub fn line(&self) -> Option<u32> {
        match self {
            LuaError::Compile { .. } => None,
            LuaError::Runtime { line, .. } => Some(*line),
        }
    }
}

impl fmt::Display for LuaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaError::Compile { message } => write!(f, "compile error: {}", message),
            LuaError::Runtime { message, line } => {
                write!(f, "runtime error: line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for LuaError {}
