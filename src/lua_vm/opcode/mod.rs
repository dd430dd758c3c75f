mod instruction;

pub use instruction::Instruction;

/// Instruction format modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    IABC,
    IABx,
    IAsBx,
}

/// The complete opcode set of the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // Load/move
    LoadNil = 0, // R[A] := nil
    LoadBool,    // R[A] := B != 0
    LoadInt,     // R[A] := next code word as an integer; pc++
    LoadConst,   // R[A] := K[Bx]
    Move,        // R[A] := R[B]

    // Upvalues
    GetUpvalue, // R[A] := U[B]
    SetUpvalue, // U[B] := R[A]

    // Globals
    GetGlobal, // R[A] := Globals[K[Bx]]
    SetGlobal, // Globals[K[Bx]] := R[A]

    // Tables
    NewTable, // R[A] := {}
    SetTable, // R[A][R[B]] := R[C]
    GetTable, // R[C] := R[A][R[B]]

    // Closures and calls
    Closure, // R[A] := closure(child proto Bx)
    VarArg,  // R[A], ... := varargs (sBx values, -1 = all)
    Call,    // R[A](args); B = argc+1 (0 = to top), C = expected+1 (0 = all)
    Ret,     // return R[A] .. (sBx values, -1 = to top)

    // Jumps
    JmpFalse, // if not R[A] then pc += sBx - 1
    JmpTrue,  // if R[A] then pc += sBx - 1
    JmpNil,   // if R[A] == nil then pc += sBx - 1
    Jmp,      // pc += sBx - 1

    // Unary (in place on R[A])
    Neg, // R[A] := -R[A]
    Not, // R[A] := not R[A]
    Len, // R[A] := #R[A]

    // Arithmetic
    Add, // R[A] := R[B] + R[C]
    Sub, // R[A] := R[B] - R[C]
    Mul, // R[A] := R[B] * R[C]
    Div, // R[A] := R[B] / R[C]
    Pow, // R[A] := R[B] ^ R[C]
    Mod, // R[A] := R[B] % R[C]

    // Concatenation
    Concat, // R[A] := R[B] .. R[C]

    // Comparisons
    Less,         // R[A] := R[B] < R[C]
    Greater,      // R[A] := R[B] > R[C]
    LessEqual,    // R[A] := R[B] <= R[C]
    GreaterEqual, // R[A] := R[B] >= R[C]
    Equal,        // R[A] := R[B] == R[C]
    UnEqual,      // R[A] := R[B] ~= R[C]

    // Numeric for
    ForInit, // type-check R[A], R[B], R[C] as numbers
    ForStep, // consume next word; exit jump when R[A] passes R[B] by step R[C]
}

impl OpCode {
    pub fn from_u8(v: u8) -> OpCode {
        match v {
            0 => OpCode::LoadNil,
            1 => OpCode::LoadBool,
            2 => OpCode::LoadInt,
            3 => OpCode::LoadConst,
            4 => OpCode::Move,
            5 => OpCode::GetUpvalue,
            6 => OpCode::SetUpvalue,
            7 => OpCode::GetGlobal,
            8 => OpCode::SetGlobal,
            9 => OpCode::NewTable,
            10 => OpCode::SetTable,
            11 => OpCode::GetTable,
            12 => OpCode::Closure,
            13 => OpCode::VarArg,
            14 => OpCode::Call,
            15 => OpCode::Ret,
            16 => OpCode::JmpFalse,
            17 => OpCode::JmpTrue,
            18 => OpCode::JmpNil,
            19 => OpCode::Jmp,
            20 => OpCode::Neg,
            21 => OpCode::Not,
            22 => OpCode::Len,
            23 => OpCode::Add,
            24 => OpCode::Sub,
            25 => OpCode::Mul,
            26 => OpCode::Div,
            27 => OpCode::Pow,
            28 => OpCode::Mod,
            29 => OpCode::Concat,
            30 => OpCode::Less,
            31 => OpCode::Greater,
            32 => OpCode::LessEqual,
            33 => OpCode::GreaterEqual,
            34 => OpCode::Equal,
            35 => OpCode::UnEqual,
            36 => OpCode::ForInit,
            37 => OpCode::ForStep,
            _ => OpCode::LoadNil,
        }
    }

    pub fn get_mode(&self) -> OpMode {
        match self {
            OpCode::LoadConst | OpCode::GetGlobal | OpCode::SetGlobal | OpCode::Closure => {
                OpMode::IABx
            }
            OpCode::VarArg
            | OpCode::Ret
            | OpCode::JmpFalse
            | OpCode::JmpTrue
            | OpCode::JmpNil
            | OpCode::Jmp => OpMode::IAsBx,
            _ => OpMode::IABC,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OpCode::LoadNil => "LoadNil",
            OpCode::LoadBool => "LoadBool",
            OpCode::LoadInt => "LoadInt",
            OpCode::LoadConst => "LoadConst",
            OpCode::Move => "Move",
            OpCode::GetUpvalue => "GetUpvalue",
            OpCode::SetUpvalue => "SetUpvalue",
            OpCode::GetGlobal => "GetGlobal",
            OpCode::SetGlobal => "SetGlobal",
            OpCode::NewTable => "NewTable",
            OpCode::SetTable => "SetTable",
            OpCode::GetTable => "GetTable",
            OpCode::Closure => "Closure",
            OpCode::VarArg => "VarArg",
            OpCode::Call => "Call",
            OpCode::Ret => "Ret",
            OpCode::JmpFalse => "JmpFalse",
            OpCode::JmpTrue => "JmpTrue",
            OpCode::JmpNil => "JmpNil",
            OpCode::Jmp => "Jmp",
            OpCode::Neg => "Neg",
            OpCode::Not => "Not",
            OpCode::Len => "Len",
            OpCode::Add => "Add",
            OpCode::Sub => "Sub",
            OpCode::Mul => "Mul",
            OpCode::Div => "Div",
            OpCode::Pow => "Pow",
            OpCode::Mod => "Mod",
            OpCode::Concat => "Concat",
            OpCode::Less => "Less",
            OpCode::Greater => "Greater",
            OpCode::LessEqual => "LessEqual",
            OpCode::GreaterEqual => "GreaterEqual",
            OpCode::Equal => "Equal",
            OpCode::UnEqual => "UnEqual",
            OpCode::ForInit => "ForInit",
            OpCode::ForStep => "ForStep",
        }
    }
}
