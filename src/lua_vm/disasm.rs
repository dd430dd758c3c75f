// Bytecode listing for debugging and tests.

use crate::gc::ProtoId;
use crate::lua_vm::{Instruction, LuaState, OpCode, OpMode};

/// Render a prototype (and its children) as a human-readable listing.
pub fn disassemble(state: &LuaState, proto: ProtoId) -> String {
    let mut out = String::new();
    write_proto(state, proto, "main", &mut out);
    out
}

fn write_proto(state: &LuaState, id: ProtoId, label: &str, out: &mut String) {
    let Some(proto) = state.object_pool.get_proto(id) else {
        return;
    };

    out.push_str(&format!(
        "function <{}:{}> ({} instructions, {} params{})\n",
        proto.source_name,
        label,
        proto.code.len(),
        proto.fixed_arg_count,
        if proto.is_vararg { ", vararg" } else { "" },
    ));

    let mut pc = 0usize;
    while pc < proto.code.len() {
        let instr = proto.code[pc];
        let op = Instruction::get_opcode(instr);
        let line = proto.instruction_line(pc);

        let params = match op.get_mode() {
            OpMode::IABC => format!(
                "{} {} {}",
                Instruction::get_a(instr),
                Instruction::get_b(instr),
                Instruction::get_c(instr)
            ),
            OpMode::IABx => {
                let bx = Instruction::get_bx(instr) as usize;
                let extra = proto
                    .constants
                    .get(bx)
                    .map(|k| format!(" ; {}", state.display_value(k)))
                    .unwrap_or_default();
                format!("{} {}{}", Instruction::get_a(instr), bx, extra)
            }
            OpMode::IAsBx => format!(
                "{} {}",
                Instruction::get_a(instr),
                Instruction::get_sbx(instr)
            ),
        };
        out.push_str(&format!(
            "  [{:>3}] line {:<4} {:<12} {}\n",
            pc,
            line,
            op.name(),
            params
        ));
        pc += 1;

        // Both of these consume the next code word.
        match op {
            OpCode::LoadInt => {
                let word = proto.code.get(pc).copied().unwrap_or(0);
                out.push_str(&format!("  [{:>3}]            <int {}>\n", pc, word as i32));
                pc += 1;
            }
            OpCode::ForStep => {
                let word = proto.code.get(pc).copied().unwrap_or(0);
                out.push_str(&format!(
                    "  [{:>3}]            <exit jump {}>\n",
                    pc,
                    Instruction::get_sbx(word)
                ));
                pc += 1;
            }
            _ => {}
        }
    }

    let children = proto.children.clone();
    for (i, child) in children.iter().enumerate() {
        out.push('\n');
        write_proto(state, *child, &format!("child {}", i), out);
    }
}
