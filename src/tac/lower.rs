//! TAC → target text lowering.
//!
//! Produces the illustrative assembly-like listing the CLI displays.
//! Purely textual and total; nothing executes this output.

use super::{Instr, Opcode, Operand};

/// Lower a TAC sequence to target text, one instruction per line.
pub fn lower(code: &[Instr]) -> Vec<String> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < code.len() {
        let instr = &code[i];
        match instr.op {
            Opcode::Func => {
                out.push(format!("{}:", instr.a1));
                i += 1;
            }
            // No code for function ends or parameter declarations
            Opcode::EndFunc | Opcode::ParamDecl => {
                i += 1;
            }
            op if op.is_binary() => {
                // Arithmetic writing a temp immediately consumed by a MOV
                // fuses to a two-operand form computed in place on `left`.
                if instr.res.is_temp() {
                    if let Some(next) = code.get(i + 1) {
                        if next.op == Opcode::Mov && next.a1 == instr.res {
                            out.push(format!("{} {}, {}", mnemonic(op), instr.a1, instr.a2));
                            if next.res != instr.a1 {
                                out.push(format!("MOV {}, {}", next.res, instr.a1));
                            }
                            i += 2;
                            continue;
                        }
                    }
                }
                out.push(format!(
                    "{} {}, {}, {}",
                    mnemonic(op),
                    instr.res,
                    instr.a1,
                    instr.a2
                ));
                i += 1;
            }
            Opcode::IfzGoto => {
                out.push(format!("CMP {}, 0", instr.a1));
                out.push(format!("JE {}", instr.res));
                i += 1;
            }
            Opcode::Goto => {
                out.push(format!("JMP {}", instr.a1));
                i += 1;
            }
            Opcode::Label => {
                out.push(format!("{}:", instr.a1));
                i += 1;
            }
            Opcode::Mov => {
                // MOV x, x is elided
                if instr.a1 != instr.res {
                    out.push(format!("MOV {}, {}", instr.res, instr.a1));
                }
                i += 1;
            }
            Opcode::Print => {
                out.push(format!("PRINT {}", instr.a1));
                i += 1;
            }
            Opcode::Ret => {
                out.push(format!("RET {}", instr.a1));
                i += 1;
            }
            Opcode::Param => {
                out.push(format!("PUSH {}", instr.a1));
                i += 1;
            }
            Opcode::Call => {
                out.push(format!("CALL {}, {}", instr.a1, instr.a2));
                i += 1;
            }
            Opcode::Pop => {
                out.push(format!("POP {}", instr.res));
                i += 1;
            }
            _ => unreachable!("is_binary covers the remaining opcodes"),
        }
    }

    out
}

fn mnemonic(op: Opcode) -> &'static str {
    match op {
        Opcode::Plus => "ADD",
        Opcode::Minus => "SUB",
        Opcode::Mul => "MUL",
        Opcode::Div => "DIV",
        Opcode::Eq => "EQ",
        Opcode::Ne => "NE",
        Opcode::Gt => "GT",
        Opcode::Lt => "LT",
        Opcode::Ge => "GE",
        Opcode::Le => "LE",
        _ => unreachable!("mnemonic is only used for binary opcodes"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::tac::builder::TacBuilder;
    use crate::tac::optimize::optimize;

    fn target(source: &str) -> Vec<String> {
        let tokens = Lexer::new(source).tokenize().expect("lex errors");
        let program = Parser::new(tokens).parse_program().expect("parse errors");
        lower(&optimize(TacBuilder::new().build_program(&program)))
    }

    #[test]
    fn test_folded_return() {
        assert_eq!(
            target("int main() { return 2 + 3 * 4; }"),
            vec!["main:", "RET 14"]
        );
    }

    #[test]
    fn test_arith_mov_fusion() {
        // a + b lands in t1, immediately moved into x: fused to an
        // in-place ADD plus a MOV of the result.
        assert_eq!(
            target("int f(int a, int b) { int x = a + b; return x; } int main() { return f(1, 2); }"),
            vec![
                "f:",
                "ADD a, b",
                "MOV x, a",
                "RET x",
                "main:",
                "PUSH 1",
                "PUSH 2",
                "CALL f, 2",
                "POP t4",
                "RET t4",
            ]
        );
    }

    #[test]
    fn test_ifz_becomes_cmp_je() {
        let lines = target("int main() { int i = 0; if (i < 1) { print(i); } return i; }");
        assert!(lines.contains(&"LT i, 1".to_string()) || lines.iter().any(|l| l.starts_with("LT ")));
        assert!(lines.iter().any(|l| l.starts_with("CMP ")));
        assert!(lines.iter().any(|l| l.starts_with("JE ELSE")));
        assert!(lines.iter().any(|l| l.starts_with("JMP ENDIF")));
    }

    #[test]
    fn test_labels_and_jumps() {
        let lines = target("int main() { int i = 0; while (i < 2) { i = i + 1; } return i; }");
        assert!(lines.contains(&"WHILE_START1:".to_string()));
        assert!(lines.contains(&"JMP WHILE_START1".to_string()));
        assert!(lines.contains(&"WHILE_END2:".to_string()));
    }

    #[test]
    fn test_redundant_mov_is_elided() {
        let code = vec![Instr::new(
            Opcode::Mov,
            Operand::Name("x".into()),
            Operand::None,
            Operand::Name("x".into()),
        )];
        assert!(lower(&code).is_empty());
    }

    #[test]
    fn test_unfused_arith_falls_back_to_three_operands() {
        // No MOV follows the LT here (the IFZ consumes it), so the
        // three-operand form is emitted.
        let lines = target("int main() { int i = 0; while (i < 3) { i = i + 1; } return i; }");
        assert!(lines.contains(&"LT t3, i, 3".to_string()));
    }

    #[test]
    fn test_print_and_string_operands() {
        let lines = target("int main() { print(\"hello\"); return 0; }");
        assert_eq!(lines, vec!["main:", "PRINT \"hello\"", "RET 0"]);
    }
}
