//! TAC, the three-address-code intermediate representation.
//!
//! The TAC is an ordered sequence of quadruples `(op, a1, a2, res)`.
//! The builder lowers the AST into it, the optimizer rewrites it, and
//! both the target printer and the VM consume it.

pub mod builder;
pub mod lower;
pub mod optimize;

use std::fmt;

// ─── Opcodes ──────────────────────────────────────────────────────

/// 22 TAC opcodes.
///
/// **Structure**: `Func`/`EndFunc` bracket one function each,
/// `ParamDecl` binds one formal parameter in the prologue.
///
/// **Data**: `Mov`, the arithmetic group, and the relational group
/// (relationals yield integer 1/0).
///
/// **Control flow**: `Label`/`Goto`/`IfzGoto` plus the call protocol
/// `Param* Call Pop` and `Ret`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    // ── Structure ──
    Func,
    EndFunc,
    ParamDecl,

    // ── Data ──
    Mov,
    Plus,
    Minus,
    Mul,
    Div,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,

    // ── Statements ──
    Ret,
    Print,

    // ── Control flow ──
    Label,
    Goto,
    IfzGoto,
    Param,
    Call,
    Pop,
}

impl Opcode {
    /// True for the arithmetic and relational group.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Opcode::Plus
                | Opcode::Minus
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Eq
                | Opcode::Ne
                | Opcode::Gt
                | Opcode::Lt
                | Opcode::Ge
                | Opcode::Le
        )
    }

    /// Source-level symbol for a binary opcode.
    pub fn symbol(self) -> &'static str {
        match self {
            Opcode::Plus => "+",
            Opcode::Minus => "-",
            Opcode::Mul => "*",
            Opcode::Div => "/",
            Opcode::Eq => "==",
            Opcode::Ne => "!=",
            Opcode::Gt => ">",
            Opcode::Lt => "<",
            Opcode::Ge => ">=",
            Opcode::Le => "<=",
            _ => unreachable!("symbol is only defined for binary opcodes"),
        }
    }
}

// ─── Operands ─────────────────────────────────────────────────────

/// A TAC operand slot. Integer and string literals are distinct
/// variants rather than tagged text, so consumers never re-parse
/// operand strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    IntLit(i64),
    StrLit(String),
    /// A variable or temporary name.
    Name(String),
    Label(String),
    None,
}

impl Operand {
    /// True for compiler-generated temporary names (`t1`, `t2`, …).
    pub fn is_temp(&self) -> bool {
        match self {
            Operand::Name(name) => {
                let mut chars = name.chars();
                chars.next() == Some('t') && name.len() > 1 && chars.all(|c| c.is_ascii_digit())
            }
            _ => false,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Operand::Label(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::IntLit(n) => write!(f, "{}", n),
            Operand::StrLit(s) => write!(f, "\"{}\"", s),
            Operand::Name(name) => write!(f, "{}", name),
            Operand::Label(name) => write!(f, "{}", name),
            Operand::None => write!(f, "_"),
        }
    }
}

// ─── Instructions ─────────────────────────────────────────────────

/// A single quadruple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instr {
    pub op: Opcode,
    pub a1: Operand,
    pub a2: Operand,
    pub res: Operand,
}

impl Instr {
    pub fn new(op: Opcode, a1: Operand, a2: Operand, res: Operand) -> Self {
        Self { op, a1, a2, res }
    }
}

// ─── Display ──────────────────────────────────────────────────────

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Opcode::Func => write!(f, "{}:", self.a1),
            Opcode::EndFunc => write!(f, "END {}", self.a1),
            Opcode::ParamDecl => write!(f, "  PARAM_DECL {}", self.a1),
            Opcode::Mov => write!(f, "  {} = {}", self.res, self.a1),
            op if op.is_binary() => {
                write!(f, "  {} = {} {} {}", self.res, self.a1, op.symbol(), self.a2)
            }
            Opcode::Ret => write!(f, "  return {}", self.a1),
            Opcode::Print => write!(f, "  print {}", self.a1),
            Opcode::IfzGoto => write!(f, "  IFZ {} -> {}", self.a1, self.res),
            Opcode::Goto => write!(f, "  GOTO {}", self.a1),
            Opcode::Label => write!(f, "{}:", self.a1),
            Opcode::Param => write!(f, "  PARAM {}", self.a1),
            Opcode::Call => write!(f, "  CALL {}, {}", self.a1, self.a2),
            Opcode::Pop => write!(f, "  POP {}", self.res),
            _ => unreachable!("is_binary covers the remaining opcodes"),
        }
    }
}

/// Render a TAC listing, one instruction per line.
pub fn format_tac(code: &[Instr]) -> String {
    let mut out = String::new();
    for instr in code {
        out.push_str(&instr.to_string());
        out.push('\n');
    }
    out
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_display() {
        assert_eq!(format!("{}", Operand::IntLit(42)), "42");
        assert_eq!(format!("{}", Operand::StrLit("hi".into())), "\"hi\"");
        assert_eq!(format!("{}", Operand::Name("t3".into())), "t3");
        assert_eq!(format!("{}", Operand::Label("ELSE1".into())), "ELSE1");
        assert_eq!(format!("{}", Operand::None), "_");
    }

    #[test]
    fn test_is_temp() {
        assert!(Operand::Name("t1".into()).is_temp());
        assert!(Operand::Name("t42".into()).is_temp());
        assert!(!Operand::Name("t".into()).is_temp());
        assert!(!Operand::Name("total".into()).is_temp());
        assert!(!Operand::Name("x".into()).is_temp());
        assert!(!Operand::IntLit(1).is_temp());
        assert!(!Operand::Label("t1".into()).is_temp());
    }

    #[test]
    fn test_instr_display() {
        let mov = Instr::new(
            Opcode::Mov,
            Operand::IntLit(5),
            Operand::None,
            Operand::Name("x".into()),
        );
        assert_eq!(mov.to_string(), "  x = 5");

        let add = Instr::new(
            Opcode::Plus,
            Operand::Name("t1".into()),
            Operand::Name("t2".into()),
            Operand::Name("t3".into()),
        );
        assert_eq!(add.to_string(), "  t3 = t1 + t2");

        let ifz = Instr::new(
            Opcode::IfzGoto,
            Operand::Name("t1".into()),
            Operand::None,
            Operand::Label("ELSE1".into()),
        );
        assert_eq!(ifz.to_string(), "  IFZ t1 -> ELSE1");

        let call = Instr::new(
            Opcode::Call,
            Operand::Name("fact".into()),
            Operand::IntLit(1),
            Operand::None,
        );
        assert_eq!(call.to_string(), "  CALL fact, 1");
    }

    #[test]
    fn test_format_tac_listing() {
        let code = vec![
            Instr::new(
                Opcode::Func,
                Operand::Name("main".into()),
                Operand::None,
                Operand::None,
            ),
            Instr::new(
                Opcode::Ret,
                Operand::IntLit(0),
                Operand::None,
                Operand::None,
            ),
            Instr::new(
                Opcode::EndFunc,
                Operand::Name("main".into()),
                Operand::None,
                Operand::None,
            ),
        ];
        assert_eq!(format_tac(&code), "main:\n  return 0\nEND main\n");
    }
}
