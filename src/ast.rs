use crate::span::Spanned;

pub mod display;

/// A parsed source file: an ordered sequence of function definitions.
#[derive(Clone, Debug)]
pub struct Program {
    pub functions: Vec<Function>,
}

#[derive(Clone, Debug)]
pub struct Function {
    pub name: Spanned<String>,
    /// Formal parameters in declaration order, each of type integer.
    pub params: Vec<Spanned<String>>,
    pub body: Vec<Stmt>,
}

/// Statements.
#[derive(Clone, Debug)]
pub enum Stmt {
    /// `int x;` or `int x = expr;`
    Declaration {
        name: Spanned<String>,
        value: Option<Spanned<Expr>>,
    },
    Assignment {
        name: Spanned<String>,
        value: Spanned<Expr>,
    },
    Return {
        value: Spanned<Expr>,
    },
    Print {
        value: Spanned<Expr>,
    },
    If {
        cond: Spanned<Expr>,
        then_body: Vec<Stmt>,
        /// `else if` is a single nested `If` statement here.
        else_body: Option<Vec<Stmt>>,
    },
    While {
        cond: Spanned<Expr>,
        body: Vec<Stmt>,
    },
    /// A bare call statement: `f(1, 2);`
    Expr(Spanned<Expr>),
}

/// Expressions.
#[derive(Clone, Debug)]
pub enum Expr {
    Number(i64),
    Str(String),
    Var(String),
    BinOp {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    Call {
        name: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Eq,  // ==
    Ne,  // !=
    Lt,  // <
    Le,  // <=
    Gt,  // >
    Ge,  // >=
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }

    /// True for `==` and `!=`, the two operators that also accept
    /// string operands.
    pub fn is_equality(&self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne)
    }
}
