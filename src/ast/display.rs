//! Diagnostic tree pretty-printer for the AST.
//!
//! Produces the box-drawing listing the CLI shows after parsing. This is
//! a display collaborator only; nothing downstream consumes its output.

use super::{Expr, Program, Stmt};
use crate::span::Spanned;

/// Render a whole program, one tree per function.
pub fn format_program(program: &Program) -> String {
    let mut out = String::new();
    for func in &program.functions {
        out.push_str("Program(");
        out.push_str(&func.name.node);
        out.push_str(")\n");
        render_stmts(&func.body, "", &mut out);
    }
    out
}

fn render_stmts(stmts: &[Stmt], indent: &str, out: &mut String) {
    for (i, stmt) in stmts.iter().enumerate() {
        render_stmt(stmt, indent, i + 1 == stmts.len(), out);
    }
}

fn render_stmt(stmt: &Stmt, indent: &str, last: bool, out: &mut String) {
    let branch = if last { "└── " } else { "├── " };
    let child_indent = format!("{}{}", indent, if last { "    " } else { "│   " });

    match stmt {
        Stmt::Declaration { name, value } => {
            let init = match value {
                Some(v) => expr_text(&v.node),
                None => "None".to_string(),
            };
            out.push_str(&format!("{}{}VarDecl({}, {})\n", indent, branch, name.node, init));
        }
        Stmt::Assignment { name, value } => {
            out.push_str(&format!(
                "{}{}Assign({}, {})\n",
                indent,
                branch,
                name.node,
                expr_text(&value.node)
            ));
        }
        Stmt::Return { value } => {
            out.push_str(&format!("{}{}Return({})\n", indent, branch, expr_text(&value.node)));
        }
        Stmt::Print { value } => {
            out.push_str(&format!("{}{}Print({})\n", indent, branch, expr_text(&value.node)));
        }
        Stmt::If {
            cond,
            then_body,
            else_body,
        } => {
            out.push_str(&format!("{}{}If({})\n", indent, branch, expr_text(&cond.node)));
            match else_body {
                None => render_stmts(then_body, &child_indent, out),
                Some(else_stmts) => {
                    for stmt in then_body {
                        render_stmt(stmt, &child_indent, false, out);
                    }
                    out.push_str(&format!("{}└── Else\n", child_indent));
                    let else_indent = format!("{}    ", child_indent);
                    render_stmts(else_stmts, &else_indent, out);
                }
            }
        }
        Stmt::While { cond, body } => {
            out.push_str(&format!("{}{}While({})\n", indent, branch, expr_text(&cond.node)));
            render_stmts(body, &child_indent, out);
        }
        Stmt::Expr(call) => {
            out.push_str(&format!("{}{}{}\n", indent, branch, expr_text(&call.node)));
        }
    }
}

fn expr_text(expr: &Expr) -> String {
    match expr {
        Expr::Number(n) => n.to_string(),
        Expr::Str(s) => format!("\"{}\"", s),
        Expr::Var(name) => name.clone(),
        Expr::BinOp { op, lhs, rhs } => format!(
            "({} {} {})",
            expr_text(&lhs.node),
            op.as_str(),
            expr_text(&rhs.node)
        ),
        Expr::Call { name, args } => {
            let args: Vec<String> = args.iter().map(|a: &Spanned<Expr>| expr_text(&a.node)).collect();
            format!("{}({})", name.node, args.join(", "))
        }
    }
}
