//! AST → TAC lowering.
//!
//! Emits instructions in AST visit order. Fresh temporaries (`t1, t2, …`)
//! and labels (`ELSE1`, `WHILE_START4`, …) come from two monotone
//! per-compilation counters.

use std::collections::BTreeMap;

use crate::ast::{BinOp, Expr, Function, Program, Stmt};
use crate::span::Spanned;

use super::{Instr, Opcode, Operand};

pub struct TacBuilder {
    code: Vec<Instr>,
    temp_count: u32,
    label_count: u32,
    shadow_count: u32,
    /// Source name → frame slot name, one map per lexical block.
    ///
    /// Declarations in nested blocks get renamed slots so they can never
    /// collide with (or leak into) an enclosing block's variables at
    /// runtime; the analyzer has already guaranteed they are distinct
    /// lexically.
    scopes: Vec<BTreeMap<String, String>>,
}

impl TacBuilder {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            temp_count: 0,
            label_count: 0,
            shadow_count: 0,
            scopes: Vec::new(),
        }
    }

    pub fn build_program(mut self, program: &Program) -> Vec<Instr> {
        for func in &program.functions {
            self.build_function(func);
        }
        self.code
    }

    fn build_function(&mut self, func: &Function) {
        self.emit(Opcode::Func, Operand::Name(func.name.node.clone()), Operand::None, Operand::None);

        self.scopes.clear();
        self.scopes.push(BTreeMap::new());
        for param in &func.params {
            self.scopes[0].insert(param.node.clone(), param.node.clone());
            self.emit(
                Opcode::ParamDecl,
                Operand::Name(param.node.clone()),
                Operand::None,
                Operand::None,
            );
        }

        for stmt in &func.body {
            self.build_stmt(stmt);
        }

        self.emit(
            Opcode::EndFunc,
            Operand::Name(func.name.node.clone()),
            Operand::None,
            Operand::None,
        );
    }

    fn build_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Declaration { name, value } => {
                // The initializer is lowered before the new slot exists,
                // so `int x = x + 1;` in a nested block reads the outer x.
                let value = value.as_ref().map(|v| self.build_expr(v));
                let slot = self.declare(&name.node);
                if let Some(value) = value {
                    self.emit(Opcode::Mov, Operand::Name(value), Operand::None, Operand::Name(slot));
                }
            }
            Stmt::Assignment { name, value } => {
                let value = self.build_expr(value);
                let slot = self.resolve(&name.node);
                self.emit(Opcode::Mov, Operand::Name(value), Operand::None, Operand::Name(slot));
            }
            Stmt::Return { value } => {
                let value = self.build_expr(value);
                self.emit(Opcode::Ret, Operand::Name(value), Operand::None, Operand::None);
            }
            Stmt::Print { value } => {
                let value = self.build_expr(value);
                self.emit(Opcode::Print, Operand::Name(value), Operand::None, Operand::None);
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                let cond = self.build_expr(cond);
                let else_label = self.new_label("ELSE");
                let end_label = self.new_label("ENDIF");
                self.emit(
                    Opcode::IfzGoto,
                    Operand::Name(cond),
                    Operand::None,
                    Operand::Label(else_label.clone()),
                );
                self.build_block(then_body);
                self.emit(Opcode::Goto, Operand::Label(end_label.clone()), Operand::None, Operand::None);
                self.emit(Opcode::Label, Operand::Label(else_label), Operand::None, Operand::None);
                if let Some(else_body) = else_body {
                    self.build_block(else_body);
                }
                self.emit(Opcode::Label, Operand::Label(end_label), Operand::None, Operand::None);
            }
            Stmt::While { cond, body } => {
                let start_label = self.new_label("WHILE_START");
                let end_label = self.new_label("WHILE_END");
                self.emit(
                    Opcode::Label,
                    Operand::Label(start_label.clone()),
                    Operand::None,
                    Operand::None,
                );
                let cond = self.build_expr(cond);
                self.emit(
                    Opcode::IfzGoto,
                    Operand::Name(cond),
                    Operand::None,
                    Operand::Label(end_label.clone()),
                );
                self.build_block(body);
                self.emit(Opcode::Goto, Operand::Label(start_label), Operand::None, Operand::None);
                self.emit(Opcode::Label, Operand::Label(end_label), Operand::None, Operand::None);
            }
            Stmt::Expr(call) => {
                // Bare call: lowered like any call expression; the POP
                // target is an unused fresh temporary.
                self.build_expr(call);
            }
        }
    }

    fn build_block(&mut self, stmts: &[Stmt]) {
        self.scopes.push(BTreeMap::new());
        for stmt in stmts {
            self.build_stmt(stmt);
        }
        self.scopes.pop();
    }

    /// Lower an expression and return the name holding its value.
    fn build_expr(&mut self, expr: &Spanned<Expr>) -> String {
        match &expr.node {
            Expr::Number(n) => {
                let t = self.new_temp();
                self.emit(Opcode::Mov, Operand::IntLit(*n), Operand::None, Operand::Name(t.clone()));
                t
            }
            Expr::Str(s) => {
                let t = self.new_temp();
                self.emit(
                    Opcode::Mov,
                    Operand::StrLit(s.clone()),
                    Operand::None,
                    Operand::Name(t.clone()),
                );
                t
            }
            Expr::Var(name) => self.resolve(name),
            Expr::BinOp { op, lhs, rhs } => {
                let left = self.build_expr(lhs);
                let right = self.build_expr(rhs);
                let t = self.new_temp();
                self.emit(
                    opcode_for(*op),
                    Operand::Name(left),
                    Operand::Name(right),
                    Operand::Name(t.clone()),
                );
                t
            }
            Expr::Call { name, args } => {
                for arg in args {
                    let value = self.build_expr(arg);
                    self.emit(Opcode::Param, Operand::Name(value), Operand::None, Operand::None);
                }
                self.emit(
                    Opcode::Call,
                    Operand::Name(name.node.clone()),
                    Operand::IntLit(args.len() as i64),
                    Operand::None,
                );
                let t = self.new_temp();
                self.emit(Opcode::Pop, Operand::None, Operand::None, Operand::Name(t.clone()));
                t
            }
        }
    }

    // --- Fresh names and scope slots ---

    fn new_temp(&mut self) -> String {
        self.temp_count += 1;
        format!("t{}", self.temp_count)
    }

    fn new_label(&mut self, base: &str) -> String {
        self.label_count += 1;
        format!("{}{}", base, self.label_count)
    }

    /// Allocate a frame slot for a declaration. Function-level names keep
    /// their source spelling; block-local names get a `name.k` slot (the
    /// dot cannot appear in a source identifier).
    fn declare(&mut self, name: &str) -> String {
        let slot = if self.scopes.len() > 1 {
            self.shadow_count += 1;
            format!("{}.{}", name, self.shadow_count)
        } else {
            name.to_string()
        };
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), slot.clone());
        }
        slot
    }

    /// Resolve a source name to its frame slot, innermost scope first.
    fn resolve(&self, name: &str) -> String {
        for scope in self.scopes.iter().rev() {
            if let Some(slot) = scope.get(name) {
                return slot.clone();
            }
        }
        name.to_string()
    }

    fn emit(&mut self, op: Opcode, a1: Operand, a2: Operand, res: Operand) {
        self.code.push(Instr::new(op, a1, a2, res));
    }
}

impl Default for TacBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn opcode_for(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Plus,
        BinOp::Sub => Opcode::Minus,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Eq => Opcode::Eq,
        BinOp::Ne => Opcode::Ne,
        BinOp::Lt => Opcode::Lt,
        BinOp::Le => Opcode::Le,
        BinOp::Gt => Opcode::Gt,
        BinOp::Ge => Opcode::Ge,
    }
}
