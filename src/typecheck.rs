use std::collections::BTreeMap;

use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::span::{Span, Spanned};

/// A variable's type. Strings exist only as print targets and as
/// operands of `==`/`!=`; everything else is an integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ty {
    Int,
    Str,
}

impl Ty {
    pub fn display(self) -> &'static str {
        match self {
            Ty::Int => "int",
            Ty::Str => "string",
        }
    }
}

/// A function signature: parameters are all integers, so arity is the
/// whole contract.
#[derive(Clone, Debug)]
struct FnSig {
    arity: usize,
}

/// Scope-aware semantic analyzer. Two passes: collect the global
/// function table, then walk each body with a stack of block scopes.
pub struct TypeChecker {
    /// Known function signatures, keyed by name.
    functions: BTreeMap<String, FnSig>,
    /// Variable scopes (stack of scope maps).
    scopes: Vec<BTreeMap<String, Ty>>,
    /// Accumulated diagnostics.
    diagnostics: Vec<Diagnostic>,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self {
            functions: BTreeMap::new(),
            scopes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn check_program(mut self, program: &Program) -> Result<(), Vec<Diagnostic>> {
        // First pass: register all function signatures
        for func in &program.functions {
            if self.functions.contains_key(&func.name.node) {
                self.error(
                    format!("duplicate function '{}'", func.name.node),
                    func.name.span,
                );
                continue;
            }
            self.functions.insert(
                func.name.node.clone(),
                FnSig {
                    arity: func.params.len(),
                },
            );
        }

        // Second pass: check function bodies
        for func in &program.functions {
            self.check_function(func);
        }

        if self.diagnostics.is_empty() {
            Ok(())
        } else {
            Err(self.diagnostics)
        }
    }

    fn check_function(&mut self, func: &Function) {
        self.scopes.clear();
        self.push_scope();
        for param in &func.params {
            if self.scopes[0].contains_key(&param.node) {
                self.error(
                    format!(
                        "duplicate parameter '{}' in function '{}'",
                        param.node, func.name.node
                    ),
                    param.span,
                );
                continue;
            }
            self.define_var(&param.node, Ty::Int);
        }
        for stmt in &func.body {
            self.check_stmt(stmt);
        }
        self.pop_scope();
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Declaration { name, value } => {
                // Redeclaration in the same block is an error; a nested
                // block may shadow an outer declaration.
                if let Some(scope) = self.scopes.last() {
                    if scope.contains_key(&name.node) {
                        self.error(
                            format!("variable '{}' redeclared", name.node),
                            name.span,
                        );
                    }
                }
                if let Some(value) = value {
                    self.check_int_expr(value, "initializer");
                }
                self.define_var(&name.node, Ty::Int);
            }
            Stmt::Assignment { name, value } => {
                if self.lookup_var(&name.node).is_none() {
                    self.error(
                        format!("variable '{}' used before declaration", name.node),
                        name.span,
                    );
                }
                self.check_int_expr(value, "assigned value");
            }
            Stmt::Return { value } => {
                self.check_int_expr(value, "return value");
            }
            Stmt::Print { value } => {
                // print accepts integers and strings
                self.check_expr(value);
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                self.check_int_expr(cond, "condition");
                self.check_block(then_body);
                if let Some(else_body) = else_body {
                    self.check_block(else_body);
                }
            }
            Stmt::While { cond, body } => {
                self.check_int_expr(cond, "condition");
                self.check_block(body);
            }
            Stmt::Expr(call) => {
                self.check_expr(call);
            }
        }
    }

    /// Visit an `if`/`else`/`while` body in its own lexical scope, so
    /// block-local declarations do not leak to sibling or following
    /// statements.
    fn check_block(&mut self, stmts: &[Stmt]) {
        self.push_scope();
        for stmt in stmts {
            self.check_stmt(stmt);
        }
        self.pop_scope();
    }

    /// Check an expression and report an error unless it is an integer.
    fn check_int_expr(&mut self, expr: &Spanned<Expr>, what: &str) {
        if self.check_expr(expr) == Ty::Str {
            self.error(
                format!("{} must be an integer, got a string", what),
                expr.span,
            );
        }
    }

    fn check_expr(&mut self, expr: &Spanned<Expr>) -> Ty {
        match &expr.node {
            Expr::Number(_) => Ty::Int,
            Expr::Str(_) => Ty::Str,
            Expr::Var(name) => match self.lookup_var(name) {
                Some(ty) => ty,
                None => {
                    self.error(
                        format!("use of undeclared variable '{}'", name),
                        expr.span,
                    );
                    Ty::Int
                }
            },
            Expr::BinOp { op, lhs, rhs } => {
                let lhs_ty = self.check_expr(lhs);
                let rhs_ty = self.check_expr(rhs);
                // == and != also compare strings; every other operator
                // is integer-only.
                if !op.is_equality() && (lhs_ty == Ty::Str || rhs_ty == Ty::Str) {
                    self.error(
                        format!("incompatible types in operation '{}'", op.as_str()),
                        expr.span,
                    );
                }
                Ty::Int
            }
            Expr::Call { name, args } => {
                match self.functions.get(&name.node) {
                    None => {
                        self.error(
                            format!("call to undeclared function '{}'", name.node),
                            name.span,
                        );
                    }
                    Some(sig) => {
                        if args.len() != sig.arity {
                            self.error(
                                format!(
                                    "function '{}' expects {} args, got {}",
                                    name.node,
                                    sig.arity,
                                    args.len()
                                ),
                                expr.span,
                            );
                        }
                    }
                }
                for arg in args {
                    self.check_int_expr(arg, "argument");
                }
                Ty::Int
            }
        }
    }

    // --- Scope management ---

    fn push_scope(&mut self) {
        self.scopes.push(BTreeMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn define_var(&mut self, name: &str, ty: Ty) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn lookup_var(&self, name: &str) -> Option<Ty> {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.get(name) {
                return Some(*ty);
            }
        }
        None
    }

    // --- Diagnostics ---

    fn error(&mut self, msg: String, span: Span) {
        self.diagnostics.push(Diagnostic::semantic(msg, span));
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}
