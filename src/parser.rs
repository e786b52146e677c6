use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

type ParseResult<T> = Result<T, Diagnostic>;

/// Hand-written recursive-descent parser with a single token of
/// lookahead (two where a call must be distinguished from a variable).
/// The first token mismatch is fatal; no recovery is attempted.
pub struct Parser {
    tokens: Vec<Spanned<Lexeme>>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned<Lexeme>>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_program(mut self) -> ParseResult<Program> {
        let mut functions = Vec::new();
        while !self.at(&Lexeme::Eof) {
            functions.push(self.parse_function()?);
        }
        if functions.is_empty() {
            return Err(self
                .error_at_current("expected a function definition")
                .with_help("a program is a sequence of `int name(...) { ... }` definitions".to_string()));
        }
        Ok(Program { functions })
    }

    fn parse_function(&mut self) -> ParseResult<Function> {
        self.expect(&Lexeme::Int)?;
        let name = self.expect_ident()?;
        self.expect(&Lexeme::LParen)?;
        let params = self.parse_params()?;
        self.expect(&Lexeme::RParen)?;
        let body = self.parse_block()?;
        Ok(Function { name, params, body })
    }

    /// `params := ('int'? IDENT) (',' 'int'? IDENT)*`; the type keyword
    /// before each parameter name is optional.
    fn parse_params(&mut self) -> ParseResult<Vec<Spanned<String>>> {
        let mut params = Vec::new();
        if self.at(&Lexeme::RParen) {
            return Ok(params);
        }
        loop {
            self.eat(&Lexeme::Int);
            params.push(self.expect_ident()?);
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(&Lexeme::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
            stmts.push(self.parse_statement()?);
        }
        self.expect(&Lexeme::RBrace)?;
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        if self.at(&Lexeme::Int) {
            self.parse_declaration()
        } else if matches!(self.peek(), Lexeme::Ident(_)) {
            // IDENT '(' starts a call statement, anything else an assignment
            if self.second_is(&Lexeme::LParen) {
                let call = self.parse_call()?;
                self.expect(&Lexeme::Semicolon)?;
                Ok(Stmt::Expr(call))
            } else {
                self.parse_assignment()
            }
        } else if self.at(&Lexeme::Return) {
            self.parse_return()
        } else if self.at(&Lexeme::Print) {
            self.parse_print()
        } else if self.at(&Lexeme::If) {
            self.parse_if()
        } else if self.at(&Lexeme::While) {
            self.parse_while()
        } else {
            Err(self.error_at_current(&format!(
                "unexpected {} in statement",
                self.peek().description()
            )))
        }
    }

    fn parse_declaration(&mut self) -> ParseResult<Stmt> {
        self.expect(&Lexeme::Int)?;
        let name = self.expect_ident()?;
        let value = if self.eat(&Lexeme::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(&Lexeme::Semicolon)?;
        Ok(Stmt::Declaration { name, value })
    }

    fn parse_assignment(&mut self) -> ParseResult<Stmt> {
        let name = self.expect_ident()?;
        self.expect(&Lexeme::Assign)?;
        let value = self.parse_expression()?;
        self.expect(&Lexeme::Semicolon)?;
        Ok(Stmt::Assignment { name, value })
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        self.expect(&Lexeme::Return)?;
        let value = self.parse_expression()?;
        self.expect(&Lexeme::Semicolon)?;
        Ok(Stmt::Return { value })
    }

    fn parse_print(&mut self) -> ParseResult<Stmt> {
        self.expect(&Lexeme::Print)?;
        self.expect(&Lexeme::LParen)?;
        let value = self.parse_expression()?;
        self.expect(&Lexeme::RParen)?;
        self.expect(&Lexeme::Semicolon)?;
        Ok(Stmt::Print { value })
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        self.expect(&Lexeme::If)?;
        self.expect(&Lexeme::LParen)?;
        let cond = self.parse_expression()?;
        self.expect(&Lexeme::RParen)?;
        let then_body = self.parse_block()?;

        let else_body = if self.eat(&Lexeme::Else) {
            if self.at(&Lexeme::If) {
                // `else if` nests a single if statement as the else branch
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(Stmt::If {
            cond,
            then_body,
            else_body,
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        self.expect(&Lexeme::While)?;
        self.expect(&Lexeme::LParen)?;
        let cond = self.parse_expression()?;
        self.expect(&Lexeme::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body })
    }

    // --- Expression parsing (layered precedence, folded left) ---

    fn parse_expression(&mut self) -> ParseResult<Spanned<Expr>> {
        let mut lhs = self.parse_additive()?;
        while let Some(op) = relop(self.peek()) {
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = binop(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> ParseResult<Spanned<Expr>> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Lexeme::Plus => BinOp::Add,
                Lexeme::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = binop(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> ParseResult<Spanned<Expr>> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                Lexeme::Star => BinOp::Mul,
                Lexeme::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_factor()?;
            lhs = binop(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> ParseResult<Spanned<Expr>> {
        let span = self.current_span();
        match self.peek().clone() {
            Lexeme::Integer(n) => {
                self.advance();
                Ok(Spanned::new(Expr::Number(n), span))
            }
            Lexeme::Str(s) => {
                self.advance();
                Ok(Spanned::new(Expr::Str(s), span))
            }
            Lexeme::Ident(_) => {
                if self.second_is(&Lexeme::LParen) {
                    self.parse_call()
                } else {
                    let name = self.expect_ident()?;
                    Ok(Spanned::new(Expr::Var(name.node), name.span))
                }
            }
            Lexeme::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&Lexeme::RParen)?;
                Ok(inner)
            }
            other => Err(self.error_at_current(&format!(
                "unexpected {} in expression",
                other.description()
            ))),
        }
    }

    fn parse_call(&mut self) -> ParseResult<Spanned<Expr>> {
        let name = self.expect_ident()?;
        self.expect(&Lexeme::LParen)?;
        let mut args = Vec::new();
        if !self.at(&Lexeme::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.eat(&Lexeme::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(&Lexeme::RParen)?;
        let span = name.span.merge(end);
        Ok(Spanned::new(Expr::Call { name, args }, span))
    }

    // --- Utility methods ---

    fn peek(&self) -> &Lexeme {
        &self.tokens[self.pos].node
    }

    fn second(&self) -> &Lexeme {
        // The token stream always ends with Eof, so clamp to the last token.
        let i = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[i].node
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn at(&self, token: &Lexeme) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn second_is(&self, token: &Lexeme) -> bool {
        std::mem::discriminant(self.second()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Lexeme) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Lexeme) -> ParseResult<Span> {
        if self.at(token) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.error_at_current(&format!(
                "expected {}, found {}",
                token.description(),
                self.peek().description()
            )))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<Spanned<String>> {
        if let Lexeme::Ident(name) = self.peek().clone() {
            let span = self.current_span();
            self.advance();
            Ok(Spanned::new(name, span))
        } else {
            Err(self.error_at_current(&format!(
                "expected identifier, found {}",
                self.peek().description()
            )))
        }
    }

    fn error_at_current(&self, msg: &str) -> Diagnostic {
        Diagnostic::syntax(msg.to_string(), self.current_span())
    }
}

fn relop(token: &Lexeme) -> Option<BinOp> {
    match token {
        Lexeme::EqEq => Some(BinOp::Eq),
        Lexeme::NotEq => Some(BinOp::Ne),
        Lexeme::Lt => Some(BinOp::Lt),
        Lexeme::LtEq => Some(BinOp::Le),
        Lexeme::Gt => Some(BinOp::Gt),
        Lexeme::GtEq => Some(BinOp::Ge),
        _ => None,
    }
}

fn binop(op: BinOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    let span = lhs.span.merge(rhs.span);
    Spanned::new(
        Expr::BinOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        span,
    )
}
