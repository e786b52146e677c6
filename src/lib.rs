pub mod ast;
pub mod diagnostic;
pub mod lexeme;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod tac;
pub mod typecheck;
pub mod vm;

use diagnostic::Diagnostic;
use lexeme::Lexeme;
use lexer::Lexer;
use parser::Parser;
use span::Spanned;
use tac::builder::TacBuilder;
use tac::Instr;
use typecheck::TypeChecker;
use vm::{ExecutionResult, Interpreter, RuntimeError};

/// Every artifact produced by a full compile, in pipeline order.
#[derive(Debug)]
pub struct Compilation {
    pub tokens: Vec<Spanned<Lexeme>>,
    pub program: ast::Program,
    pub tac: Vec<Instr>,
    pub optimized: Vec<Instr>,
    pub target: Vec<String>,
}

/// Tokenize and parse a source string.
pub fn parse_source(source: &str) -> Result<ast::Program, Vec<Diagnostic>> {
    let tokens = Lexer::new(source).tokenize().map_err(|e| vec![e])?;
    Parser::new(tokens).parse_program().map_err(|e| vec![e])
}

/// Run the whole pipeline: source → tokens → AST → validated AST →
/// TAC → optimized TAC → target text.
pub fn compile(source: &str) -> Result<Compilation, Vec<Diagnostic>> {
    let tokens = Lexer::new(source).tokenize().map_err(|e| vec![e])?;
    let program = Parser::new(tokens.clone())
        .parse_program()
        .map_err(|e| vec![e])?;
    TypeChecker::new().check_program(&program)?;
    let tac = TacBuilder::new().build_program(&program);
    let optimized = tac::optimize::optimize(tac.clone());
    let target = tac::lower::lower(&optimized);
    Ok(Compilation {
        tokens,
        program,
        tac,
        optimized,
        target,
    })
}

/// Execute a TAC program by calling `main`; the returned integer is the
/// program's exit value.
pub fn execute(code: &[Instr]) -> Result<ExecutionResult, RuntimeError> {
    Interpreter::new(code).execute()
}
