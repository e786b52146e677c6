use std::path::PathBuf;
use std::process;

use clap::Parser;

use minic::ast::display::format_program;
use minic::diagnostic::render_diagnostics;
use minic::tac::format_tac;
use minic::{compile, execute};

#[derive(Parser)]
#[command(
    name = "minic",
    version,
    about = "Mini-C compiler with a three-address-code VM"
)]
struct Cli {
    /// Input source file
    input: PathBuf,
}

const SEPARATOR: &str = "-----------------------------------------------";

fn main() {
    let cli = Cli::parse();
    let filename = cli.input.display().to_string();

    let source = match std::fs::read_to_string(&cli.input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", filename, e);
            process::exit(1);
        }
    };

    let compilation = match compile(&source) {
        Ok(c) => c,
        Err(diagnostics) => {
            render_diagnostics(&diagnostics, &filename, &source);
            process::exit(1);
        }
    };

    println!("[SOURCE CODE]");
    println!("{}", source.trim_end());
    println!("{}", SEPARATOR);

    println!("[TOKENS]");
    for tok in &compilation.tokens {
        println!("    {:?} @ {}..{}", tok.node, tok.span.start, tok.span.end);
    }
    println!("{}", SEPARATOR);

    println!("[AST]");
    print!("{}", format_program(&compilation.program));
    println!("{}", SEPARATOR);

    println!("[TAC]");
    print!("{}", format_tac(&compilation.tac));
    println!("{}", SEPARATOR);

    println!("[OPTIMIZED TAC]");
    print!("{}", format_tac(&compilation.optimized));
    println!("{}", SEPARATOR);

    println!("[TARGET CODE]");
    for line in &compilation.target {
        println!("    {}", line);
    }
    println!("{}", SEPARATOR);

    println!("[PROGRAM OUTPUT]");
    match execute(&compilation.optimized) {
        Ok(result) => {
            println!("{}", SEPARATOR);
            println!("Program exited with return value: {}", result.exit_value);
        }
        Err(e) => {
            eprintln!("runtime error: {}", e);
            process::exit(1);
        }
    }
}
