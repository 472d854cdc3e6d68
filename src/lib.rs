pub mod analyzer;
pub mod codegen;
pub mod lexer;
pub mod machine;
pub mod parser;

mod error;

use std::io::{BufRead, Write};

use codegen::{Codegen, Program, Warning};
use lexer::{LexicalError, Lexed, Lexer, StrSource, Token};
use machine::{Machine, MachineConfig};
use parser::{Parser, SyntaxTree};

pub use error::Error;

#[derive(Clone, Copy, Debug, Default)]
pub struct CompileOptions {
    /// Fail on the first batch of lexical errors instead of reporting them
    /// and compiling whatever tokens were recognised.
    pub strict_lexing: bool,
}

/// Everything a compilation produces, from tokens to the program listing.
#[derive(Debug)]
pub struct Compiled {
    pub tokens: Vec<Token>,
    pub lexical_errors: Vec<LexicalError>,
    pub tree: SyntaxTree,
    pub program: Program,
    pub warnings: Vec<Warning>,
}

pub fn lex(source: &str, options: CompileOptions) -> Result<Lexed, Error> {
    let lexed = Lexer::tokenize(StrSource::new(source));
    if options.strict_lexing && !lexed.errors.is_empty() {
        return Err(Error::Lexical(lexed.errors));
    }
    Ok(lexed)
}

pub fn parse(source: &str, options: CompileOptions) -> Result<SyntaxTree, Error> {
    let lexed = lex(source, options)?;
    Ok(Parser::new(lexed.tokens).parse()?)
}

pub fn compile(source: &str, options: CompileOptions) -> Result<Compiled, Error> {
    let Lexed { tokens, errors } = lex(source, options)?;
    let tree = Parser::new(tokens.clone()).parse()?;
    let generated = Codegen::generate(&tree)?;

    Ok(Compiled {
        tokens,
        lexical_errors: errors,
        tree,
        program: generated.program,
        warnings: generated.warnings,
    })
}

pub fn run(
    program: &Program,
    config: MachineConfig,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<(), Error> {
    let mut machine = Machine::load(program, config)?;
    machine.run(input, output)?;
    Ok(())
}
