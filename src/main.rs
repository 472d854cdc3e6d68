use std::{io, process::ExitCode};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use clap_stdin::FileOrStdin;
use stackc::{
    codegen::Program, lexer::Listing, machine::MachineConfig, CompileOptions,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// The token stream
    Tokens,
    /// The syntax tree
    Tree,
    /// The stack machine listing
    Code,
    /// Nothing, run the program instead
    Run,
}

/// Compiles a program and runs it on the stack machine.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Source file, or `-` to read from stdin
    source: FileOrStdin,

    /// What to produce
    #[arg(long, value_enum, default_value_t = Emit::Run)]
    emit: Emit,

    /// Treat the source as a stack machine listing and run it
    #[arg(long, conflicts_with = "emit")]
    listing: bool,

    /// Number of slots in the machine's data region
    #[arg(long, default_value_t = MachineConfig::default().data_capacity)]
    capacity: usize,

    /// Abort on lexical errors
    #[arg(long)]
    strict: bool,

    /// Increase log verbosity, may be repeated
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence all logging
    #[arg(short, long)]
    quiet: bool,
}

fn run(cli: Cli) -> Result<()> {
    stderrlog::new()
        .quiet(cli.quiet)
        .verbosity(1 + cli.verbose as usize)
        .init()?;

    let source = cli.source.contents()?;
    let options = CompileOptions {
        strict_lexing: cli.strict,
    };
    let config = MachineConfig {
        data_capacity: cli.capacity,
    };

    let program = if cli.listing {
        source.parse::<Program>()?
    } else {
        match cli.emit {
            Emit::Tokens => {
                let lexed = stackc::lex(&source, options)?;
                print!("{}", Listing(&lexed.tokens));
                return Ok(());
            }
            Emit::Tree => {
                print!("{}", stackc::parse(&source, options)?);
                return Ok(());
            }
            Emit::Code => {
                print!("{}", stackc::compile(&source, options)?.program);
                return Ok(());
            }
            Emit::Run => stackc::compile(&source, options)?.program,
        }
    };

    stackc::run(
        &program,
        config,
        &mut io::stdin().lock(),
        &mut io::stdout().lock(),
    )?;
    Ok(())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
