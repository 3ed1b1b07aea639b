//! Command-line interface for the clause reader.
//!
//! Wraps the [`Lexer`] and [`Reader`] in two small drivers: `lex` prints
//! every lexeme of a source file with its position, and `parse` prints the
//! canonical form of every clause, servicing `op/3` directives against the
//! operator table as it goes.

use clap::{Parser as ClapParser, Subcommand};
use prolog_reader::{Lexer, Reader};
use prolog_terms::Oper;
use std::fs::File;
use std::io::BufReader;
use std::sync::PoisonError;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Command
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prints the lexemes of a source file
    Lex {
        /// Input file with clauses
        #[arg(short, long)]
        input: String,
    },
    /// Parses clauses and prints their canonical form
    Parse {
        /// Input file with clauses
        #[arg(short, long)]
        input: String,
    },
}

fn main() -> std::io::Result<()> {
    env_logger::init();

    let args = Args::parse();
    match args.command {
        Commands::Lex { input } => {
            let rd = BufReader::new(File::open(&input)?);
            for lexeme in Lexer::new(rd) {
                println!("{}:{}: {}", lexeme.line, lexeme.col, lexeme);
            }
        }
        Commands::Parse { input } => {
            let rd = BufReader::new(File::open(&input)?);
            let mut reader = Reader::new(rd);
            let symbols = reader.symbols();
            let ops = reader.op_table();
            while let Some(unit) = reader.next_clause() {
                match unit.clause {
                    Ok(clause) => {
                        let ns = symbols.lock().unwrap_or_else(PoisonError::into_inner);
                        println!("{}", clause.display(&ns));
                        if unit.directive {
                            // service op/3 while the parser is paused
                            if let Ok(op) = Oper::from_directive(&clause, &ns) {
                                ops.write()
                                    .unwrap_or_else(PoisonError::into_inner)
                                    .insert(op);
                            }
                        }
                    }
                    Err(errors) => {
                        for err in errors {
                            eprintln!("{input}:{err}");
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
