// ASML: lexer, parser and tree-walking interpreter for a small register assembly language.
//
// See SPEC_FULL.md for the full design. The pipeline is: `lexer::tokenize` -> `parser::parse`
// -> `interpreter::run`, glued together below by `run_source` for callers that just want to
// feed it source text and get output back.
pub mod ast;
pub mod error;
pub mod interpreter;
pub mod label;
pub mod lexer;
pub mod memory;
pub mod parser;
pub mod token;

use std::io::Write;

pub use error::Error;
pub use interpreter::Machine;
pub use memory::Memory;
pub use parser::Program;

/// Lex and parse `source`, without executing it. Useful for tooling that only needs to
/// validate a program (a linter, a syntax-check mode) without running it.
pub fn compile(source: &str) -> Result<Program, Error>
{
	let tokens = lexer::tokenize(source)?;
	let program = parser::parse(&tokens)?;
	Ok(program)
}

/// Lex, parse and run `source` against a fresh [`Memory`] of `memory_size` bytes, writing
/// `PRINT` output to `out`. This is the single entry point the CLI driver (and most
/// library consumers) need.
pub fn run_source(source: &str, memory_size: usize, out: &mut dyn Write) -> Result<Machine, Error>
{
	let program = compile(source)?;
	let machine = interpreter::run(&program, Memory::new(memory_size), out)?;
	Ok(machine)
}
