// Aggregate error type tying the three pipeline stages together, in the same spirit as
// the teacher's own `assembly::error::AssemblerError` (a plain enum with hand-written
// `Display`/`Error` impls and `From` conversions, no derive-macro error crate).
use std::error::Error as StdError;
use std::fmt;

use crate::interpreter::RuntimeError;
use crate::lexer::LexError;
use crate::parser::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{
	Lex(LexError),
	Parse(ParseError),
	Runtime(RuntimeError),
}

impl From<LexError> for Error
{
	fn from(err: LexError) -> Error
	{
		Error::Lex(err)
	}
}

impl From<ParseError> for Error
{
	fn from(err: ParseError) -> Error
	{
		Error::Parse(err)
	}
}

impl From<RuntimeError> for Error
{
	fn from(err: RuntimeError) -> Error
	{
		Error::Runtime(err)
	}
}

impl fmt::Display for Error
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		match self
		{
			Error::Lex(err) 	=> write!(f, "{:}", err),
			Error::Parse(err) 	=> write!(f, "{:}", err),
			Error::Runtime(err) => write!(f, "{:}", err),
		}
	}
}

impl StdError for Error { }

impl Error
{
	/// The exit code the CLI driver should use for this error (see SPEC_FULL.md §6).
	pub fn exit_code(&self) -> i32
	{
		match self
		{
			Error::Lex(_) | Error::Parse(_) => 1,
			Error::Runtime(_) => 2,
		}
	}
}
