// Single-pass tokenizer over a source buffer (component C2).
//
// The teacher crate leans on `nom` to recognize the shape of a single token (numeric
// literals with `0x`/`0b` prefixes, identifiers, ...) and drives that recognition line by
// line with `str::lines()`. ASML's grammar treats the newline itself as a significant
// token (it separates statements), so the driving loop here instead walks the whole
// buffer byte-by-byte and calls into small `nom` recognizers for the multi-character
// token shapes, in the same spirit as the teacher's `word_token`/`label_identifier_token`
// helpers.
use std::fmt;
use std::error::Error;
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_while, take_while1, take_while_m_n};
use nom::character::complete::char as single_char;
use nom::combinator::recognize;
use nom::sequence::pair;

use crate::token::{Token, TokenKind};

/// A lexical error: an unrecognized byte at a given line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError
{
	pub line: usize,
	pub byte: u8,
}

impl fmt::Display for LexError
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		write!(f, "[Line {:}] unrecognized byte {:#04x}", self.line, self.byte)
	}
}

impl Error for LexError { }

fn ident_text(i: &str) -> IResult<&str, &str>
{
	let cond_head = |c: char| c.is_ascii_alphabetic() || (c == '_');
	let cond_tail = |c: char| c.is_ascii_alphanumeric() || (c == '_');

	recognize(pair(take_while_m_n(1, 1, cond_head), take_while(cond_tail)))(i)
}

fn num_bin(i: &str) -> IResult<&str, &str>
{
	recognize(pair(tag_no_case("0b"), take_while1(|c: char| c.is_digit(2))))(i)
}

fn num_hex(i: &str) -> IResult<&str, &str>
{
	recognize(pair(tag_no_case("0x"), take_while1(|c: char| c.is_ascii_hexdigit())))(i)
}

fn num_dec(i: &str) -> IResult<&str, &str>
{
	take_while1(|c: char| c.is_ascii_digit())(i)
}

fn num_text(i: &str) -> IResult<&str, &str>
{
	alt((num_bin, num_hex, num_dec))(i)
}

fn str_text(i: &str) -> IResult<&str, &str>
{
	// No escape processing: everything up to the closing quote is the lexeme.
	let (rest, _) = single_char('"')(i)?;
	let (rest, text) = take_while(|c| c != '"')(rest)?;
	let (rest, _) = single_char('"')(rest)?;
	Ok((rest, text))
}

/// The full token stream for a source buffer, produced eagerly in one pass.
///
/// Eager tokenization (rather than yield-one-token-at-a-time) lets the parser keep a
/// plain index for its one-token lookahead instead of juggling a `current`/`next` pair of
/// owned tokens, while observably behaving the same: `EOF` is simply the token at (and
/// past) the last index.
pub fn tokenize(src: &str) -> Result<Vec<Token<'_>>, LexError>
{
	let mut tokens = Vec::new();
	let mut rest = src;
	let mut line = 1usize;

	loop
	{
		let mut chars = rest.char_indices();

		let c = match chars.next()
		{
			Some((_, c)) => c,
			None =>
			{
				tokens.push(Token::new(TokenKind::Eof, "", line));
				return Ok(tokens);
			},
		};

		match c
		{
			' ' | '\t' | '\r' =>
			{
				rest = &rest[1..];
			},

			'\n' =>
			{
				tokens.push(Token::new(TokenKind::Newline, "\n", line));
				rest = &rest[1..];
				line += 1;
			},

			'#' | ';' =>
			{
				let nl = rest.find('\n').unwrap_or(rest.len());
				rest = &rest[nl..];
			},

			':' =>
			{
				tokens.push(Token::new(TokenKind::Colon, &rest[..1], line));
				rest = &rest[1..];
			},

			'"' =>
			{
				match str_text(rest)
				{
					Ok((next_rest, text)) =>
					{
						tokens.push(Token::new(TokenKind::Str, text, line));
						rest = next_rest;
					},
					Err(_) =>
					{
						log::warn!("[line {:}] unterminated string literal", line);
						return Err(LexError { line, byte: c as u8 });
					},
				}
			},

			c if c.is_ascii_alphabetic() || (c == '_') =>
			{
				let (next_rest, lexeme) = ident_text(rest).expect("leading char already validated as identifier head");
				let kind = TokenKind::keyword_from_lexeme(lexeme).unwrap_or(TokenKind::Ident);
				tokens.push(Token::new(kind, lexeme, line));
				rest = next_rest;
			},

			c if c.is_ascii_digit() =>
			{
				let (next_rest, lexeme) = num_text(rest).expect("leading char already validated as digit");
				tokens.push(Token::new(TokenKind::Num, lexeme, line));
				rest = next_rest;
			},

			other =>
			{
				log::error!("[line {:}] unrecognized byte {:#04x} ('{:}')", line, other as u32, other.escape_default());
				return Err(LexError { line, byte: other as u8 });
			},
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::token::TokenKind::*;

	fn kinds(src: &str) -> Vec<TokenKind>
	{
		tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
	}

	#[test]
	fn keywords_are_case_insensitive()
	{
		assert_eq!(kinds("MOV"), vec![Mov, Eof]);
		assert_eq!(kinds("Mov"), vec![Mov, Eof]);
	}

	#[test]
	fn variable_lexes_as_ident()
	{
		assert_eq!(kinds("x17"), vec![Ident, Eof]);
	}

	#[test]
	fn numeric_prefixes()
	{
		let tokens = tokenize("0xff 0b101 42").unwrap();
		let lexemes: Vec<_> = tokens.iter().map(|t| t.lexeme).collect();
		assert_eq!(lexemes, vec!["0xff", "0b101", "42", ""]);
		assert!(tokens.iter().all(|t| t.kind == Num || t.kind == Eof));
	}

	#[test]
	fn string_literal_excludes_quotes()
	{
		let tokens = tokenize("\"hi\"").unwrap();
		assert_eq!(tokens[0].kind, Str);
		assert_eq!(tokens[0].lexeme, "hi");
	}

	#[test]
	fn comment_runs_to_end_of_line()
	{
		assert_eq!(kinds("mov # a comment\nadd"), vec![Mov, Newline, Add, Eof]);
	}

	#[test]
	fn newline_increments_line_number()
	{
		let tokens = tokenize("mov\nadd").unwrap();
		assert_eq!(tokens[0].line, 1);
		assert_eq!(tokens[2].line, 2);
	}

	#[test]
	fn unrecognized_byte_is_an_error()
	{
		assert!(tokenize("mov @").is_err());
	}

	#[test]
	fn eof_is_terminal()
	{
		let tokens = tokenize("ret").unwrap();
		assert_eq!(tokens.last().unwrap().kind, Eof);
	}
}
