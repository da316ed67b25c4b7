// Recursive-descent, one-token-lookahead parser (component C4).
//
// The teacher crate parses a whole source line at once with `nom`'s `all_consuming`
// (each `StatementToken` is self-contained). ASML's grammar instead treats the newline
// as a token that can separate a label-only line from the instruction its label
// eventually binds to (see the worked example in SPEC_FULL.md §8, scenario 3, where
// `eq:` sits on its own line ahead of the instruction it names). The token stream is
// therefore walked with a plain `usize` cursor into the token vector rather than a
// `current`/`next` pair of owned tokens; "one-token lookahead" is just "peek at
// `tokens[pos + 1]` before committing to a production".
use std::error::Error;
use std::fmt;

use crate::ast::{Base, BranchCond, Command, Operand};
use crate::label::LabelTable;
use crate::token::{Token, TokenKind};

/// A syntax error: malformed operand, out-of-range register, trailing tokens, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError
{
	pub line: usize,
	pub message: String,
}

impl ParseError
{
	fn new(line: usize, message: impl Into<String>) -> ParseError
	{
		ParseError { line, message: message.into() }
	}

	fn expected(what: &str, found: Token) -> ParseError
	{
		ParseError::new(found.line, format!("expected {:}, found {:} \"{:}\"", what, found.kind, found.lexeme))
	}

	fn register_out_of_range(found: Token, index: i64) -> ParseError
	{
		ParseError::new(found.line, format!("register index {:} is out of range (must be 0..=31)", index))
	}

	fn trailing_tokens(found: Token) -> ParseError
	{
		ParseError::new(found.line, format!("unexpected trailing {:} \"{:}\" after instruction", found.kind, found.lexeme))
	}
}

impl fmt::Display for ParseError
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		write!(f, "[Line {:}] {:}", self.line, self.message)
	}
}

impl Error for ParseError { }

/// The parser's output: the flat command sequence plus the label table built alongside it.
pub struct Program
{
	pub commands: Vec<Command>,
	pub labels: LabelTable,
}

fn parse_num_literal(lexeme: &str) -> Option<i64>
{
	let value = if let Some(digits) = lexeme.strip_prefix("0x").or_else(|| lexeme.strip_prefix("0X"))
	{
		u64::from_str_radix(digits, 16).ok()?
	}
	else if let Some(digits) = lexeme.strip_prefix("0b").or_else(|| lexeme.strip_prefix("0B"))
	{
		u64::from_str_radix(digits, 2).ok()?
	}
	else
	{
		lexeme.parse::<u64>().ok()?
	};

	Some(value as i64)
}

fn parse_register(tokens: &[Token], pos: usize) -> Result<(usize, usize), ParseError>
{
	let tok = tokens[pos];

	if tok.kind != TokenKind::Ident
	{
		return Err(ParseError::expected("variable", tok));
	}

	let digits = tok.lexeme.strip_prefix('x').ok_or_else(|| ParseError::expected("variable", tok))?;
	let index: i64 = digits.parse().map_err(|_| ParseError::expected("variable", tok))?;

	if !(0..=31).contains(&index)
	{
		return Err(ParseError::register_out_of_range(tok, index));
	}

	Ok((index as usize, pos + 1))
}

fn parse_immediate(tokens: &[Token], pos: usize) -> Result<(i64, usize), ParseError>
{
	let tok = tokens[pos];

	if tok.kind != TokenKind::Num
	{
		return Err(ParseError::expected("immediate", tok));
	}

	let value = parse_num_literal(tok.lexeme).ok_or_else(|| ParseError::new(tok.line, format!("malformed numeric literal \"{:}\"", tok.lexeme)))?;
	Ok((value, pos + 1))
}

fn parse_var_or_imm(tokens: &[Token], pos: usize) -> Result<(Operand, usize), ParseError>
{
	if tokens[pos].kind == TokenKind::Num
	{
		let (value, pos) = parse_immediate(tokens, pos)?;
		Ok((Operand::Immediate(value), pos))
	}
	else
	{
		let (reg, pos) = parse_register(tokens, pos)?;
		Ok((Operand::Register(reg), pos))
	}
}

fn parse_base(tokens: &[Token], pos: usize) -> Result<(Base, usize), ParseError>
{
	let tok = tokens[pos];

	// Matched against the raw lexeme rather than `tok.kind`: `b` (binary) lexes as the
	// `Branch` keyword, not `Ident`, so gating on `TokenKind::Ident` first would reject
	// every `print ... b` instruction.
	let base = Base::from_lexeme(tok.lexeme).ok_or_else(|| ParseError::expected("print base (d, x, b or s)", tok))?;
	Ok((base, pos + 1))
}

fn parse_str(tokens: &[Token], pos: usize) -> Result<(String, usize), ParseError>
{
	let tok = tokens[pos];

	if tok.kind != TokenKind::Str
	{
		return Err(ParseError::expected("string literal", tok));
	}

	Ok((tok.lexeme.to_string(), pos + 1))
}

fn parse_label_name(tokens: &[Token], pos: usize) -> Result<(String, usize), ParseError>
{
	let tok = tokens[pos];

	if tok.kind != TokenKind::Ident
	{
		return Err(ParseError::expected("label name", tok));
	}

	Ok((tok.lexeme.to_string(), pos + 1))
}

// Parse exactly one instruction starting at `pos` (which must name a mnemonic token).
// Returns the assembled command and the position just past its last operand.
fn parse_instruction(tokens: &[Token], pos: usize) -> Result<(Command, usize), ParseError>
{
	let mnemonic = tokens[pos];
	let pos = pos + 1;

	match mnemonic.kind
	{
		TokenKind::Mov =>
		{
			let (dest, pos) = parse_register(tokens, pos)?;
			let (imm, pos) = parse_immediate(tokens, pos)?;
			Ok((Command::Mov { dest, imm }, pos))
		},

		TokenKind::Add =>
		{
			let (dest, pos) = parse_register(tokens, pos)?;
			let (a, pos) = parse_register(tokens, pos)?;
			let (b, pos) = parse_var_or_imm(tokens, pos)?;
			Ok((Command::Add { dest, a, b }, pos))
		},

		TokenKind::Sub =>
		{
			let (dest, pos) = parse_register(tokens, pos)?;
			let (a, pos) = parse_register(tokens, pos)?;
			let (b, pos) = parse_var_or_imm(tokens, pos)?;
			Ok((Command::Sub { dest, a, b }, pos))
		},

		TokenKind::Cmp | TokenKind::CmpU =>
		{
			let unsigned = mnemonic.kind == TokenKind::CmpU;
			let (dest, pos) = parse_register(tokens, pos)?;
			let (a, pos) = parse_var_or_imm(tokens, pos)?;
			Ok((Command::Cmp { dest, a, unsigned }, pos))
		},

		TokenKind::And =>
		{
			let (dest, pos) = parse_register(tokens, pos)?;
			let (a, pos) = parse_register(tokens, pos)?;
			let (b, pos) = parse_register(tokens, pos)?;
			Ok((Command::And { dest, a, b }, pos))
		},

		TokenKind::Eor =>
		{
			let (dest, pos) = parse_register(tokens, pos)?;
			let (a, pos) = parse_register(tokens, pos)?;
			let (b, pos) = parse_register(tokens, pos)?;
			Ok((Command::Eor { dest, a, b }, pos))
		},

		TokenKind::Orr =>
		{
			let (dest, pos) = parse_register(tokens, pos)?;
			let (a, pos) = parse_register(tokens, pos)?;
			let (b, pos) = parse_register(tokens, pos)?;
			Ok((Command::Orr { dest, a, b }, pos))
		},

		TokenKind::Asr =>
		{
			let (dest, pos) = parse_register(tokens, pos)?;
			let (a, pos) = parse_register(tokens, pos)?;
			let (amount, pos) = parse_immediate(tokens, pos)?;
			Ok((Command::Asr { dest, a, amount }, pos))
		},

		TokenKind::Lsl =>
		{
			let (dest, pos) = parse_register(tokens, pos)?;
			let (a, pos) = parse_register(tokens, pos)?;
			let (amount, pos) = parse_immediate(tokens, pos)?;
			Ok((Command::Lsl { dest, a, amount }, pos))
		},

		TokenKind::Lsr =>
		{
			let (dest, pos) = parse_register(tokens, pos)?;
			let (a, pos) = parse_register(tokens, pos)?;
			let (amount, pos) = parse_immediate(tokens, pos)?;
			Ok((Command::Lsr { dest, a, amount }, pos))
		},

		TokenKind::Store =>
		{
			let (dest, pos) = parse_register(tokens, pos)?;
			let (addr, pos) = parse_var_or_imm(tokens, pos)?;
			let (len, pos) = parse_immediate(tokens, pos)?;
			Ok((Command::Store { dest, addr, len }, pos))
		},

		TokenKind::Load =>
		{
			let (dest, pos) = parse_register(tokens, pos)?;
			let (len, pos) = parse_immediate(tokens, pos)?;
			let (addr, pos) = parse_var_or_imm(tokens, pos)?;
			Ok((Command::Load { dest, len, addr }, pos))
		},

		TokenKind::Put =>
		{
			let (addr, pos) = parse_var_or_imm(tokens, pos)?;
			let (text, pos) = parse_str(tokens, pos)?;
			Ok((Command::Put { addr, text }, pos))
		},

		TokenKind::Print =>
		{
			let (value, pos) = parse_var_or_imm(tokens, pos)?;
			let (base, pos) = parse_base(tokens, pos)?;
			Ok((Command::Print { value, base }, pos))
		},

		TokenKind::Branch | TokenKind::BranchEq | TokenKind::BranchNeq |
		TokenKind::BranchGt | TokenKind::BranchGe | TokenKind::BranchLt | TokenKind::BranchLe =>
		{
			let cond = match mnemonic.kind
			{
				TokenKind::Branch 		=> BranchCond::None,
				TokenKind::BranchEq 	=> BranchCond::Equal,
				TokenKind::BranchNeq 	=> BranchCond::NotEqual,
				TokenKind::BranchGt 	=> BranchCond::Greater,
				TokenKind::BranchGe 	=> BranchCond::GreaterEqual,
				TokenKind::BranchLt 	=> BranchCond::Less,
				TokenKind::BranchLe 	=> BranchCond::LessEqual,
				_ 						=> unreachable!(),
			};

			let (label, pos) = parse_label_name(tokens, pos)?;
			Ok((Command::Branch { cond, label }, pos))
		},

		TokenKind::Call =>
		{
			let (label, pos) = parse_label_name(tokens, pos)?;
			Ok((Command::Call { label }, pos))
		},

		TokenKind::Ret => Ok((Command::Ret, pos)),

		_ => Err(ParseError::expected("instruction mnemonic", mnemonic)),
	}
}

fn is_label_start(tokens: &[Token], pos: usize) -> bool
{
	tokens[pos].kind == TokenKind::Ident && tokens.get(pos + 1).map(|t| t.kind) == Some(TokenKind::Colon)
}

/// Parse the full token stream produced by [`crate::lexer::tokenize`].
pub fn parse(tokens: &[Token]) -> Result<Program, ParseError>
{
	let mut commands = Vec::new();
	let mut labels = LabelTable::new();
	let mut pending_labels: Vec<String> = Vec::new();
	let mut pos = 0usize;

	loop
	{
		while tokens[pos].kind == TokenKind::Newline
		{
			pos += 1;
		}

		if tokens[pos].kind == TokenKind::Eof
		{
			if !pending_labels.is_empty()
			{
				let index = commands.len();
				commands.push(Command::Nop);

				for name in pending_labels.drain(..)
				{
					labels.declare(&name, index);
				}
			}

			break;
		}

		while is_label_start(tokens, pos)
		{
			pending_labels.push(tokens[pos].lexeme.to_string());
			pos += 2;

			while tokens[pos].kind == TokenKind::Newline
			{
				pos += 1;
			}
		}

		if tokens[pos].kind == TokenKind::Eof
		{
			let index = commands.len();
			commands.push(Command::Nop);

			for name in pending_labels.drain(..)
			{
				labels.declare(&name, index);
			}

			break;
		}

		let (command, next_pos) = parse_instruction(tokens, pos)?;
		pos = next_pos;

		let index = commands.len();
		commands.push(command);

		for name in pending_labels.drain(..)
		{
			labels.declare(&name, index);
		}

		match tokens[pos].kind
		{
			TokenKind::Newline => pos += 1,
			TokenKind::Eof => (),
			_ => return Err(ParseError::trailing_tokens(tokens[pos])),
		}
	}

	log::debug!("parsed {:} commands, {:} labels", commands.len(), labels.len());
	Ok(Program { commands, labels })
}
