use std::fmt;

/// The kind of a lexed token (component C2).
///
/// Mnemonic keywords are recognized case-insensitively against their lowercase spelling
/// during lexing; by the time a `Token` exists, the distinction between e.g. `MOV` and
/// `mov` is already gone.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind
{
	Mov,
	Add,
	Sub,
	Cmp,
	CmpU,
	And,
	Eor,
	Asr,
	Lsl,
	Lsr,
	Orr,
	Store,
	Load,
	Put,
	Print,
	Branch,
	BranchEq,
	BranchNeq,
	BranchGt,
	BranchGe,
	BranchLt,
	BranchLe,
	Call,
	Ret,

	Ident,
	Num,
	Str,
	Colon,
	Newline,
	Eof,
}

impl TokenKind
{
	/// Match a lowercased identifier-shaped lexeme against the fixed mnemonic keyword set.
	pub fn keyword_from_lexeme(lexeme: &str) -> Option<TokenKind>
	{
		use TokenKind::*;

		// A small, flat match is clearer here than a lazily-built map: the keyword
		// set is fixed at compile time and never grows at runtime.
		let kind = match lexeme.to_ascii_lowercase().as_str()
		{
			"mov" 		=> Mov,
			"add" 		=> Add,
			"sub" 		=> Sub,
			"cmp" 		=> Cmp,
			"cmp_u" 	=> CmpU,
			"and" 		=> And,
			"eor" 		=> Eor,
			"asr" 		=> Asr,
			"lsl" 		=> Lsl,
			"lsr" 		=> Lsr,
			"orr" 		=> Orr,
			"store" 	=> Store,
			"load" 		=> Load,
			"put" 		=> Put,
			"print" 	=> Print,
			"b" 		=> Branch,
			"beq" 		=> BranchEq,
			"bne" 		=> BranchNeq,
			"bgt" 		=> BranchGt,
			"bge" 		=> BranchGe,
			"blt" 		=> BranchLt,
			"ble" 		=> BranchLe,
			"call" 		=> Call,
			"ret" 		=> Ret,
			_ 			=> return None,
		};

		Some(kind)
	}
}

impl fmt::Display for TokenKind
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		write!(f, "{:?}", self)
	}
}

/// A single lexed token: a kind tag, a borrowed view into the source buffer, and a line number.
///
/// The lexeme is never copied out of the source; every `Token` borrows from the `&str` the
/// lexer was constructed with, which must outlive the parser built on top of it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Token<'src>
{
	pub kind: TokenKind,
	pub lexeme: &'src str,
	pub line: usize,
}

impl<'src> Token<'src>
{
	pub fn new(kind: TokenKind, lexeme: &'src str, line: usize) -> Token<'src>
	{
		Token { kind, lexeme, line }
	}
}

impl<'src> fmt::Display for Token<'src>
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		write!(f, "{:} \"{:}\" (line {:})", self.kind, self.lexeme, self.line)
	}
}
