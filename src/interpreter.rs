// Tree-walking interpreter (component C5): direct execution over the command sequence.
use std::error::Error;
use std::fmt;
use std::io::Write;
use std::num::Wrapping;

use bitflags::bitflags;

use crate::ast::{Base, BranchCond, Command, Operand, REGISTER_COUNT};
use crate::label::LabelTable;
use crate::memory::Memory;
use crate::parser::Program;

bitflags!
{
	/// The three mutually-exclusive comparison flags. At most one bit is ever set.
	pub struct ComparisonFlags: u8
	{
		const GREATER 	= 1 << 0;
		const EQUAL 	= 1 << 1;
		const LESS 		= 1 << 2;
	}
}

impl ComparisonFlags
{
	fn from_ordering(ordering: std::cmp::Ordering) -> ComparisonFlags
	{
		use std::cmp::Ordering::*;

		match ordering
		{
			Greater => ComparisonFlags::GREATER,
			Equal 	=> ComparisonFlags::EQUAL,
			Less 	=> ComparisonFlags::LESS,
		}
	}

	pub fn is_greater(&self) -> bool { self.contains(ComparisonFlags::GREATER) }
	pub fn is_equal(&self) -> bool { self.contains(ComparisonFlags::EQUAL) }
	pub fn is_less(&self) -> bool { self.contains(ComparisonFlags::LESS) }
}

impl BranchCond
{
	fn holds(&self, flags: ComparisonFlags) -> bool
	{
		match self
		{
			BranchCond::None 			=> true,
			BranchCond::Equal 			=> flags.is_equal(),
			BranchCond::NotEqual 		=> !flags.is_equal(),
			BranchCond::Greater 		=> flags.is_greater(),
			BranchCond::GreaterEqual 	=> flags.is_greater() || flags.is_equal(),
			BranchCond::Less 			=> flags.is_less(),
			BranchCond::LessEqual 		=> flags.is_less() || flags.is_equal(),
		}
	}
}

/// A saved call-site register snapshot plus the command index to resume at on `RET`.
struct CallFrame
{
	registers: [i64; REGISTER_COUNT],
	return_pc: usize,
}

/// A runtime (semantic) fault: unresolved label, out-of-bounds memory access, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError
{
	pub pc: usize,
	pub message: String,
}

impl RuntimeError
{
	fn new(pc: usize, message: impl Into<String>) -> RuntimeError
	{
		RuntimeError { pc, message: message.into() }
	}
}

impl fmt::Display for RuntimeError
{
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
	{
		write!(f, "[pc {:}] {:}", self.pc, self.message)
	}
}

impl Error for RuntimeError { }

/// The full machine state: registers, comparison flags, byte memory and call stack.
pub struct Machine
{
	registers: [i64; REGISTER_COUNT],
	flags: ComparisonFlags,
	memory: Memory,
	call_stack: Vec<CallFrame>,
}

impl Machine
{
	pub fn new(memory: Memory) -> Machine
	{
		Machine
		{
			registers: [0i64; REGISTER_COUNT],
			flags: ComparisonFlags::empty(),
			memory,
			call_stack: Vec::new(),
		}
	}

	pub fn register(&self, index: usize) -> i64
	{
		self.registers[index]
	}

	pub fn memory(&self) -> &Memory
	{
		&self.memory
	}

	pub fn flags(&self) -> ComparisonFlags
	{
		self.flags
	}

	/// Print the diagnostic state dump (component C5 external interface): the error
	/// flag, the three comparison flags, and all 32 registers, 8 per line.
	pub fn dump_state(&self, had_error: bool, out: &mut dyn Write) -> std::io::Result<()>
	{
		writeln!(out, "had_error: {:}", had_error)?;
		writeln!(out, "flags: greater={:} equal={:} less={:}", self.flags.is_greater(), self.flags.is_equal(), self.flags.is_less())?;

		for chunk in self.registers.chunks(8)
		{
			let row: Vec<String> = chunk.iter().map(|v| v.to_string()).collect();
			writeln!(out, "{:}", row.join(" "))?;
		}

		Ok(())
	}
}

/// Execute `program` to completion (halt or runtime error) against `machine`, writing
/// `PRINT` output to `out`.
///
/// Takes the machine by reference (rather than owning/returning it) so that a caller
/// which wants the diagnostic state dump (SPEC_FULL.md §6) on a *failed* run — the CLI's
/// `--dump` flag being the prototypical case — still has access to it after an `Err`.
pub fn run_to_completion(program: &Program, machine: &mut Machine, out: &mut dyn Write) -> Result<(), RuntimeError>
{
	let mut pc = 0usize;

	while pc < program.commands.len()
	{
		pc = step(&program.commands[pc], pc, &program.labels, machine, out)?;
	}

	Ok(())
}

/// Convenience wrapper: build a fresh [`Machine`] over `memory`, run `program` to
/// completion, and return the machine on success.
pub fn run(program: &Program, memory: Memory, out: &mut dyn Write) -> Result<Machine, RuntimeError>
{
	let mut machine = Machine::new(memory);
	run_to_completion(program, &mut machine, out)?;
	Ok(machine)
}

// Execute a single command and return the index of the next command to run.
// A return value of `program.commands.len()` (or greater) halts the interpreter.
fn step(command: &Command, pc: usize, labels: &LabelTable, machine: &mut Machine, out: &mut dyn Write) -> Result<usize, RuntimeError>
{
	log::trace!("[pc {:}] {:}", pc, command);

	match command
	{
		Command::Mov { dest, imm } =>
		{
			machine.registers[*dest] = *imm;
			Ok(pc + 1)
		},

		Command::Add { dest, a, b } =>
		{
			let lhs = Wrapping(machine.registers[*a]);
			let rhs = Wrapping(b.resolve(&machine.registers));
			machine.registers[*dest] = (lhs + rhs).0;
			Ok(pc + 1)
		},

		Command::Sub { dest, a, b } =>
		{
			let lhs = Wrapping(machine.registers[*a]);
			let rhs = Wrapping(b.resolve(&machine.registers));
			machine.registers[*dest] = (lhs - rhs).0;
			Ok(pc + 1)
		},

		Command::Cmp { dest, a, unsigned } =>
		{
			let lhs = machine.registers[*dest];
			let rhs = a.resolve(&machine.registers);

			let ordering = if *unsigned
			{
				(lhs as u64).cmp(&(rhs as u64))
			}
			else
			{
				lhs.cmp(&rhs)
			};

			machine.flags = ComparisonFlags::from_ordering(ordering);
			Ok(pc + 1)
		},

		Command::And { dest, a, b } =>
		{
			machine.registers[*dest] = machine.registers[*a] & machine.registers[*b];
			Ok(pc + 1)
		},

		Command::Eor { dest, a, b } =>
		{
			machine.registers[*dest] = machine.registers[*a] ^ machine.registers[*b];
			Ok(pc + 1)
		},

		Command::Orr { dest, a, b } =>
		{
			machine.registers[*dest] = machine.registers[*a] | machine.registers[*b];
			Ok(pc + 1)
		},

		Command::Asr { dest, a, amount } =>
		{
			let shift = (*amount as u32) & 63;
			machine.registers[*dest] = machine.registers[*a] >> shift;
			Ok(pc + 1)
		},

		Command::Lsl { dest, a, amount } =>
		{
			let shift = (*amount as u32) & 63;
			machine.registers[*dest] = ((machine.registers[*a] as u64) << shift) as i64;
			Ok(pc + 1)
		},

		Command::Lsr { dest, a, amount } =>
		{
			let shift = (*amount as u32) & 63;
			machine.registers[*dest] = ((machine.registers[*a] as u64) >> shift) as i64;
			Ok(pc + 1)
		},

		Command::Store { dest, addr, len } =>
		{
			let address = addr.resolve(&machine.registers) as u64 as usize;
			let length = *len as usize;
			let value = machine.registers[*dest] as u64;

			if !machine.memory.store_u64(value, address, length)
			{
				return Err(RuntimeError::new(pc, format!("STORE out of bounds at address {:#x} (length {:})", address, length)));
			}

			Ok(pc + 1)
		},

		Command::Load { dest, len, addr } =>
		{
			let address = addr.resolve(&machine.registers) as u64 as usize;
			let length = *len as usize;

			match machine.memory.load_u64(address, length)
			{
				Some(value) =>
				{
					machine.registers[*dest] = value as i64;
					Ok(pc + 1)
				},
				None => Err(RuntimeError::new(pc, format!("LOAD out of bounds at address {:#x} (length {:})", address, length))),
			}
		},

		Command::Put { addr, text } =>
		{
			let address = addr.resolve(&machine.registers) as u64 as usize;

			if !machine.memory.store_c_string(text.as_bytes(), address)
			{
				return Err(RuntimeError::new(pc, format!("PUT out of bounds at address {:#x}", address)));
			}

			Ok(pc + 1)
		},

		Command::Print { value, base } =>
		{
			print_value(value.resolve(&machine.registers), *base, &machine.memory, pc, out)?;
			Ok(pc + 1)
		},

		Command::Branch { cond, label } =>
		{
			if cond.holds(machine.flags)
			{
				resolve_branch_target(label, labels, pc)
			}
			else
			{
				Ok(pc + 1)
			}
		},

		Command::Call { label } =>
		{
			let target = resolve_branch_target(label, labels, pc)?;

			machine.call_stack.push(CallFrame
			{
				registers: machine.registers,
				return_pc: pc + 1,
			});

			Ok(target)
		},

		Command::Ret =>
		{
			match machine.call_stack.pop()
			{
				None =>
				{
					log::debug!("RET with empty call stack: clean halt");
					Ok(usize::MAX)
				},
				Some(frame) =>
				{
					let result = machine.registers[0];
					machine.registers = frame.registers;
					machine.registers[0] = result;
					Ok(frame.return_pc)
				},
			}
		},

		Command::Nop => Ok(pc + 1),
	}
}

fn resolve_branch_target(label: &str, labels: &LabelTable, pc: usize) -> Result<usize, RuntimeError>
{
	labels.resolve(label).ok_or_else(||
	{
		log::error!("[pc {:}] unresolved label \"{:}\"", pc, label);
		RuntimeError::new(pc, format!("unresolved label \"{:}\"", label))
	})
}

fn print_value(value: i64, base: Base, memory: &Memory, pc: usize, out: &mut dyn Write) -> Result<(), RuntimeError>
{
	let io_result = match base
	{
		Base::Decimal => writeln!(out, "{:}", value),
		Base::Hex => writeln!(out, "0x{:x}", value as u64),
		Base::Binary => writeln!(out, "0b{:b}", value as u64),
		Base::Str =>
		{
			let address = value as u64 as usize;

			let text = memory.load_c_string(address)
				.ok_or_else(|| RuntimeError::new(pc, format!("PRINT s: no NUL terminator found from address {:#x}", address)))?;

			writeln!(out, "{:}", String::from_utf8_lossy(text))
		},
	};

	io_result.map_err(|e| RuntimeError::new(pc, format!("write error: {:}", e)))
}

// `RET` with an empty call stack halts. The interpreter loop (`run`) checks
// `pc < program.commands.len()`, so any sentinel past the end works; `usize::MAX`
// documents "this isn't really an index" better than the commands length would.

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::lexer::tokenize;
	use crate::parser::parse;

	fn run_src(src: &str) -> String
	{
		let tokens = tokenize(src).expect("lex");
		let program = parse(&tokens).expect("parse");
		let mut out = Vec::new();
		run(&program, Memory::new(crate::memory::DEFAULT_SIZE), &mut out).expect("run");
		String::from_utf8(out).unwrap()
	}

	#[test]
	fn scenario_add_and_print_decimal()
	{
		assert_eq!(run_src("mov x1 5\nmov x2 7\nadd x3 x1 x2\nprint x3 d\n"), "12\n");
	}

	#[test]
	fn scenario_print_hex()
	{
		assert_eq!(run_src("mov x1 0xff\nprint x1 x\n"), "0xff\n");
	}

	#[test]
	fn scenario_branch_on_equal()
	{
		let src = "mov x1 5\nmov x2 5\ncmp x1 x2\nbeq eq\nmov x3 0\nb end\neq:\nmov x3 1\nend:\nprint x3 d\n";
		assert_eq!(run_src(src), "1\n");
	}

	#[test]
	fn scenario_put_and_print_string()
	{
		assert_eq!(run_src("mov x1 0\nput x1 \"hi\"\nprint x1 s\n"), "hi\n");
	}

	#[test]
	fn scenario_call_preserves_x0_as_return_value()
	{
		let src = "mov x1 3\ncall dbl\nprint x0 d\nb end\ndbl:\nadd x0 x1 x1\nret\nend:\n";
		assert_eq!(run_src(src), "6\n");
	}

	#[test]
	fn scenario_logical_shift_left_prints_binary()
	{
		assert_eq!(run_src("mov x1 5\nlsl x2 x1 2\nprint x2 b\n"), "0b10100\n");
	}

	#[test]
	fn unresolved_branch_label_is_a_runtime_error()
	{
		let tokens = tokenize("b nowhere\n").unwrap();
		let program = parse(&tokens).unwrap();
		let mut out = Vec::new();
		assert!(run(&program, Memory::new(crate::memory::DEFAULT_SIZE), &mut out).is_err());
	}

	#[test]
	fn ret_with_empty_stack_halts_cleanly()
	{
		let tokens = tokenize("ret\n").unwrap();
		let program = parse(&tokens).unwrap();
		let mut out = Vec::new();
		assert!(run(&program, Memory::new(crate::memory::DEFAULT_SIZE), &mut out).is_ok());
	}

	#[test]
	fn call_and_ret_restore_stack_depth()
	{
		let src = "call f\nret\nf:\nret\n";
		let tokens = tokenize(src).unwrap();
		let program = parse(&tokens).unwrap();
		let mut out = Vec::new();
		let machine = run(&program, Memory::new(crate::memory::DEFAULT_SIZE), &mut out).unwrap();
		assert_eq!(machine.call_stack.len(), 0);
	}

	#[test]
	fn store_then_load_masks_to_length()
	{
		let src = "mov x1 0xffffffffffffffff\nstore x1 0 2\nload x2 2 0\nprint x2 d\n";
		assert_eq!(run_src(src), "65535\n");
	}

	#[test]
	fn cmp_leaves_exactly_one_flag_set()
	{
		let tokens = tokenize("mov x1 5\nmov x2 3\ncmp x1 x2\n").unwrap();
		let program = parse(&tokens).unwrap();
		let mut out = Vec::new();
		let machine = run(&program, Memory::new(crate::memory::DEFAULT_SIZE), &mut out).unwrap();
		let set_count = [machine.flags.is_greater(), machine.flags.is_equal(), machine.flags.is_less()].iter().filter(|&&b| b).count();
		assert_eq!(set_count, 1);
		assert!(machine.flags.is_greater());
	}

	#[test]
	fn unsigned_compare_treats_negative_as_large()
	{
		let tokens = tokenize("mov x1 0xffffffffffffffff\nmov x2 1\ncmp_u x1 x2\n").unwrap();
		let program = parse(&tokens).unwrap();
		let mut out = Vec::new();
		let machine = run(&program, Memory::new(crate::memory::DEFAULT_SIZE), &mut out).unwrap();
		assert!(machine.flags.is_greater());
	}
}
