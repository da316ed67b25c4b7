// Thin CLI driver: reads source text, hands it to the `asml` library, writes output and
// maps pipeline errors to exit codes. No lexing/parsing/execution logic lives here (see
// SPEC_FULL.md §1/§2a) — this mirrors the teacher's own `main.rs`, which is a bare
// consumer of the library's public API.
use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::process::ExitCode;

use asml::{interpreter, memory, Machine, Memory};

fn read_source(path: Option<&str>) -> io::Result<String>
{
	match path
	{
		Some(path) => fs::read_to_string(path),
		None =>
		{
			let mut buf = String::new();
			io::stdin().read_to_string(&mut buf)?;
			Ok(buf)
		},
	}
}

fn main() -> ExitCode
{
	env_logger::init();

	let mut args = env::args().skip(1).peekable();
	let mut source_path = None;
	let mut dump_state = false;

	for arg in &mut args
	{
		match arg.as_str()
		{
			"--dump" => dump_state = true,
			_ => source_path = Some(arg),
		}
	}

	let source = match read_source(source_path.as_deref())
	{
		Ok(source) => source,
		Err(err) =>
		{
			eprintln!("asml: failed to read source: {:}", err);
			return ExitCode::from(1);
		},
	};

	let stdout = io::stdout();
	let mut out = stdout.lock();

	let program = match asml::compile(&source)
	{
		Ok(program) => program,
		Err(err) =>
		{
			eprintln!("asml: {:}", err);
			return ExitCode::from(err.exit_code() as u8);
		},
	};

	let mut machine = Machine::new(Memory::new(memory::DEFAULT_SIZE));
	let result = interpreter::run_to_completion(&program, &mut machine, &mut out);
	let _ = out.flush();

	if dump_state
	{
		let stderr = io::stderr();
		let _ = machine.dump_state(result.is_err(), &mut stderr.lock());
	}

	match result
	{
		Ok(()) => ExitCode::SUCCESS,
		Err(err) =>
		{
			eprintln!("asml: {:}", err);
			ExitCode::from(2)
		},
	}
}
