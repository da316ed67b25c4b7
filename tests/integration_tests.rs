// Integration tests exercising the full pipeline (lex -> parse -> interpret) end to end,
// mirroring the scenarios enumerated in SPEC_FULL.md's testable-properties section.
use asml::{memory, run_source};

fn run(source: &str) -> String
{
	let mut out = Vec::new();
	run_source(source, memory::DEFAULT_SIZE, &mut out).expect("program should run to completion");
	String::from_utf8(out).expect("output should be valid utf-8")
}

#[test]
fn scenario_add_and_print_decimal()
{
	let source = "mov x1 5\nmov x2 7\nadd x3 x1 x2\nprint x3 d\n";
	assert_eq!(run(source), "12\n");
}

#[test]
fn scenario_print_hex()
{
	let source = "mov x1 0xff\nprint x1 x\n";
	assert_eq!(run(source), "0xff\n");
}

#[test]
fn scenario_branch_on_equal()
{
	let source = "mov x1 5\nmov x2 5\ncmp x1 x2\nbeq eq\nmov x3 0\nb end\neq:\nmov x3 1\nend:\nprint x3 d\n";
	assert_eq!(run(source), "1\n");
}

#[test]
fn scenario_put_and_print_string()
{
	let source = "mov x1 0\nput x1 \"hi\"\nprint x1 s\n";
	assert_eq!(run(source), "hi\n");
}

#[test]
fn scenario_call_and_ret_preserves_x0_as_result()
{
	let source = "mov x1 3\ncall dbl\nprint x0 d\nb end\ndbl:\nadd x0 x1 x1\nret\nend:\n";
	assert_eq!(run(source), "6\n");
}

#[test]
fn scenario_shift_and_print_binary()
{
	let source = "mov x1 5\nlsl x2 x1 2\nprint x2 b\n";
	assert_eq!(run(source), "0b10100\n");
}

#[test]
fn empty_program_halts_cleanly()
{
	assert_eq!(run(""), "");
}

#[test]
fn ret_with_empty_stack_halts_without_error()
{
	let source = "mov x1 1\nret\nprint x1 d\n";
	let mut out = Vec::new();
	run_source(source, memory::DEFAULT_SIZE, &mut out).expect("empty-stack ret halts cleanly");
	assert_eq!(out, b"");
}

#[test]
fn store_then_load_round_trips_through_memory()
{
	let source = "mov x1 0x1234\nmov x2 100\nstore x1 x2 8\nload x3 8 x2\nprint x3 x\n";
	assert_eq!(run(source), "0x1234\n");
}

#[test]
fn unknown_branch_target_is_a_runtime_error()
{
	let mut out = Vec::new();
	let err = run_source("b nowhere\n", memory::DEFAULT_SIZE, &mut out).unwrap_err();
	assert_eq!(err.exit_code(), 2);
}

#[test]
fn mov_rejects_register_second_operand()
{
	let mut out = Vec::new();
	let err = run_source("mov x1 x2\n", memory::DEFAULT_SIZE, &mut out).unwrap_err();
	assert_eq!(err.exit_code(), 1);
}

#[test]
fn register_index_out_of_range_is_a_parse_error()
{
	let mut out = Vec::new();
	let err = run_source("add x32 x1 x2\n", memory::DEFAULT_SIZE, &mut out).unwrap_err();
	assert_eq!(err.exit_code(), 1);
}

#[test]
fn comparison_sets_exactly_one_flag()
{
	use asml::interpreter::{self, ComparisonFlags, Machine};
	use asml::Memory;

	let program = asml::compile("mov x1 5\nmov x2 7\ncmp x1 x2\n").unwrap();
	let mut machine = Machine::new(Memory::new(memory::DEFAULT_SIZE));
	let mut out = Vec::new();
	interpreter::run_to_completion(&program, &mut machine, &mut out).unwrap();

	let set_flags = [ComparisonFlags::GREATER, ComparisonFlags::EQUAL, ComparisonFlags::LESS]
		.iter()
		.filter(|flag| machine.flags().contains(**flag))
		.count();
	assert_eq!(set_flags, 1);
}

#[test]
fn duplicate_labels_resolve_to_the_first_declaration()
{
	let source = "b first\nfirst:\nmov x1 1\nb end\nfirst:\nmov x1 2\nend:\nprint x1 d\n";
	assert_eq!(run(source), "1\n");
}
