//! Tests for the bytecode compiler.

use indoc::indoc;
use pretty_assertions::assert_eq;

use super::compile;
use crate::api::Config;
use crate::checker::check;
use crate::errors::Error;
use crate::parser::parse;
use crate::values::{Function, Value};
use crate::vm::{self, Instruction, Program};

/// Parses, checks and compiles `source` without optimizing, then runs it.
fn compile_and_run_with(source: &str, config: Config) -> (Program, Result<Value, Error>) {
    let env = config.env.clone().unwrap_or_default();
    let expect = config.expect;
    let limits = config.limits;
    let mut tree = parse(source).unwrap();
    check(&mut tree, &config).unwrap();
    let program = compile(&tree, source, expect, limits).unwrap();
    let result = vm::run(&program, &env);
    (program, result)
}

fn compile_and_run(source: &str) -> (Program, Result<Value, Error>) {
    compile_and_run_with(source, Config::default())
}

fn eval(source: &str) -> Value {
    compile_and_run(source).1.unwrap()
}

fn eval_in(source: &str, env: Value) -> Value {
    compile_and_run_with(source, Config::default().env(env)).1.unwrap()
}

fn ints(values: &[i64]) -> Value {
    Value::array(values.iter().copied().map(Value::Int))
}

#[test]
fn test_compile_simple_integer() {
    let (program, result) = compile_and_run("42");
    assert_eq!(
        program.instructions(),
        &[Instruction::ConstInt(42), Instruction::Return]
    );
    assert_eq!(result.unwrap(), Value::Int(42));
}

#[test]
fn test_compile_addition() {
    let (program, result) = compile_and_run("2 + 3");
    assert_eq!(
        program.instructions(),
        &[
            Instruction::ConstInt(2),
            Instruction::ConstInt(3),
            Instruction::IntBinOp(b'+'),
            Instruction::Return,
        ]
    );
    assert_eq!(result.unwrap(), Value::Int(5));
}

#[test]
fn test_compile_float_arithmetic() {
    let (program, result) = compile_and_run("1.5 * 2.0");
    assert_eq!(program.instructions()[2], Instruction::FloatBinOp(b'*'));
    assert_eq!(result.unwrap(), Value::Float(3.0));
}

#[test]
fn test_mixed_operands_use_dynamic_instruction() {
    let (program, result) = compile_and_run("1 + 2.5");
    assert_eq!(program.instructions()[2], Instruction::BinOp(b'+'));
    assert_eq!(result.unwrap(), Value::Float(3.5));
}

#[test]
fn test_large_integers_use_the_pool() {
    let (program, result) = compile_and_run("1000 + 200");
    assert_eq!(program.instructions()[0], Instruction::ConstLoad(0));
    assert_eq!(program.instructions()[1], Instruction::ConstUInt(200));
    assert_eq!(result.unwrap(), Value::Int(1200));
}

#[test]
fn test_constants_are_deduplicated() {
    let (program, result) = compile_and_run(r#""ab" + "ab""#);
    assert_eq!(program.constants(), &[Value::from("ab")]);
    assert_eq!(result.unwrap(), Value::from("abab"));
}

#[test]
fn test_integer_division_and_power() {
    assert_eq!(eval("7 / 2"), Value::Int(3));
    assert_eq!(eval("7 % 3"), Value::Int(1));
    assert_eq!(eval("2 ** 10"), Value::Float(1024.0));
    assert_eq!(eval("-(2-5)**3-2/(+4-3)+-2"), Value::Float(23.0));
}

#[test]
fn test_integer_overflow_wraps() {
    assert_eq!(eval("9223372036854775807 + 1"), Value::Int(i64::MIN));
}

#[test]
fn test_divide_by_zero_location() {
    let (_, result) = compile_and_run("1 / 0");
    let err = result.unwrap_err();
    assert_eq!(err.to_string().lines().next(), Some("runtime error: integer divide by zero (1:3)"));
}

#[test]
fn test_comparisons() {
    assert_eq!(eval("1 < 2"), Value::Bool(true));
    assert_eq!(eval("2.5 >= 2.5"), Value::Bool(true));
    assert_eq!(eval(r#""a" > "b""#), Value::Bool(false));
    assert_eq!(eval("1 == 1.0"), Value::Bool(true));
    assert_eq!(eval("[1, 2] != [1, 2]"), Value::Bool(false));
}

#[test]
fn test_short_circuit_skips_right_side() {
    let env = Value::map([(
        "boom",
        Value::Function(Function::fast("boom", |_| panic!("evaluated"))),
    )]);
    assert_eq!(eval_in("false && boom()", env.clone()), Value::Bool(false));
    assert_eq!(eval_in("true || boom()", env.clone()), Value::Bool(true));
    assert_eq!(eval_in("1 ?? boom()", env), Value::Int(1));
}

#[test]
fn test_nil_coalescing() {
    let env = Value::map([("missing", Value::Nil)]);
    assert_eq!(eval_in(r#"missing ?? "default""#, env), Value::from("default"));
}

#[test]
fn test_conditional() {
    assert_eq!(eval(r#"1 > 2 ? "a" : "b""#), Value::from("b"));
    assert_eq!(eval(r#"1 < 2 ? "a" : "b""#), Value::from("a"));
}

#[test]
fn test_disassembly_labels_jump_targets() {
    let (program, _) = compile_and_run("true ? 1 : 2");
    assert_eq!(
        format!("{:?}", program),
        indoc! {"
            Program {
              constants: []
              instructions:
                   0        ConstBool(1)
                   1        WideArg(0x00)
                   2        PopJumpIfFalse(3) (to L0)
                   3        ConstInt(1)
                   4        WideArg(0x00)
                   5        JumpForward(1) (to L1)
                   6  L0:  ConstInt(2)
                   7  L1:  Return
            }"}
    );
}

#[test]
fn test_optional_chain_short_circuits() {
    let config = Config::default().allow_undefined_variables();
    let (_, result) = compile_and_run_with("foo?.bar.baz", config);
    assert_eq!(result.unwrap(), Value::Nil);

    let user = Value::map([("name", Value::from("Ann"))]);
    let env = Value::map([("user", user)]);
    assert_eq!(eval_in("user?.name", env), Value::from("Ann"));
}

#[test]
fn test_env_builtin() {
    let env = Value::map([("answer", Value::Int(42))]);
    assert_eq!(eval_in("$env.answer", env.clone()), Value::Int(42));
    assert_eq!(eval_in(r#"$env["answer"] + 1"#, env), Value::Int(43));
}

#[test]
fn test_closure_builtins() {
    assert_eq!(eval("all(1..3, {# > 0})"), Value::Bool(true));
    assert_eq!(eval("all(1..3, {# > 1})"), Value::Bool(false));
    assert_eq!(eval("none([1, 2], {# > 1})"), Value::Bool(false));
    assert_eq!(eval("none([1, 2], {# > 2})"), Value::Bool(true));
    assert_eq!(eval("any([1, 2], {# == 2})"), Value::Bool(true));
    assert_eq!(eval("any([], {# == 2})"), Value::Bool(false));
    assert_eq!(eval("one([1, 2, 3], {# == 2})"), Value::Bool(true));
    assert_eq!(eval("one([2, 2], {# == 2})"), Value::Bool(false));
    assert_eq!(eval("count(1..10, {# % 2 == 0})"), Value::Int(5));
    assert_eq!(eval("filter(1..9, {# > 7})"), ints(&[8, 9]));
    assert_eq!(eval("map(1..3, {# * #})"), ints(&[1, 4, 9]));
}

#[test]
fn test_sum() {
    assert_eq!(eval("sum(1..4)"), Value::Int(10));
    assert_eq!(eval("sum([1.5, 2.5])"), Value::Float(4.0));
    assert_eq!(eval("sum(1..3, {# * 2})"), Value::Int(12));
    assert_eq!(eval("sum([])"), Value::Int(0));
}

#[test]
fn test_nested_closures_see_their_own_element() {
    assert_eq!(
        eval("map(1..2, {map(1..2, {# * 10})})"),
        Value::array([ints(&[10, 20]), ints(&[10, 20])])
    );
}

#[test]
fn test_runtime_error_inside_closure() {
    let (_, result) = compile_and_run("map(1..3, {1 / (# - 3)})");
    let err = result.unwrap_err();
    let file_error = err.file_error().unwrap();
    assert_eq!(file_error.message, "runtime error: integer divide by zero");
    assert_eq!(file_error.column, 13);
}

#[test]
fn test_len_and_collections() {
    assert_eq!(eval(r#"len("héllo")"#), Value::Int(5));
    assert_eq!(eval("len([1, 2, 3])"), Value::Int(3));
    assert_eq!(eval(r#"{"a": 1, "b": 2}.b"#), Value::Int(2));
    assert_eq!(eval("4..0"), ints(&[]));
}

#[test]
fn test_indexing_and_slicing() {
    assert_eq!(eval("[1, 2, 3][-1]"), Value::Int(3));
    assert_eq!(eval(r#""hello"[1:3]"#), Value::from("el"));
    assert_eq!(eval(r#""hello"[-3:]"#), Value::from("llo"));
    assert_eq!(eval(r#""hello"[2:100]"#), Value::from("llo"));
    assert_eq!(eval("[1, 2, 3][:2]"), ints(&[1, 2]));
}

#[test]
fn test_index_out_of_range() {
    let (_, result) = compile_and_run("[1, 2, 3][5]");
    assert_eq!(
        result.unwrap_err().file_error().unwrap().message,
        "runtime error: index out of range: 5 (array length is 3)"
    );
}

#[test]
fn test_string_operators() {
    let (program, result) = compile_and_run(r#""abc" matches "^a""#);
    assert_eq!(program.instructions()[1], Instruction::MatchesConst(0));
    assert_eq!(result.unwrap(), Value::Bool(true));
    assert_eq!(eval(r#""abc" contains "b""#), Value::Bool(true));
    assert_eq!(eval(r#""abc" startsWith "ab""#), Value::Bool(true));
    assert_eq!(eval(r#""abc" endsWith "x""#), Value::Bool(false));
    assert_eq!(eval(r#""b" in ["a", "b"]"#), Value::Bool(true));
    assert_eq!(eval(r#"not ("c" in ["a", "b"])"#), Value::Bool(true));
}

#[test]
fn test_expect_casts_result() {
    let (_, result) = compile_and_run_with("5.5", Config::default().as_int64());
    assert_eq!(result.unwrap(), Value::Int(5));
    let (_, result) = compile_and_run_with("42", Config::default().as_float64());
    assert_eq!(result.unwrap(), Value::Float(42.0));
}

#[test]
fn test_typed_and_fast_calls() {
    use crate::values::TypedFn;

    let env = Value::map([
        ("double", Value::Function(Function::typed("double", TypedFn::IntToInt(|n| n * 2)))),
        (
            "first",
            Value::Function(Function::fast("first", |args| {
                args.first().cloned().unwrap_or_default()
            })),
        ),
    ]);
    let config = Config::default().env(env);
    let (program, result) = compile_and_run_with("double(first(21))", config);
    assert!(program.instructions().contains(&Instruction::CallTyped(3)));
    assert!(program.instructions().contains(&Instruction::CallFast(1)));
    assert_eq!(result.unwrap(), Value::Int(42));
}

#[test]
fn test_memory_budget_stops_nested_ranges() {
    let (_, result) = compile_and_run("map(1..100, {map(1..100, {map(1..100, {#})})})");
    let err = result.unwrap_err();
    assert!(matches!(err, Error::ResourceExceeded(_)));
    assert_eq!(err.file_error().unwrap().message, "memory budget exceeded");
}
