#[macro_use]
mod cases;

use gauge::{Config, Error, FuncType, Function, HostError, Type, Value, compile, eval, run};
use indoc::indoc;
use pretty_assertions::assert_eq;

test_case!(
    unexpected_token,
    input: "foo.bar(a b)",
    result: Err(indoc! {r#"
        unexpected token Identifier("b") (1:11)
         | foo.bar(a b)
         | ..........^"#}),
);

test_case!(
    dangling_not,
    input: "a not b",
    result: Err(indoc! {r#"
        unexpected token Identifier("b") (1:7)
         | a not b
         | ......^"#}),
);

test_case!(
    mismatched_operands,
    input: r#"1 + "hello""#,
    result: Err(indoc! {r#"
        invalid operation: + (mismatched types int and string) (1:3)
         | 1 + "hello"
         | ..^"#}),
);

test_case!(
    bad_len_argument,
    input: "len(1)",
    result: Err(indoc! {"
        invalid argument for len (type int) (1:1)
         | len(1)
         | ^"}),
);

test_case!(
    error_on_second_line,
    input: "1 +\n  nope",
    env: Value::map([("x", Value::from(1))]),
    result: Err("unknown name nope (2:3)\n |   nope\n | ..^"),
);

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("quota exhausted")]
struct QuotaError;

#[test]
fn host_error_is_kept_as_cause() {
    use std::error::Error as _;

    let charge = Function::new("charge", FuncType::new(vec![Type::INT], Type::INT), |_| {
        Err(HostError::new(QuotaError))
    });
    let env = Value::map([("charge", Value::from(charge))]);
    let program = compile("charge(5)", Config::default().env(env.clone())).unwrap();
    let err = run(&program, &env).unwrap_err();

    assert_eq!(err.to_string(), "quota exhausted (1:1)\n | charge(5)\n | ^");
    let Error::Runtime { cause: Some(cause), .. } = &err else {
        panic!("expected a runtime error with a cause, got {:?}", err);
    };
    assert_eq!(cause.downcast_ref::<QuotaError>(), Some(&QuotaError));
    assert!(err.source().is_some());
}

#[test]
fn file_error_serializes_with_location() {
    let err = compile(r#"1 + "hello""#, Config::default()).unwrap_err();
    let json = serde_json::to_value(err.file_error().unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "Line": 1,
            "Column": 2,
            "Message": "invalid operation: + (mismatched types int and string)",
            "Snippet": "\n | 1 + \"hello\"\n | ..^",
        })
    );
}

#[test]
fn expect_mismatch_has_no_location() {
    let err = compile(r#""yes""#, Config::default().as_bool()).unwrap_err();
    assert!(matches!(err, Error::Expect(_)));
    assert!(err.file_error().is_none());
    assert_eq!(err.to_string(), "expected bool, but got string");
}

#[test]
fn unknown_overload_operator() {
    let err = compile("1", Config::default().operator("**?", ["pow"])).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(err.to_string(), "unknown operator **? for overloading");
}

#[test]
fn rendered_report_names_the_stage() {
    let source = "[1, 2][7]";
    let err = eval(source, &Value::Nil).unwrap_err();
    let report = gauge::render_error_to_string_no_color(&err, source);
    assert!(report.contains("index out of range: 7 (array length is 2)"));
    assert!(report.contains("runtime error"));
}
