#[macro_use]
mod cases;

use gauge::Value;
use indoc::indoc;

fn greeting() -> Value {
    Value::map([("greet", Value::from("Hello, ")), ("name", Value::from("world!"))])
}

test_case!(
    concatenation,
    input: "greet + name",
    env: greeting(),
    result: Ok("Hello, world!"),
);

test_case!(
    single_quotes_and_escapes,
    input: r#"'it\'s' + "!""#,
    result: Ok("it's!"),
);

test_case!(
    contains,
    input: r#"name contains "world""#,
    env: greeting(),
    result: Ok("true"),
);

test_case!(
    starts_and_ends_with,
    input: r#"greet startsWith "He" and not (name endsWith "?")"#,
    env: greeting(),
    result: Ok("true"),
);

test_case!(
    matches_literal_pattern,
    input: r#"name matches "^w.+!$""#,
    env: greeting(),
    result: Ok("true"),
);

test_case!(
    matches_dynamic_pattern,
    input: r#"name matches (greet[0:1] + "x")"#,
    env: greeting(),
    result: Ok("false"),
);

test_case!(
    index_from_end,
    input: r#""hello"[-1]"#,
    result: Ok("o"),
);

test_case!(
    slice_bounds_clamp,
    input: r#""hello"[2:100] + "hello"[:2]"#,
    result: Ok("llohe"),
);

test_case!(
    length_counts_characters,
    input: r#"len("héllo")"#,
    result: Ok("5"),
);

test_case!(
    membership_in_string_array,
    input: r#""b" in ["a", "b"] && "c" not in ["a", "b"]"#,
    result: Ok("true"),
);

test_case!(
    string_index_out_of_range,
    input: r#"name[20]"#,
    env: greeting(),
    result: Err(indoc! {"
        runtime error: index out of range: 20 (array length is 6) (1:5)
         | name[20]
         | ....^"}),
);

test_case!(
    comparison,
    input: r#""abc" < "abd""#,
    result: Ok("true"),
);
