#[macro_use]
mod cases;

use gauge::{Config, Value};
use indoc::indoc;

fn env() -> Value {
    let user = Value::map([
        ("Name", Value::from("Ann")),
        ("Tags", Value::from(vec!["admin", "ops"])),
    ]);
    Value::map([
        ("user", user),
        ("guest", Value::map::<&str>([])),
        ("age", Value::from(41)),
        ("scores", Value::map([("ann", Value::from(7))])),
    ])
}

test_case!(
    field_access,
    input: "user.Name",
    env: env(),
    result: Ok("Ann"),
);

test_case!(
    nested_index,
    input: "user.Tags[1]",
    env: env(),
    result: Ok("ops"),
);

test_case!(
    computed_key,
    input: r#"user["Na" + "me"]"#,
    env: env(),
    result: Ok("Ann"),
);

test_case!(
    missing_key_coalesces,
    input: r#"guest.Name ?? "anonymous""#,
    env: env(),
    result: Ok("anonymous"),
);

test_case!(
    optional_chain_on_value,
    input: "user?.Name",
    env: env(),
    result: Ok("Ann"),
);

test_case!(
    optional_chain_short_circuits,
    input: "foo?.bar.baz",
    config: Config::default().allow_undefined_variables(),
    result: Ok("nil"),
);

test_case!(
    env_variable,
    input: "$env.age + 1",
    env: env(),
    result: Ok("42"),
);

test_case!(
    env_index,
    input: r#"$env["age"] * 2"#,
    env: env(),
    result: Ok("82"),
);

test_case!(
    key_membership,
    input: r#""Name" in user && !("Email" in user)"#,
    env: env(),
    result: Ok("true"),
);

test_case!(
    literal_map_member,
    input: r#"{"a": 1, "b": {"c": 3}}.b.c"#,
    result: Ok("3"),
);

test_case!(
    negative_array_index,
    input: "[1, 2, 3][-1]",
    result: Ok("3"),
);

test_case!(
    unknown_name,
    input: "agee + 1",
    env: env(),
    result: Err(indoc! {"
        unknown name agee (1:1)
         | agee + 1
         | ^"}),
);

test_case!(
    missing_key_in_arithmetic,
    input: "scores.bob * 2",
    env: env(),
    result: Err(indoc! {"
        runtime error: invalid operation: * (mismatched types nil and int) (1:12)
         | scores.bob * 2
         | ...........^"}),
);

test_case!(
    missing_key_in_comparison,
    input: "scores.bob > 5",
    env: env(),
    result: Err(indoc! {"
        runtime error: invalid operation: > (mismatched types nil and int) (1:12)
         | scores.bob > 5
         | ...........^"}),
);

test_case!(
    missing_key_negated,
    input: "-scores.bob",
    env: env(),
    result: Err(indoc! {"
        runtime error: invalid operation: - (mismatched type nil) (1:1)
         | -scores.bob
         | ^"}),
);

test_case!(
    missing_key_with_default,
    input: "(scores.bob ?? 0) + scores.ann",
    env: env(),
    result: Ok("7"),
);
