use gauge::{Config, Value, compile, run};

/// Compiles `input` against `env` and runs it, returning the result's
/// display form or the error's.
pub fn evaluate(input: &str, env: Option<Value>, config: Config) -> Result<String, String> {
    let config = match &env {
        Some(env) => config.env(env.clone()),
        None => config,
    };
    let program = compile(input, config).map_err(|e| e.to_string())?;
    run(&program, &env.unwrap_or_default())
        .map(|value| value.to_string())
        .map_err(|e| e.to_string())
}

pub fn check(actual: Result<String, String>, expected: Result<&str, &str>) {
    let expected = expected.map(str::to_string).map_err(str::to_string);
    pretty_assertions::assert_eq!(actual, expected);
}

/// Declares an end-to-end test: compile `input`, run it and compare the
/// displayed result (or error) with `result`.
macro_rules! test_case {
    (
        $name:ident,
        input: $input:expr,
        $(env: $env:expr,)?
        $(config: $config:expr,)?
        result: $result:expr $(,)?
    ) => {
        #[test]
        fn $name() {
            #[allow(unused_mut, unused_assignments)]
            let mut env: Option<gauge::Value> = None;
            $(env = Some($env);)?
            #[allow(unused_mut, unused_assignments)]
            let mut config = gauge::Config::default();
            $(config = $config;)?
            $crate::cases::check($crate::cases::evaluate($input, env, config), $result);
        }
    };
}
