use std::sync::Arc;

use indoc::indoc;
use pretty_assertions::assert_eq;

use super::check;
use crate::api::Config;
use crate::ast::{Dispatch, Node, NodeKind};
use crate::diagnostics::Span;
use crate::errors::Error;
use crate::parser::parse;
use crate::types::{FloatKind, FuncType, IntKind, Nature, StructType, Type};

fn mock_env() -> Arc<StructType> {
    let bar = Arc::new(StructType::new("mock.Bar").field("Baz", Type::String));
    let foo = Arc::new(
        StructType::new("mock.Foo")
            .field("Bar", Type::Struct(bar.clone()))
            .method("Method", FuncType::new(vec![], Type::Struct(bar))),
    );
    let embed = Arc::new(
        StructType::new("mock.Embed")
            .field("EmbedString", Type::String)
            .method("EmbedMethod", FuncType::new(vec![Type::INT], Type::String)),
    );
    let foo_ty = Type::Struct(foo);
    let no_result = FuncType {
        params: vec![],
        variadic: None,
        results: vec![],
    };
    let too_many_results = FuncType {
        params: vec![],
        variadic: None,
        results: vec![Type::INT, Type::INT, Type::Error],
    };
    Arc::new(
        StructType::new("mock.Env")
            .embed("Embed", embed)
            .field("Any", Type::Any)
            .field("Int", Type::INT)
            .field("Int32", Type::Int(IntKind::Int32))
            .field("Int64", Type::Int(IntKind::Int64))
            .field("Uint32", Type::Int(IntKind::Uint32))
            .field("Float", Type::FLOAT)
            .field("Bool", Type::Bool)
            .field("String", Type::String)
            .field("Time", Type::Time)
            .field("Duration", Type::Duration)
            .field("IntPtr", Type::INT)
            .field("IntPtrPtr", Type::INT)
            .field("BoolPtr", Type::Bool)
            .field("FloatPtr", Type::FLOAT)
            .field("StringPtr", Type::String)
            .field("Foo", foo_ty.clone())
            .field("ArrayOfFoo", Type::array(foo_ty.clone()))
            .field("ArrayOfAny", Type::array(Type::Any))
            .field("ArrayOfInt", Type::array(Type::INT))
            .field("MapOfFoo", Type::map(foo_ty.clone()))
            .field("MapOfAny", Type::map(Type::Any))
            .method("Func", FuncType::new(vec![], Type::INT))
            .method(
                "FuncParam",
                FuncType::new(vec![Type::Bool, Type::INT, Type::String], Type::Bool),
            )
            .method("FuncParamAny", FuncType::new(vec![Type::Any], Type::Bool))
            .method("Fast", FuncType::fast())
            .method("FuncFoo", FuncType::new(vec![foo_ty], Type::INT))
            .method(
                "Variadic",
                FuncType::variadic(vec![Type::INT], Type::INT, Type::Bool),
            )
            .method("FuncTyped", FuncType::new(vec![Type::String], Type::INT))
            .method("NilFn", no_result)
            .method("BoolFn", FuncType::new(vec![], Type::Bool))
            .method("FuncTooManyReturns", too_many_results),
    )
}

fn mock_config() -> Config {
    Config::default().nature(Nature::record(mock_env()))
}

fn checked(source: &str, config: &Config) -> Result<(Node, Type), Error> {
    let mut node = parse(source)?;
    let ty = check(&mut node, config).map_err(|e| e.bind(source))?;
    Ok((node, ty))
}

fn type_of(source: &str) -> Type {
    match checked(source, &mock_config()) {
        Ok((_, ty)) => ty,
        Err(e) => panic!("{}: {}", source, e),
    }
}

const SUCCESS_TESTS: &[&str] = &[
    "nil == nil",
    "nil == IntPtr",
    "nil in ArrayOfFoo",
    "!Bool",
    "!BoolPtr == Bool",
    "'a' == 'b' + 'c'",
    "'foo' contains 'bar'",
    "'foo' endsWith 'bar'",
    "'foo' startsWith 'bar'",
    "(1 == 1) || (String matches Any)",
    "Int % Int > 1",
    "Int + Int + Int > 0",
    "Int == Any",
    "Int in Int..Int",
    "IntPtrPtr + 1 > 0",
    "1 + 2 + Int64 > 0",
    "Int64 % 1 > 0",
    "IntPtr == Int",
    "FloatPtr == 1 + 2.0",
    "1 + 2 + Float + 3 + 4 < 0",
    "1 + Int + Float == 0.5",
    "-1 + +1 == 0",
    "1 / 2 == 0",
    "2**3 + 1 != 0",
    "2^3 + 1 != 0",
    "Float == 1",
    "Float < 1.0",
    "Float <= 1.0",
    "Float > 1.0",
    "Float >= 1.0",
    r#""a" < "b""#,
    "String + (true ? String : String) == ''",
    "(Any ? nil : '') == ''",
    "(Any ? 0 : nil) == 0",
    "(Any ? nil : nil) == nil",
    "!(Any ? Foo : Foo.Bar).Anything",
    "String in ArrayOfFoo",
    "String in Foo",
    "String in MapOfFoo",
    "String matches 'ok'",
    "String matches Any",
    "String not matches Any",
    "String not in ArrayOfFoo",
    "StringPtr == nil",
    "[1, 2, 3] == []",
    "len([]) > 0",
    "Any matches Any",
    "!Any.Things.Contains.Any",
    "!ArrayOfAny[0].next.goes['any thing']",
    "ArrayOfFoo[0].Bar.Baz == ''",
    "ArrayOfFoo[0:10][0].Bar.Baz == ''",
    "!ArrayOfAny[Any]",
    "Bool && Any",
    "FuncParam(true, 1, 'str')",
    "FuncParamAny(nil)",
    "!Fast(Any, String)",
    "Foo.Method().Baz == ''",
    "Foo.Bar == MapOfAny.id.Bar",
    "Foo.Bar.Baz == ''",
    "MapOfFoo['any'].Bar.Baz == ''",
    "Func() == 0",
    "FuncFoo(Foo) > 1",
    "Any() > 0",
    "Embed.EmbedString == ''",
    "EmbedString == ''",
    "EmbedMethod(0) == ''",
    "Embed.EmbedMethod(0) == ''",
    "{id: Foo.Bar.Baz, 'str': String} == {}",
    "Variadic(0, 1, 2) || Variadic(0)",
    "count(1..30, {# % 3 == 0}) > 0",
    "map(1..3, {#}) == [1,2,3]",
    "map(filter(ArrayOfFoo, {.Bar.Baz != ''}), {.Bar}) == []",
    "filter(Any, {.AnyMethod()})[0] == ''",
    "sum(ArrayOfInt) > 0",
    "sum(ArrayOfFoo, {len(.Bar.Baz)}) > 0",
    "$env.Int == Int",
    "Time == Time",
    "Any == Time",
    "Any != Time",
    "Any > Time",
    "Any >= Time",
    "Any < Time",
    "Any <= Time",
    "Any - Time > Duration",
    "Any == Any",
    "Any != Any",
    "Any > Any",
    "Any >= Any",
    "Any < Any",
    "Any <= Any",
    "Any - Any < Duration",
    "Time == Any",
    "Time != Any",
    "Time > Any",
    "Time >= Any",
    "Time < Any",
    "Time <= Any",
    "Time - Any == Duration",
    "Time + Duration == Time",
    "Duration + Time == Time",
    "Duration + Any == Time",
    "Any + Duration == Time",
    "Time - Duration < Time",
    "Time.Sub(Time).Hours() > 1.5",
    "Any.A?.B == nil",
];

#[test]
fn test_check() {
    for source in SUCCESS_TESTS {
        let config = mock_config().as_bool();
        if let Err(e) = checked(source, &config) {
            panic!("{}: {}", source, e);
        }
    }
}

const ERROR_TESTS: &str = indoc! {r#"
    Foo.Bar.Not
    type mock.Bar has no field Not (1:9)
     | Foo.Bar.Not
     | ........^

    Noo
    unknown name Noo (1:1)
     | Noo
     | ^

    Foo()
    mock.Foo is not callable (1:1)
     | Foo()
     | ^

    Foo['bar']
    type mock.Foo has no field bar (1:4)
     | Foo['bar']
     | ...^

    Foo.Method(Not)
    too many arguments to call Method (1:5)
     | Foo.Method(Not)
     | ....^

    Foo.Bar()
    mock.Bar is not callable (1:5)
     | Foo.Bar()
     | ....^

    Foo.Bar.Not()
    type mock.Bar has no method Not (1:9)
     | Foo.Bar.Not()
     | ........^

    ArrayOfFoo[0].Not
    type mock.Foo has no field Not (1:15)
     | ArrayOfFoo[0].Not
     | ..............^

    ArrayOfFoo[Not]
    unknown name Not (1:12)
     | ArrayOfFoo[Not]
     | ...........^

    Not[0]
    unknown name Not (1:1)
     | Not[0]
     | ^

    ArrayOfFoo.Not
    array elements can only be selected using an integer (got string) (1:12)
     | ArrayOfFoo.Not
     | ...........^

    FuncParam(Not)
    not enough arguments to call FuncParam (1:1)
     | FuncParam(Not)
     | ^

    MapOfFoo['str'].Not
    type mock.Foo has no field Not (1:17)
     | MapOfFoo['str'].Not
     | ................^

    Bool && IntPtr
    invalid operation: && (mismatched types bool and int) (1:6)
     | Bool && IntPtr
     | .....^

    No ? Any.Bool : Any.Not
    unknown name No (1:1)
     | No ? Any.Bool : Any.Not
     | ^

    Any.Cond ? No : Any.Not
    unknown name No (1:12)
     | Any.Cond ? No : Any.Not
     | ...........^

    Any.Cond ? Any.Bool : No
    unknown name No (1:23)
     | Any.Cond ? Any.Bool : No
     | ......................^

    MapOfAny ? Any : Any
    non-bool expression (type map[string]any) used as condition (1:1)
     | MapOfAny ? Any : Any
     | ^

    String matches Int
    invalid operation: matches (mismatched types string and int) (1:8)
     | String matches Int
     | .......^

    Int contains String
    invalid operation: contains (mismatched types int and string) (1:5)
     | Int contains String
     | ....^

    !Not
    unknown name Not (1:2)
     | !Not
     | .^

    {id: Not}
    unknown name Not (1:6)
     | {id: Not}
     | .....^

    (nil).Foo
    type nil has no field Foo (1:7)
     | (nil).Foo
     | ......^

    (nil)['Foo']
    type nil has no field Foo (1:6)
     | (nil)['Foo']
     | .....^

    1 and false
    invalid operation: and (mismatched types int and bool) (1:3)
     | 1 and false
     | ..^

    not IntPtr
    invalid operation: not (mismatched type int) (1:1)
     | not IntPtr
     | ^

    Int < Bool
    invalid operation: < (mismatched types int and bool) (1:5)
     | Int < Bool
     | ....^

    Int + Bool
    invalid operation: + (mismatched types int and bool) (1:5)
     | Int + Bool
     | ....^

    Int % Bool
    invalid operation: % (mismatched types int and bool) (1:5)
     | Int % Bool
     | ....^

    Int ** Bool
    invalid operation: ** (mismatched types int and bool) (1:5)
     | Int ** Bool
     | ....^

    Int .. Bool
    invalid operation: .. (mismatched types int and bool) (1:5)
     | Int .. Bool
     | ....^

    Any > Foo
    invalid operation: > (mismatched types any and mock.Foo) (1:5)
     | Any > Foo
     | ....^

    NilFn() and BoolFn()
    func NilFn doesn't return value (1:1)
     | NilFn() and BoolFn()
     | ^

    'str' in String
    invalid operation: in (mismatched types string and string) (1:7)
     | 'str' in String
     | ......^

    1 in Foo
    invalid operation: in (mismatched types int and mock.Foo) (1:3)
     | 1 in Foo
     | ..^

    all(ArrayOfFoo, {#.Method() < 0})
    invalid operation: < (mismatched types mock.Bar and int) (1:29)
     | all(ArrayOfFoo, {#.Method() < 0})
     | ............................^

    map(Any, {0})[0] + "str"
    invalid operation: + (mismatched types int and string) (1:18)
     | map(Any, {0})[0] + "str"
     | .................^

    Variadic()
    not enough arguments to call Variadic (1:1)
     | Variadic()
     | ^

    Variadic(0, '')
    cannot use string as argument (type int) to call Variadic  (1:13)
     | Variadic(0, '')
     | ............^

    count(1, {#})
    builtin count takes only array (got int) (1:7)
     | count(1, {#})
     | ......^

    count(ArrayOfInt, {#})
    closure should return boolean (got int) (1:19)
     | count(ArrayOfInt, {#})
     | ..................^

    filter(ArrayOfFoo, {.Bar.Baz})
    closure should return boolean (got string) (1:20)
     | filter(ArrayOfFoo, {.Bar.Baz})
     | ...................^

    map(filter(ArrayOfFoo, {true}), {.Not})
    type mock.Foo has no field Not (1:35)
     | map(filter(ArrayOfFoo, {true}), {.Not})
     | ..................................^

    ArrayOfFoo[Foo]
    array elements can only be selected using an integer (got mock.Foo) (1:12)
     | ArrayOfFoo[Foo]
     | ...........^

    ArrayOfFoo[1:Bool]
    non-integer slice index bool (1:14)
     | ArrayOfFoo[1:Bool]
     | .............^

    Bool[:]
    cannot slice bool (1:5)
     | Bool[:]
     | ....^

    FuncTooManyReturns()
    func FuncTooManyReturns returns more than two values (1:1)
     | FuncTooManyReturns()
     | ^

    len(42)
    invalid argument for len (type int) (1:1)
     | len(42)
     | ^

    MapOfAny[0]
    cannot use int to get an element from map[string]any (1:10)
     | MapOfAny[0]
     | .........^

    Time + Time
    invalid operation: + (mismatched types time and time) (1:6)
     | Time + Time
     | .....^
"#};

#[test]
fn test_check_errors() {
    for case in ERROR_TESTS.trim_matches('\n').split("\n\n") {
        let (source, expected) = case.split_once('\n').unwrap();
        match checked(source, &mock_config()) {
            Ok((_, ty)) => panic!("expected an error for {}, got type {}", source, ty),
            Err(e) => assert_eq!(e.to_string(), expected, "{}", source),
        }
    }
}

#[test]
fn test_numeric_promotion() {
    assert_eq!(type_of("Int + Float"), Type::Float(FloatKind::Float64));
    assert_eq!(type_of("Uint32 + Int32"), Type::INT);
    assert_eq!(type_of("Int32 * Int32"), Type::Int(IntKind::Int32));
    assert_eq!(type_of("2 ** 8"), Type::FLOAT);
}

#[test]
fn test_all_number_kinds_add() {
    let kinds = [
        Type::Int(IntKind::Uint),
        Type::Int(IntKind::Uint8),
        Type::Int(IntKind::Uint16),
        Type::Int(IntKind::Uint32),
        Type::Int(IntKind::Uint64),
        Type::Int(IntKind::Int),
        Type::Int(IntKind::Int8),
        Type::Int(IntKind::Int16),
        Type::Int(IntKind::Int32),
        Type::Int(IntKind::Int64),
        Type::Float(FloatKind::Float32),
        Type::Float(FloatKind::Float64),
    ];
    let nature = Nature::map(
        kinds
            .iter()
            .enumerate()
            .map(|(i, ty)| (format!("v{}", i), ty.clone())),
    );
    let config = Config::default().nature(nature);
    for a in 0..kinds.len() {
        for b in 0..kinds.len() {
            let source = format!("v{} + v{}", a, b);
            if let Err(e) = checked(&source, &config) {
                panic!("{}: {}", source, e);
            }
        }
    }
}

#[test]
fn test_expect_kind() {
    let err = checked("1+2", &Config::default().as_bool()).unwrap_err();
    assert_eq!(err.to_string(), "expected bool, but got int");
    let err = checked("true", &Config::default().as_int64()).unwrap_err();
    assert_eq!(err.to_string(), "expected int64, but got bool");
    assert!(checked("Float", &mock_config().as_int64()).is_ok());
}

#[test]
fn test_ambiguous_identifier() {
    let a = Arc::new(StructType::new("A").field("Ambiguous", Type::Bool));
    let b = Arc::new(StructType::new("B").field("Ambiguous", Type::INT));
    let env = Arc::new(StructType::new("Env").embed("A", a).embed("B", b));
    let config = Config::default().nature(Nature::record(env));
    let err = checked("Ambiguous == 1", &config).unwrap_err();
    assert!(err.to_string().contains("ambiguous identifier Ambiguous"), "{err}");
    assert!(checked("A.Ambiguous == true", &config).is_ok());
}

#[test]
fn test_no_nature() {
    let (_, ty) = checked("any", &Config::default()).unwrap();
    assert_eq!(ty, Type::Any);
}

#[test]
fn test_allow_undefined_variables() {
    let env = Arc::new(StructType::new("Env").field("A", Type::INT));
    let config = Config::default()
        .nature(Nature::record(env))
        .allow_undefined_variables();
    assert!(checked("any + fn()", &config).is_ok());
    assert!(checked("Not?.A.B == nil", &config).is_ok());

    let nature = Nature::map(Vec::<(&str, Type)>::new()).with_default(Type::Bool);
    let config = Config::default()
        .nature(nature)
        .allow_undefined_variables()
        .as_bool();
    let (_, ty) = checked("any", &config).unwrap();
    assert_eq!(ty, Type::Bool);
}

#[test]
fn test_operator_overload() {
    let date = Type::Struct(Arc::new(StructType::new("Date")));
    let nature = Nature::map([
        ("a", date.clone()),
        ("b", date.clone()),
        (
            "add",
            Type::Func(Arc::new(FuncType::new(vec![date.clone(), date], Type::Bool))),
        ),
    ]);
    let config = Config::default().nature(nature.clone()).as_bool();
    let err = checked("a + b", &config).unwrap_err();
    assert!(
        err.to_string()
            .contains("invalid operation: + (mismatched types Date and Date)"),
        "{err}"
    );

    let config = Config::default()
        .nature(nature)
        .operator("+", ["sub", "add"])
        .as_bool();
    let (node, ty) = checked("a + b", &config).unwrap();
    assert_eq!(ty, Type::Bool);
    match &node.kind {
        NodeKind::Call { callee, arguments, .. } => {
            assert_eq!(callee.kind, NodeKind::Identifier("add".into()));
            assert_eq!(arguments.len(), 2);
        }
        other => panic!("expected a call, got {:?}", other),
    }
}

#[test]
fn test_pointer_outside_closure() {
    let mut node = Node::new(NodeKind::Pointer, Span::new(0, 1));
    let err = check(&mut node, &Config::default()).unwrap_err();
    assert!(err.to_string().contains("cannot use pointer accessor outside closure"));
}

#[test]
fn test_constant_node() {
    let mut node = Node::new(
        NodeKind::Constant(crate::values::Value::from(vec![1, 2])),
        Span::default(),
    );
    let ty = check(&mut node, &Config::default()).unwrap();
    assert_eq!(ty, Type::array(Type::INT));
}

fn dispatch_of(source: &str) -> Dispatch {
    let (node, _) = checked(source, &mock_config()).unwrap();
    match node.kind {
        NodeKind::Call { dispatch, .. } => dispatch,
        other => panic!("expected a call, got {:?}", other),
    }
}

#[test]
fn test_dispatch_stamp() {
    assert_eq!(dispatch_of("Fast(1, 'a')"), Dispatch::Fast);
    assert_eq!(dispatch_of("FuncTyped('a')"), Dispatch::Typed(9));
    assert_eq!(dispatch_of("FuncParam(true, 1, 'a')"), Dispatch::Generic);
    assert_eq!(dispatch_of("Any.Method()"), Dispatch::Generic);
}

#[test]
fn test_integer_literals_passed_as_float() {
    let nature = Nature::map([(
        "cnv",
        Type::Func(Arc::new(FuncType::new(vec![Type::FLOAT], Type::Any))),
    )]);
    let config = Config::default().nature(nature);
    let (node, _) = checked("cnv(1/1)", &config).unwrap();
    let NodeKind::Call { arguments, .. } = &node.kind else {
        panic!("expected a call");
    };
    assert_eq!(arguments[0].ty(), &Type::FLOAT);
    let NodeKind::Binary { left, right, .. } = &arguments[0].kind else {
        panic!("expected a division");
    };
    assert_eq!(left.ty(), &Type::FLOAT);
    assert_eq!(right.ty(), &Type::FLOAT);
}
