use crate::tests::util::{jv, INPUT_BASIC, INPUT_JSON, INPUT_LIST};
use crate::{get, Error, EvalErrorKind};
use yare::parameterized;

const INPUT_TRUTHY: &str = r#"
{
    "vals": [
        {"b": true, "a": 1},
        {"b": false, "a": 2},
        {"b": "x", "a": 3},
        {"a": 4},
        {"b": null, "a": 5},
        {"b": 0, "a": 6},
        {"b": "", "a": 7}
    ]
}
"#;

fn eval_kind(input: &str, query: &str) -> EvalErrorKind {
    match get(&jv(input), query) {
        Err(Error::Eval(e)) => e.kind(),
        other => panic!("expected an evaluation error for `{query}`, got {other:?}"),
    }
}

#[parameterized(
    eq = { r#"friends.#(last=="Murphy").first"#, r#""Dale""# },
    eq_all = { r#"friends.#(last=="Murphy")#.first"#, r#"["Dale", "Jane"]"# },
    eq_alias = { r#"friends.#(last="Murphy")#.first"#, r#"["Dale", "Jane"]"# },
    gt = { "friends.#(age>47)#.last", r#"["Craig"]"# },
    gte = { "friends.#(age>=47)#.last", r#"["Craig", "Murphy"]"# },
    lt = { "friends.#(age<47)#.last", r#"["Murphy"]"# },
    lte = { "friends.#(age<=47)#.last", r#"["Murphy", "Murphy"]"# },
    eq_number = { "friends.#(age==44)#.last", r#"["Murphy"]"# },
    ne_number = { "friends.#(age!=44)#.last", r#"["Craig", "Murphy"]"# },
    match_first = { r#"friends.#(first%"D*").last"#, r#""Murphy""# },
    not_match_first = { r#"friends.#(first!%"D*").last"#, r#""Craig""# },
    not_match_question = { r#"friends.#(first!%"D???").last"#, r#""Craig""# },
    match_non_string_probe = { "friends.#(%0)#", "[]" },
    order_non_comparable = { "friends.#(>40)#", "[]" },
    eq_object_elements = { r#"friends.#(=="Murphy")#"#, "[]" },
    bare_not_match = { r#"children.#(!%"*a*")"#, r#""Alex""# },
    bare_match_all = { r#"children.#(%"*a*")#"#, r#"["Sara", "Jack"]"# },
)]
fn query_operators(query: &str, expected: &str) {
    assert_eq!(get(&jv(INPUT_JSON), query).unwrap(), jv(expected));
}

#[parameterized(
    existence_all = { "#(first)#", r#"[{"first": "Dale"}, {"first": "Jane"}]"# },
    existence_first = { "#(first)", r#"{"first": "Dale"}"# },
    existence_all_single = { "#(last)#", r#"[{"last": "Murphy"}]"# },
    existence_single = { "#(last)", r#"{"last": "Murphy"}"# },
    existence_no_match_first = { "#(missing)", "[]" },
    existence_no_match_all = { "#(missing)#", "[]" },
)]
fn existence_queries(query: &str, expected: &str) {
    assert_eq!(get(&jv(INPUT_LIST), query).unwrap(), jv(expected));
}

#[parameterized(
    eq_cross_number = { "loggy.programmers.#(age=101).firstName", "1002.3" },
    ne_string = { r#"loggy.programmers.#(firstName != "Brett").firstName"#, r#""Jason""# },
    match_email = { r#"loggy.programmers.#(firstName % "Bre*").email"#, r#""aaaa""# },
    not_match_email = { r#"loggy.programmers.#(firstName !% "Bre*").email"#, r#""bbbb""# },
    eq_string = { r#"loggy.programmers.#(firstName == "Brett").email"#, r#""aaaa""# },
)]
fn queries_on_basic_input(query: &str, expected: &str) {
    assert_eq!(get(&jv(INPUT_BASIC), query).unwrap(), jv(expected));
}

#[parameterized(
    truthy = { "vals.#(b~true)#.a", "[1, 3]" },
    falsy_includes_missing = { "vals.#(b~false)#.a", "[2, 4, 5, 6, 7]" },
    null_tag = { "vals.#(b~null)#.a", "[5]" },
    any_tag = { "vals.#(b~*)#.a", "[1, 2, 3, 5, 6, 7]" },
)]
fn truthiness_queries(query: &str, expected: &str) {
    assert_eq!(get(&jv(INPUT_TRUTHY), query).unwrap(), jv(expected));
}

#[parameterized(
    anchored = { r#"#(=~"^ban")#"#, r#"["banana"]"# },
    search_is_unanchored = { r#"#(=~"an")#"#, r#"["banana"]"# },
    alternation = { r#"#(=~"^(apple|cherry)$")#"#, r#"["apple", "cherry"]"# },
    first_match = { r#"#(=~"rr")"#, r#""cherry""# },
)]
fn regex_queries(query: &str, expected: &str) {
    let data = jv(r#"["apple", "banana", "cherry"]"#);
    assert_eq!(get(&data, query).unwrap(), jv(expected));
}

#[test]
fn dotted_key_paths_probe_nested_values() {
    let data = jv(r#"{"items": [{"a": {"b": 1}}, {"a": {"b": 2}}, {"a": {}}]}"#);
    assert_eq!(
        get(&data, "items.#(a.b>1)#").unwrap(),
        jv(r#"[{"a": {"b": 2}}]"#)
    );
    assert_eq!(get(&data, "items.#(a.b)#").unwrap().as_array().unwrap().len(), 2);
}

#[test]
fn query_requires_a_sequence() {
    assert_eq!(eval_kind(INPUT_JSON, "#(first)"), EvalErrorKind::TypeMismatch);
    assert_eq!(eval_kind(INPUT_JSON, "name.#(x)"), EvalErrorKind::TypeMismatch);
}

#[test]
fn first_form_without_match_is_not_found() {
    match get(&jv(INPUT_JSON), r#"friends.#(last=="invalid")"#) {
        Err(Error::Eval(e)) => {
            assert_eq!(e.kind(), EvalErrorKind::NotFound);
            assert_eq!(e.message(), "Query for first element does not match anything.");
            assert_eq!(e.position(), Some(8));
        }
        other => panic!("expected a NotFound error, got {other:?}"),
    }
    assert_eq!(
        eval_kind(INPUT_JSON, r#"friends.#(first%"D?")"#),
        EvalErrorKind::NotFound
    );
}

#[test]
fn all_form_is_total_over_mismatching_elements() {
    // Mixed element types never raise, they are skipped.
    let data = jv(r#"[{"a": 1}, "x", 3, {"a": "y"}]"#);
    assert_eq!(get(&data, "#(a>0)#").unwrap(), jv(r#"[{"a": 1}]"#));
    assert_eq!(
        get(&data, r##"#(a=="y")#"##).unwrap(),
        jv(r#"[{"a": "y"}]"#)
    );
}

#[test]
fn bare_operator_query_on_objects_requires_a_key() {
    match get(&jv(INPUT_JSON), r#"friends.#(=="Murphy")"#) {
        Err(Error::Eval(e)) => {
            assert_eq!(e.kind(), EvalErrorKind::TypeMismatch);
            assert_eq!(
                e.message(),
                "Query on mapping like objects require a key before the operator."
            );
        }
        other => panic!("expected an error, got {other:?}"),
    }
}

#[test]
fn projection_after_all_form_skips_elements_without_the_key() {
    let data = jv(r#"{"friends": [{"age": 44}, {"name": "x"}, {"age": 47}]}"#);
    assert_eq!(get(&data, "friends.#(age>0)#.age").unwrap(), jv("[44, 47]"));
}
