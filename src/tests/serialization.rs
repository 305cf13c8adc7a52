use crate::tests::util::jv;
use crate::{from_json_text, get_string, GJsonPath};
use yare::parameterized;

#[parameterized(
    default_compact = { "key", "\"value\"" },
    ugly = { "@ugly", "{\"key\":\"value\"}" },
    pretty = { "@pretty", "{\n  \"key\": \"value\"\n}" },
    pretty_indent_4 = { "@pretty:{\"indent\": 4}", "{\n    \"key\": \"value\"\n}" },
    pretty_indent_tab = { "@pretty:{\"indent\": \"\\t\"}", "{\n\t\"key\": \"value\"\n}" },
    pretty_then_ugly = { "@pretty.@ugly", "{\"key\":\"value\"}" },
)]
fn render_modes(query: &str, expected: &str) {
    let data = jv(r#"{"key": "value"}"#);
    assert_eq!(get_string(&data, query).unwrap(), expected);
}

#[test]
fn pretty_sorts_keys_and_prefixes_lines() {
    let data = jv(r#"{"key2": "value2", "key1": "value1"}"#);
    let output = get_string(&data, "@pretty:{\"sortKeys\": true, \"prefix\": \"## \"}").unwrap();
    assert_eq!(
        output,
        "## {\n##   \"key1\": \"value1\",\n##   \"key2\": \"value2\"\n## }"
    );
}

#[test]
fn default_output_preserves_non_ascii() {
    let data = jv(r#"{"k": "café"}"#);
    assert_eq!(get_string(&data, "@this").unwrap(), "{\"k\":\"café\"}");
}

#[test]
fn ascii_escapes_non_ascii_characters() {
    let data = jv(r#"{"k": "café"}"#);
    assert_eq!(
        get_string(&data, "@ascii").unwrap(),
        "{\"k\":\"caf\\u00e9\"}"
    );
}

#[test]
fn ascii_uses_surrogate_pairs_above_the_bmp() {
    let data = jv(r#""😀""#);
    assert_eq!(get_string(&data, "@ascii").unwrap(), "\"\\ud83d\\ude00\"");
}

#[test]
fn ascii_composes_with_pretty() {
    let data = jv(r#"{"k": "é"}"#);
    assert_eq!(
        get_string(&data, "@pretty.@ascii").unwrap(),
        "{\n  \"k\": \"\\u00e9\"\n}"
    );
}

#[test]
fn render_flags_only_affect_serialization() {
    let data = jv(r#"{"b": 1, "a": 2}"#);
    let path = GJsonPath::parse("@pretty:{\"sortKeys\": true}").unwrap();
    // The evaluated value keeps its order, only the rendering sorts.
    assert_eq!(path.eval(&data).unwrap(), data);
    assert_eq!(
        path.render(&data).unwrap(),
        "{\n  \"a\": 2,\n  \"b\": 1\n}"
    );
}

#[test]
fn serialization_round_trips_preserving_order() {
    let text = r#"{"z": 1, "a": [1, 2.5, null, true, "x"], "m": {"q": 1, "p": 2}}"#;
    let value = jv(text);
    let rendered = get_string(&value, "@this").unwrap();
    let reparsed = from_json_text(&rendered).unwrap();
    assert_eq!(reparsed, value);

    // Order-sensitive equality would catch a reordering.
    assert_ne!(value, jv(r#"{"a": [1, 2.5, null, true, "x"], "z": 1, "m": {"q": 1, "p": 2}}"#));
}

#[test]
fn integers_and_floats_keep_their_shape() {
    assert_eq!(get_string(&jv("37"), "@this").unwrap(), "37");
    assert_eq!(get_string(&jv("37.0"), "@this").unwrap(), "37.0");
    assert_eq!(get_string(&jv("1002.3"), "@this").unwrap(), "1002.3");
}

#[test]
fn render_applies_after_path_evaluation() {
    let data = jv(r#"{"friends": [{"age": 44}, {"age": 68}, {"age": 47}]}"#);
    assert_eq!(
        get_string(&data, "friends.#.age|@pretty:{\"indent\": 0}").unwrap(),
        "[\n44,\n68,\n47\n]"
    );
}
