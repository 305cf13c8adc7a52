/*!
gjson is a GJSON path engine for decoded JSON values.

Given a [`Value`] tree and a path expression, it returns the sub-value the
path designates, or a diagnostic error pinpointing the offending character:

```
use gjson::{from_json_text, get, Value};

let data = from_json_text(r#"{"name": {"first": "Tom"}, "age": 37}"#).unwrap();
assert_eq!(get(&data, "name.first").unwrap(), Value::from("Tom"));
assert_eq!(get(&data, "age").unwrap(), Value::from(37));
```

Paths support dotted and piped segmentation, escapes, array indexing,
wildcards, `#` projections, `#(...)` predicate queries and `@modifier`
chaining. A path can be compiled once with [`GJsonPath::parse`] and evaluated
against many values:

```
use gjson::{from_json_text, GJsonPath, Value};

let path = GJsonPath::parse("friends.#(age>45)#.age").unwrap();
let data = from_json_text(r#"{"friends": [{"age": 44}, {"age": 68}, {"age": 47}]}"#).unwrap();
assert_eq!(path.eval(&data).unwrap(), from_json_text("[68, 47]").unwrap());
```
*/

mod error;
mod modifier;
mod parsing;
mod path;
mod serialization;
mod value;

pub use error::{Error, EvalError, EvalErrorKind, ParseError};
pub use modifier::{ModifierFn, ModifierRegistry};
pub use path::GJsonPath;
pub use serialization::from_json_text;
pub use value::Value;

/// Parses and evaluates a path against a value in one step.
pub fn get(value: &Value, query: &str) -> Result<Value, Error> {
    GJsonPath::parse(query)?.eval(value)
}

/// Like [`get`], but serializes the result, honoring the
/// `@ugly`/`@pretty`/`@ascii` modifiers seen along the path.
pub fn get_string(value: &Value, query: &str) -> Result<String, Error> {
    GJsonPath::parse(query)?.render(value)
}

/// Like [`get`], but substitutes `default` when the path does not resolve
/// (missing key, bad index, type mismatch). Parse errors, unknown modifiers,
/// invalid modifier options and `@valid` failures stay hard errors.
pub fn get_or(value: &Value, query: &str, default: Value) -> Result<Value, Error> {
    match get(value, query) {
        Err(Error::Eval(e))
            if matches!(
                e.kind(),
                EvalErrorKind::NotFound | EvalErrorKind::TypeMismatch
            ) =>
        {
            Ok(default)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests;
