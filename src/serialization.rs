use crate::value::Value;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Decodes JSON text into a [`Value`], preserving mapping key order.
pub fn from_json_text(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text)
}

/// Rendering flags collected while evaluating a path: `@pretty` options and
/// the `@ascii` escape switch. The default renders compact JSON with
/// non-ASCII characters preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RenderSpec {
    pub pretty: Option<PrettyOptions>,
    pub ascii: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PrettyOptions {
    pub indent: String,
    pub prefix: String,
    pub sort_keys: bool,
}

pub(crate) fn to_compact(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Serializes a value honoring the render flags.
pub(crate) fn render(value: &Value, flags: &RenderSpec) -> Result<String, serde_json::Error> {
    let mut out = match &flags.pretty {
        None => to_compact(value)?,
        Some(options) => {
            let sorted;
            let value = if options.sort_keys {
                sorted = sort_keys(value);
                &sorted
            } else {
                value
            };
            let mut buf = Vec::new();
            let formatter = PrettyFormatter::with_indent(options.indent.as_bytes());
            let mut serializer = Serializer::with_formatter(&mut buf, formatter);
            value.serialize(&mut serializer)?;
            let text = String::from_utf8_lossy(&buf).into_owned();
            if options.prefix.is_empty() {
                text
            } else {
                text.lines()
                    .map(|line| format!("{}{}", options.prefix, line))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    };
    if flags.ascii {
        out = escape_non_ascii(&out);
    }
    Ok(out)
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(entries) => {
            let mut sorted: Vec<(String, Value)> = entries
                .iter()
                .map(|(k, v)| (k.clone(), sort_keys(v)))
                .collect();
            sorted.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Escapes every non-ASCII character as `\uXXXX`, using surrogate pairs
/// above the basic multilingual plane. Safe to apply to serialized JSON:
/// non-ASCII bytes only occur inside string literals.
fn escape_non_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let code = c as u32;
        if code < 0x80 {
            out.push(c);
        } else if code <= 0xFFFF {
            out.push_str(&format!("\\u{code:04x}"));
        } else {
            let v = code - 0x10000;
            let high = 0xD800 + (v >> 10);
            let low = 0xDC00 + (v & 0x3FF);
            out.push_str(&format!("\\u{high:04x}\\u{low:04x}"));
        }
    }
    out
}
