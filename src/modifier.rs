use crate::{
    error::{EvalError, EvalErrorKind},
    parsing::GRAMMAR_CHARS,
    serialization::{self, PrettyOptions, RenderSpec},
    value::Value,
};
use std::cmp::Ordering;
use std::collections::HashMap;

/// A custom modifier: `(options, current, last) -> value`, where `options`
/// are the entries of the JSON object following `:` (empty when absent) and
/// `last` tells whether the modifier is the final part of the path.
pub type ModifierFn =
    Box<dyn Fn(&[(String, Value)], &Value, bool) -> Result<Value, EvalError> + Send + Sync>;

/// Custom modifier registry.
///
/// Built-ins always win the name lookup; registering a name that collides
/// with one, or that contains a grammar character, is rejected. Evaluation
/// only reads the registry, so sharing one across evaluations needs no
/// locking as long as registration happens up front.
#[derive(Default)]
pub struct ModifierRegistry {
    custom: HashMap<String, ModifierFn>,
    allow_unknown: bool,
}

impl ModifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the built-in modifiers.
    pub fn builtin_names() -> &'static [&'static str] {
        &[
            "ascii", "flatten", "keys", "pretty", "reverse", "sort", "sum_n", "this", "top_n",
            "ugly", "valid", "values",
        ]
    }

    /// Registers a custom modifier under `@name`.
    pub fn register(
        &mut self,
        name: &str,
        modifier: ModifierFn,
    ) -> Result<(), EvalError> {
        if name.is_empty() {
            return Err(EvalError::new(
                EvalErrorKind::Registration,
                "Got empty modifier name.",
            ));
        }
        if name.contains(GRAMMAR_CHARS) {
            return Err(EvalError::new(
                EvalErrorKind::Registration,
                format!(
                    "Invalid modifier name @{name}, the following characters are not allowed: \
                     . | # @ * ? \\ ( ) :"
                ),
            ));
        }
        if Self::builtin_names().contains(&name) {
            return Err(EvalError::new(
                EvalErrorKind::Registration,
                format!(
                    "Unable to register a modifier with the same name of the built-in \
                     modifier: @{name}."
                ),
            ));
        }
        self.custom.insert(name.to_owned(), modifier);
        Ok(())
    }

    /// When enabled, an unknown modifier name is a no-op instead of an
    /// error.
    pub fn allow_unknown(&mut self, allow: bool) {
        self.allow_unknown = allow;
    }

    fn custom(&self, name: &str) -> Option<&ModifierFn> {
        self.custom.get(name)
    }
}

/// Dispatches a modifier by name: built-ins first, then the registry.
pub(crate) fn apply(
    name: &str,
    options: &[(String, Value)],
    obj: Value,
    is_last: bool,
    registry: &ModifierRegistry,
    render: &mut RenderSpec,
) -> Result<Value, EvalError> {
    match name {
        "reverse" => Ok(reverse(obj)),
        "sort" => sort(obj),
        "keys" => keys(obj),
        "values" => values(obj),
        "flatten" => flatten(obj, options),
        "this" => Ok(obj),
        "valid" => valid(obj),
        "ugly" => {
            render.pretty = None;
            Ok(obj)
        }
        "pretty" => {
            render.pretty = Some(pretty_options(options)?);
            Ok(obj)
        }
        "ascii" => {
            render.ascii = true;
            Ok(obj)
        }
        "top_n" => top_n(obj, options),
        "sum_n" => sum_n(obj, options),
        _ => match registry.custom(name) {
            Some(modifier) => modifier(options, &obj, is_last),
            None if registry.allow_unknown => Ok(obj),
            None => Err(EvalError::new(
                EvalErrorKind::UnknownModifier,
                format!("Unknown modifier @{name}."),
            )),
        },
    }
}

fn reverse(obj: Value) -> Value {
    match obj {
        Value::Object(entries) => Value::Object(entries.into_iter().rev().collect()),
        Value::Array(items) => Value::Array(items.into_iter().rev().collect()),
        other => other,
    }
}

fn sort(obj: Value) -> Result<Value, EvalError> {
    match obj {
        Value::Object(mut entries) => {
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Ok(Value::Object(entries))
        }
        Value::Array(mut items) => {
            // Stable type-then-value key: incomparable values keep their
            // input order.
            items.sort_by(|a, b| {
                a.sort_rank().cmp(&b.sort_rank()).then_with(|| match (a, b) {
                    (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                    _ => a.partial_cmp_value(b).unwrap_or(Ordering::Equal),
                })
            });
            Ok(Value::Array(items))
        }
        other => Err(EvalError::new(
            EvalErrorKind::TypeMismatch,
            format!(
                "@sort modifier not supported for object of type {}. Expected a mapping or \
                 sequence like object.",
                other.type_name()
            ),
        )),
    }
}

fn keys(obj: Value) -> Result<Value, EvalError> {
    match obj {
        Value::Object(entries) => Ok(Value::Array(
            entries.into_iter().map(|(k, _)| Value::String(k)).collect(),
        )),
        other => Err(EvalError::new(
            EvalErrorKind::TypeMismatch,
            format!(
                "@keys modifier not supported for object of type {}. Expected a mapping \
                 object.",
                other.type_name()
            ),
        )),
    }
}

fn values(obj: Value) -> Result<Value, EvalError> {
    match obj {
        Value::Object(entries) => Ok(Value::Array(
            entries.into_iter().map(|(_, v)| v).collect(),
        )),
        other => Err(EvalError::new(
            EvalErrorKind::TypeMismatch,
            format!(
                "@values modifier not supported for object of type {}. Expected a mapping \
                 object.",
                other.type_name()
            ),
        )),
    }
}

fn flatten(obj: Value, options: &[(String, Value)]) -> Result<Value, EvalError> {
    let deep = opt_bool(options, "flatten", "deep")?.unwrap_or(false);
    match obj {
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            flatten_into(items, deep, &mut out);
            Ok(Value::Array(out))
        }
        other => Ok(other),
    }
}

fn flatten_into(items: Vec<Value>, deep: bool, out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) if deep => flatten_into(inner, true, out),
            Value::Array(inner) => out.extend(inner),
            other => out.push(other),
        }
    }
}

fn valid(obj: Value) -> Result<Value, EvalError> {
    if json_representable(&obj) {
        Ok(obj)
    } else {
        Err(EvalError::new(
            EvalErrorKind::InvalidValue,
            "The current object cannot be converted to JSON.",
        ))
    }
}

/// The only non-JSON state the model admits is a non-finite float.
fn json_representable(value: &Value) -> bool {
    match value {
        Value::Float(f) => f.is_finite(),
        Value::Array(items) => items.iter().all(json_representable),
        Value::Object(entries) => entries.iter().all(|(_, v)| json_representable(v)),
        _ => true,
    }
}

fn top_n(obj: Value, options: &[(String, Value)]) -> Result<Value, EvalError> {
    let items = match obj {
        Value::Array(items) => items,
        other => {
            return Err(EvalError::new(
                EvalErrorKind::TypeMismatch,
                format!(
                    "@top_n modifier not supported for object of type {}. Expected a \
                     sequence like object.",
                    other.type_name()
                ),
            ));
        }
    };
    let n = opt_count(options, "top_n")?;

    let mut counts: Vec<(String, i64)> = Vec::new();
    for item in &items {
        let key = key_string(item)?;
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 += 1,
            None => counts.push((key, 1)),
        }
    }
    // Descending count, insertion-stable on ties.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    if let Some(n) = n {
        counts.truncate(n);
    }

    Ok(Value::Object(
        counts
            .into_iter()
            .map(|(k, c)| (k, Value::Integer(c)))
            .collect(),
    ))
}

fn sum_n(obj: Value, options: &[(String, Value)]) -> Result<Value, EvalError> {
    let items = match obj {
        Value::Array(items) => items,
        other => {
            return Err(EvalError::new(
                EvalErrorKind::TypeMismatch,
                format!(
                    "@sum_n modifier not supported for object of type {}. Expected a \
                     sequence like object.",
                    other.type_name()
                ),
            ));
        }
    };
    let group_key = required_string_option(options, "sum_n", "group")?;
    let sum_key = required_string_option(options, "sum_n", "sum")?;
    let n = opt_count(options, "sum_n")?;

    let mut sums: Vec<(String, Number)> = Vec::new();
    for item in &items {
        let (Some(group), Some(addend)) = (item.get(&group_key), item.get(&sum_key)) else {
            continue;
        };
        let addend = match addend {
            Value::Integer(i) => Number::Integer(*i),
            Value::Float(f) => Number::Float(*f),
            _ => continue,
        };
        let key = key_string(group)?;
        match sums.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = entry.1.add(addend),
            None => sums.push((key, addend)),
        }
    }
    sums.sort_by(|a, b| {
        b.1.as_f64()
            .partial_cmp(&a.1.as_f64())
            .unwrap_or(Ordering::Equal)
    });
    if let Some(n) = n {
        sums.truncate(n);
    }

    Ok(Value::Object(
        sums.into_iter().map(|(k, v)| (k, v.into_value())).collect(),
    ))
}

/// Accumulator that stays an integer until a float joins the sum.
#[derive(Clone, Copy)]
enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    fn add(self, other: Number) -> Number {
        match (self, other) {
            (Number::Integer(a), Number::Integer(b)) => match a.checked_add(b) {
                Some(sum) => Number::Integer(sum),
                None => Number::Float(a as f64 + b as f64),
            },
            _ => Number::Float(self.as_f64() + other.as_f64()),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Integer(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Number::Integer(i) => Value::Integer(i),
            Number::Float(f) => Value::Float(f),
        }
    }
}

/// Group keys are the element's string form: strings as-is, everything else
/// its compact JSON.
fn key_string(value: &Value) -> Result<String, EvalError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => serialization::to_compact(other).map_err(|_| {
            EvalError::new(
                EvalErrorKind::InvalidValue,
                "The current object cannot be converted to JSON.",
            )
        }),
    }
}

fn pretty_options(options: &[(String, Value)]) -> Result<PrettyOptions, EvalError> {
    let indent = match opt(options, "indent") {
        None => "  ".to_owned(),
        Some(Value::Integer(i)) if *i >= 0 => " ".repeat(*i as usize),
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(invalid_options(
                "pretty",
                "the `indent` option must be a non-negative integer or a string",
            ));
        }
    };
    let prefix = match opt(options, "prefix") {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(invalid_options("pretty", "the `prefix` option must be a string"));
        }
    };
    let sort_keys = match opt(options, "sortKeys").or_else(|| opt(options, "sortkeys")) {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            return Err(invalid_options(
                "pretty",
                "the `sortKeys` option must be a boolean",
            ));
        }
    };
    Ok(PrettyOptions {
        indent,
        prefix,
        sort_keys,
    })
}

fn opt<'a>(options: &'a [(String, Value)], key: &str) -> Option<&'a Value> {
    options
        .iter()
        .find(|(k, _)| k.as_str() == key)
        .map(|(_, v)| v)
}

fn opt_bool(
    options: &[(String, Value)],
    modifier: &str,
    key: &str,
) -> Result<Option<bool>, EvalError> {
    match opt(options, key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(invalid_options(
            modifier,
            &format!("the `{key}` option must be a boolean"),
        )),
    }
}

/// The optional `n` cap shared by `@top_n` and `@sum_n`.
fn opt_count(options: &[(String, Value)], modifier: &str) -> Result<Option<usize>, EvalError> {
    match opt(options, "n") {
        None => Ok(None),
        Some(Value::Integer(i)) if *i >= 0 => Ok(Some(*i as usize)),
        Some(_) => Err(invalid_options(
            modifier,
            "the `n` option must be a non-negative integer",
        )),
    }
}

fn required_string_option(
    options: &[(String, Value)],
    modifier: &str,
    key: &str,
) -> Result<String, EvalError> {
    match opt(options, key) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(invalid_options(
            modifier,
            &format!("a `{key}` option with the name of a field is required"),
        )),
    }
}

fn invalid_options(modifier: &str, detail: &str) -> EvalError {
    EvalError::new(
        EvalErrorKind::InvalidModifierOptions,
        format!("Invalid options for modifier @{modifier}: {detail}."),
    )
}
