use crate::{
    error::{Error, EvalError, EvalErrorKind, ParseError},
    modifier::{self, ModifierRegistry},
    parsing::{self, Delimiter, PartKind, PathPart, QueryOp, QueryPart, TruthyTag},
    serialization::{self, RenderSpec},
    value::Value,
};
use std::cmp::Ordering;

/// A compiled GJSON path.
///
/// Once parsed, the path can be evaluated efficiently multiple times against
/// different values.
#[derive(Debug, Clone)]
pub struct GJsonPath {
    query: String,
    parts: Vec<PathPart>,
}

impl GJsonPath {
    /// Parses a path expression.
    #[inline]
    pub fn parse(query: &str) -> Result<Self, ParseError> {
        Ok(Self {
            query: query.to_owned(),
            parts: parsing::parse_path(query)?,
        })
    }

    /// The original path text.
    #[inline]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Evaluates the path against a value with only the built-in modifiers.
    #[inline]
    pub fn eval(&self, value: &Value) -> Result<Value, Error> {
        self.eval_with(value, &ModifierRegistry::default())
    }

    /// Evaluates the path against a value, resolving custom modifiers
    /// through the given registry.
    pub fn eval_with(&self, value: &Value, registry: &ModifierRegistry) -> Result<Value, Error> {
        Ok(self.run(value, registry)?.0)
    }

    /// Evaluates the path and serializes the result, honoring the
    /// `@ugly`/`@pretty`/`@ascii` flags collected during evaluation.
    #[inline]
    pub fn render(&self, value: &Value) -> Result<String, Error> {
        self.render_with(value, &ModifierRegistry::default())
    }

    pub fn render_with(&self, value: &Value, registry: &ModifierRegistry) -> Result<String, Error> {
        let (result, render) = self.run(value, registry)?;
        serialization::render(&result, &render).map_err(|_| {
            Error::Eval(EvalError::new(
                EvalErrorKind::InvalidValue,
                "The current object cannot be converted to JSON.",
            ))
        })
    }

    fn run(&self, value: &Value, registry: &ModifierRegistry) -> Result<(Value, RenderSpec), Error> {
        let mut evaluator = Evaluator {
            query: &self.query,
            registry,
            render: RenderSpec::default(),
        };
        let mut current = value.clone();
        for part in &self.parts {
            current = evaluator.step(part, current)?;
        }
        Ok((current, evaluator.render))
    }
}

struct Evaluator<'a> {
    query: &'a str,
    registry: &'a ModifierRegistry,
    render: RenderSpec,
}

impl Evaluator<'_> {
    fn step(&mut self, part: &PathPart, obj: Value) -> Result<Value, Error> {
        match &part.kind {
            PartKind::LinesPrefix => Ok(Value::Array(vec![obj])),
            PartKind::ArrayAll => self.array_all(part, obj),
            PartKind::Field { name } => self.field(part, name, obj),
            PartKind::Wildcard { raw, pattern } => self.wildcard(part, raw, pattern, obj),
            PartKind::Index { index, raw } => self.index(part, *index, raw, obj),
            PartKind::Query(query) => self.query_part(part, query, obj),
            PartKind::Modifier { name, options } => {
                modifier::apply(name, options, obj, part.is_last, self.registry, &mut self.render)
                    .map_err(|e| Error::Eval(e.or_at(self.query, part.start)))
            }
        }
    }

    fn array_all(&self, part: &PathPart, obj: Value) -> Result<Value, Error> {
        if !part.is_last {
            return Ok(obj);
        }
        if part.delimiter == Delimiter::Dot && (part.after_hash || part.after_query_all) {
            return Ok(Value::Array(Vec::new()));
        }
        match obj {
            Value::Array(items) => Ok(Value::Integer(items.len() as i64)),
            other => Err(self.type_mismatch(
                format!(
                    "Expected a sequence like object for query part # at the end of the \
                     query, got {}.",
                    other.type_name()
                ),
                part.start,
            )),
        }
    }

    fn field(&self, part: &PathPart, name: &str, obj: Value) -> Result<Value, Error> {
        if !part.after_hash {
            if let Value::Object(_) = &obj {
                return obj.get(name).cloned().ok_or_else(|| {
                    self.not_found(
                        format!("Mapping object does not have key `{name}`."),
                        part.start,
                    )
                });
            }
        }

        if self.projecting(part) {
            if let Value::Array(items) = obj {
                // Skip elements that are not mappings or lack the key.
                return Ok(Value::Array(
                    items
                        .into_iter()
                        .filter_map(|e| e.get(name).cloned())
                        .collect(),
                ));
            }
        }

        Err(self.type_mismatch(
            format!("Invalid or unsupported query part `{name}`."),
            part.start,
        ))
    }

    fn wildcard(
        &self,
        part: &PathPart,
        raw: &str,
        pattern: &regex::Regex,
        obj: Value,
    ) -> Result<Value, Error> {
        if let Value::Object(entries) = &obj {
            // The mapping is ordered, the first matching key wins.
            return entries
                .iter()
                .find(|(k, _)| pattern.is_match(k))
                .map(|(_, v)| v.clone())
                .ok_or_else(|| {
                    self.not_found(
                        format!("No key matching pattern with wildcard `{raw}`."),
                        part.start,
                    )
                });
        }

        let type_name = obj.type_name();
        if self.projecting(part) {
            if let Value::Array(items) = obj {
                return Ok(Value::Array(
                    items
                        .into_iter()
                        .filter_map(|e| match e {
                            Value::Object(entries) => entries
                                .into_iter()
                                .find(|(k, _)| pattern.is_match(k))
                                .map(|(_, v)| v),
                            _ => None,
                        })
                        .collect(),
                ));
            }
        }

        Err(self.type_mismatch(
            format!(
                "Wildcard matching key `{raw}` requires a mapping object, got {type_name} \
                 instead."
            ),
            part.start,
        ))
    }

    fn index(&self, part: &PathPart, index: usize, raw: &str, obj: Value) -> Result<Value, Error> {
        match obj {
            // Integer object keys are not a JSON thing, digits address the
            // string key.
            Value::Object(entries) => entries
                .into_iter()
                .find(|(k, _)| k.as_str() == raw)
                .map(|(_, v)| v)
                .ok_or_else(|| {
                    self.not_found(
                        format!("Mapping object does not have key `{raw}`."),
                        part.start,
                    )
                }),
            Value::Array(items) => {
                if part.after_hash {
                    if part.delimiter == Delimiter::Pipe {
                        return Err(self.type_mismatch(
                            "Integer query part after a pipe delimiter on an sequence like \
                             object.",
                            part.start,
                        ));
                    }
                    return Ok(Value::Array(Vec::new()));
                }
                if part.after_query_all && part.delimiter == Delimiter::Dot {
                    return Ok(Value::Array(Vec::new()));
                }
                let len = items.len();
                items.into_iter().nth(index).ok_or_else(|| {
                    self.not_found(
                        format!(
                            "Index `{raw}` out of range for sequence object with {len} items \
                             in query."
                        ),
                        part.start,
                    )
                })
            }
            other => Err(self.type_mismatch(
                format!(
                    "Integer query part on unsupported object type {}, expected a mapping or \
                     sequence like object.",
                    other.type_name()
                ),
                part.start,
            )),
        }
    }

    fn query_part(&self, part: &PathPart, query: &QueryPart, obj: Value) -> Result<Value, Error> {
        let items = match obj {
            Value::Array(items) => items,
            other => {
                return Err(self.type_mismatch(
                    format!(
                        "Queries are supported only for sequence like objects, got {}.",
                        other.type_name()
                    ),
                    part.start,
                ));
            }
        };

        let Some(op) = &query.op else {
            // Existence query: keep the elements whose key path resolves.
            let matches: Vec<Value> = items
                .into_iter()
                .filter(|e| probe(e, &query.key_parts).is_some())
                .collect();
            return if query.first_only {
                Ok(matches
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| Value::Array(Vec::new())))
            } else {
                Ok(Value::Array(matches))
            };
        };

        if query.key_parts.is_empty() && query.first_only {
            if let Some(Value::Object(_)) = items.first() {
                return Err(self.type_mismatch(
                    "Query on mapping like objects require a key before the operator.",
                    part.start,
                ));
            }
        }

        let mut matches = Vec::new();
        for element in items {
            let matched = if query.key_parts.is_empty() {
                op_matches(op, Some(&element))
            } else {
                op_matches(op, probe(&element, &query.key_parts).as_ref())
            };
            if matched {
                matches.push(element);
            }
        }

        if query.first_only {
            matches.into_iter().next().ok_or_else(|| {
                self.not_found(
                    "Query for first element does not match anything.",
                    part.start,
                )
            })
        } else {
            Ok(Value::Array(matches))
        }
    }

    fn projecting(&self, part: &PathPart) -> bool {
        (part.after_hash || part.after_query_all) && part.delimiter == Delimiter::Dot
    }

    fn not_found(&self, message: impl Into<String>, position: usize) -> Error {
        Error::Eval(EvalError::new(EvalErrorKind::NotFound, message).at(self.query, position))
    }

    fn type_mismatch(&self, message: impl Into<String>, position: usize) -> Error {
        Error::Eval(EvalError::new(EvalErrorKind::TypeMismatch, message).at(self.query, position))
    }
}

/// Resolves a query key path against an element; `None` when any step does
/// not apply.
fn probe(element: &Value, parts: &[PathPart]) -> Option<Value> {
    let mut current = element.clone();
    for part in parts {
        current = match &part.kind {
            PartKind::Field { name } => current.get(name)?.clone(),
            PartKind::Wildcard { pattern, .. } => current
                .as_object()?
                .iter()
                .find(|(k, _)| pattern.is_match(k))
                .map(|(_, v)| v.clone())?,
            PartKind::Index { index, raw } => match current {
                Value::Object(entries) => entries
                    .into_iter()
                    .find(|(k, _)| k.as_str() == raw)
                    .map(|(_, v)| v)?,
                Value::Array(items) => items.into_iter().nth(*index)?,
                _ => return None,
            },
            _ => return None,
        };
    }
    Some(current)
}

/// Applies a query operator to a probe; a missing probe only matches the
/// `~false` check, type mismatches never match.
fn op_matches(op: &QueryOp, probe: Option<&Value>) -> bool {
    let Some(value) = probe else {
        return matches!(op, QueryOp::Truthy(TruthyTag::False));
    };
    match op {
        QueryOp::Eq(literal) => value == literal,
        QueryOp::Ne(literal) => value != literal,
        QueryOp::Lt(literal) => {
            matches!(value.partial_cmp_value(literal), Some(Ordering::Less))
        }
        QueryOp::Lte(literal) => matches!(
            value.partial_cmp_value(literal),
            Some(Ordering::Less) | Some(Ordering::Equal)
        ),
        QueryOp::Gt(literal) => {
            matches!(value.partial_cmp_value(literal), Some(Ordering::Greater))
        }
        QueryOp::Gte(literal) => matches!(
            value.partial_cmp_value(literal),
            Some(Ordering::Greater) | Some(Ordering::Equal)
        ),
        QueryOp::Match(pattern) => value.as_str().is_some_and(|s| pattern.is_match(s)),
        QueryOp::NotMatch(pattern) => value.as_str().is_some_and(|s| !pattern.is_match(s)),
        QueryOp::RegexMatch(pattern) => value.as_str().is_some_and(|s| pattern.is_match(s)),
        QueryOp::Truthy(tag) => match tag {
            TruthyTag::True => value.is_truthy(),
            TruthyTag::False => !value.is_truthy(),
            TruthyTag::Null => value.is_null(),
            TruthyTag::Any => true,
        },
    }
}
