use crate::{error::ParseError, value::Value};
use regex::Regex;

/// Characters with a meaning in the path grammar. None of them may appear in
/// a modifier name.
pub(crate) const GRAMMAR_CHARS: &[char] = &['.', '|', '#', '@', '*', '?', '\\', '(', ')', ':'];

/// Query operators, two-character forms first so the scan is longest-match.
/// `=` is accepted as an alias of `==`.
const QUERY_OPERATORS: &[&str] = &[
    "==", "=~", "!=", "!%", "<=", ">=", "<", ">", "%", "~", "=",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delimiter {
    /// First part of the query, no delimiter before it.
    None,
    Dot,
    Pipe,
}

/// One parsed part of a path, annotated with its originating column and the
/// projection state accumulated by the parts before it.
#[derive(Debug, Clone)]
pub(crate) struct PathPart {
    pub kind: PartKind,
    pub start: usize,
    pub delimiter: Delimiter,
    pub is_last: bool,
    /// A bare `#` appeared somewhere before this part.
    pub after_hash: bool,
    /// A `#(...)#` appeared somewhere before this part.
    pub after_query_all: bool,
}

impl PathPart {
    fn new(kind: PartKind, start: usize, delimiter: Delimiter) -> Self {
        Self {
            kind,
            start,
            delimiter,
            is_last: false,
            after_hash: false,
            after_query_all: false,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum PartKind {
    /// A literal object key, escapes already decoded.
    Field { name: String },
    /// A field pattern with `*`/`?` wildcards, compiled to an anchored regex.
    Wildcard { raw: String, pattern: Regex },
    /// An unsigned integer segment; `raw` doubles as the key in a mapping
    /// context.
    Index { index: usize, raw: String },
    /// The bare `#`.
    ArrayAll,
    /// A `#(...)` or `#(...)#` predicate.
    Query(Box<QueryPart>),
    /// An `@name` with optional JSON-object options.
    Modifier {
        name: String,
        options: Vec<(String, Value)>,
    },
    /// The leading `..`, wrapping the input into a singleton sequence.
    LinesPrefix,
}

#[derive(Debug, Clone)]
pub(crate) struct QueryPart {
    /// Key side as written, for error messages.
    pub key_raw: String,
    /// Key side parsed as a sub-path; empty when the key is empty.
    pub key_parts: Vec<PathPart>,
    /// `None` is an existence query.
    pub op: Option<QueryOp>,
    /// `#(...)` selects the first match, `#(...)#` all of them.
    pub first_only: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum QueryOp {
    Eq(Value),
    Ne(Value),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Match(Regex),
    NotMatch(Regex),
    RegexMatch(Regex),
    Truthy(TruthyTag),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TruthyTag {
    True,
    False,
    Null,
    Any,
}

/// Parses a path into its ordered parts and precomputes the projection flags
/// each part sees during evaluation.
pub(crate) fn parse_path(query: &str) -> Result<Vec<PathPart>, ParseError> {
    let parser = Parser {
        query,
        chars: query.chars().collect(),
    };
    parser.parse()
}

struct Parser<'a> {
    query: &'a str,
    chars: Vec<char>,
}

impl Parser<'_> {
    fn parse(&self) -> Result<Vec<PathPart>, ParseError> {
        if self.chars.is_empty() {
            return Err(self.error("Empty query.", 0));
        }

        let mut parts: Vec<PathPart> = Vec::new();
        let mut i = 0;

        if self.chars.first() == Some(&'.') && self.chars.get(1) == Some(&'.') {
            parts.push(PathPart::new(PartKind::LinesPrefix, 0, Delimiter::None));
            i = 2;
            if i >= self.chars.len() {
                return Err(self.error("Empty query.", 0));
            }
        }

        let mut delimiter = Delimiter::None;
        let mut current = String::new();
        let mut current_start = 0;

        while i < self.chars.len() {
            let c = self.chars[i];
            let next = self.chars.get(i + 1).copied();

            if c == '.' || c == '|' {
                if matches!(next, Some('.') | Some('|')) {
                    return Err(self.error("Empty query part between two delimiters.", i + 1));
                }
                if !current.is_empty() {
                    parts.push(self.field_part(&current, current_start, delimiter)?);
                    current.clear();
                }
                if next.is_none() {
                    return Err(self.error("Delimiter at the end of the query.", i));
                }
                delimiter = if c == '.' { Delimiter::Dot } else { Delimiter::Pipe };
                i += 1;
                continue;
            }

            if current.is_empty() {
                if c == '@' {
                    let (part, end) = self.parse_modifier(i, delimiter)?;
                    parts.push(part);
                    i = end + 1;
                    continue;
                }
                if c == '#' && matches!(next, None | Some('.') | Some('|')) {
                    parts.push(PathPart::new(PartKind::ArrayAll, i, delimiter));
                    i += 1;
                    continue;
                }
                if c == '#' && next == Some('(') {
                    let (part, end) = self.parse_query(i, delimiter)?;
                    parts.push(part);
                    i = end + 1;
                    continue;
                }
                if c.is_ascii_digit() {
                    if let Some((part, end)) = self.try_parse_index(i, delimiter) {
                        parts.push(part);
                        i = end + 1;
                        continue;
                    }
                }
            }

            if current.is_empty() {
                current_start = i;
            }
            current.push(c);
            if c == '\\' {
                match next {
                    Some(n) => {
                        current.push(n);
                        i += 2;
                        continue;
                    }
                    None => {
                        return Err(self.error("Escape character at the end of the query.", i + 1));
                    }
                }
            }
            i += 1;
        }

        if !current.is_empty() {
            parts.push(self.field_part(&current, current_start, delimiter)?);
        }

        if parts.is_empty() {
            return Err(self.error("Empty query.", 0));
        }

        self.finalize(parts)
    }

    /// Marks the last part and threads the `#`/`#(...)#` projection flags
    /// through the part list; rejects the terminal `#|#` form.
    fn finalize(&self, mut parts: Vec<PathPart>) -> Result<Vec<PathPart>, ParseError> {
        if let Some(last) = parts.last_mut() {
            last.is_last = true;
        }

        let mut after_hash = false;
        let mut after_query_all = false;
        let mut previous_is_hash = false;
        for part in parts.iter_mut() {
            part.after_hash = after_hash;
            part.after_query_all = after_query_all;
            match &part.kind {
                PartKind::ArrayAll => {
                    if part.is_last && part.delimiter == Delimiter::Pipe && previous_is_hash {
                        return Err(self.error(
                            "The pipe delimiter cannot immediately follow the # element.",
                            part.start,
                        ));
                    }
                    after_hash = true;
                    previous_is_hash = true;
                }
                PartKind::Query(query) => {
                    if !query.first_only {
                        after_query_all = true;
                    }
                    previous_is_hash = false;
                }
                _ => previous_is_hash = false,
            }
        }

        Ok(parts)
    }

    fn field_part(
        &self,
        raw: &str,
        start: usize,
        delimiter: Delimiter,
    ) -> Result<PathPart, ParseError> {
        let kind = if has_unescaped_wildcard(raw) {
            let pattern = compile_wildcard(raw)
                .map_err(|_| self.error(format!("Invalid wildcard `{raw}`."), start))?;
            PartKind::Wildcard {
                raw: raw.to_owned(),
                pattern,
            }
        } else {
            PartKind::Field {
                name: unescape(raw),
            }
        };
        Ok(PathPart::new(kind, start, delimiter))
    }

    /// An unsigned integer segment: digits without a leading zero, ending at
    /// a delimiter or the end of the query. Anything else stays a field.
    fn try_parse_index(&self, start: usize, delimiter: Delimiter) -> Option<(PathPart, usize)> {
        let mut end = start;
        while end < self.chars.len() && self.chars[end].is_ascii_digit() {
            end += 1;
        }
        if !matches!(self.chars.get(end), None | Some('.') | Some('|')) {
            return None;
        }
        if self.chars[start] == '0' && end > start + 1 {
            return None;
        }

        let raw = self.slice(start, end);
        let index = raw.parse::<usize>().unwrap_or(usize::MAX);
        Some((
            PathPart::new(PartKind::Index { index, raw }, start, delimiter),
            end - 1,
        ))
    }

    /// Parses `@name` and optional `:{...}` options starting at the `@`.
    /// Returns the part and the index of its last character.
    fn parse_modifier(
        &self,
        start: usize,
        delimiter: Delimiter,
    ) -> Result<(PathPart, usize), ParseError> {
        let mut i = start + 1;
        while i < self.chars.len() && !GRAMMAR_CHARS.contains(&self.chars[i]) {
            i += 1;
        }
        let name = self.slice(start + 1, i);
        if name.is_empty() {
            return Err(self.error("Got empty modifier name.", start));
        }

        let (options, end) = match self.chars.get(i) {
            None | Some('.') | Some('|') => (Vec::new(), i - 1),
            Some(':') => self.parse_modifier_options(&name, i + 1)?,
            Some(_) => {
                return Err(self.error(
                    format!(
                        "Invalid modifier name @{name}, the following characters are not \
                         allowed: . | # @ * ? \\ ( ) :"
                    ),
                    start,
                ));
            }
        };

        Ok((
            PathPart::new(PartKind::Modifier { name, options }, start, delimiter),
            end,
        ))
    }

    /// Finds the options span by decoding every prefix that ends at an
    /// unescaped delimiter (or the end of the query) until one parses.
    fn parse_modifier_options(
        &self,
        name: &str,
        start: usize,
    ) -> Result<(Vec<(String, Value)>, usize), ParseError> {
        if start >= self.chars.len() {
            return Err(self.error(
                "Modifier with options separator `:` without any option.",
                start,
            ));
        }

        let mut cut_points = Vec::new();
        let mut j = start;
        while j < self.chars.len() {
            match self.chars[j] {
                '\\' => {
                    j += 2;
                    continue;
                }
                '.' | '|' => cut_points.push(j),
                _ => {}
            }
            j += 1;
        }
        cut_points.push(self.chars.len());

        for cut in cut_points {
            let text = self.slice(start, cut);
            if let Ok(value) = serde_json::from_str::<Value>(&text) {
                return match value {
                    Value::Object(entries) => Ok((entries, cut - 1)),
                    other => Err(self.error(
                        format!(
                            "Invalid options for modifier @{name}, expected mapping got {}.",
                            other.type_name()
                        ),
                        start,
                    )),
                };
            }
        }

        Err(self.error("Unable to load modifier options.", start))
    }

    /// Parses `#(...)` / `#(...)#` starting at the `#`. Returns the part and
    /// the index of its last character.
    fn parse_query(
        &self,
        start: usize,
        delimiter: Delimiter,
    ) -> Result<(PathPart, usize), ParseError> {
        let close = self.find_closing_paren(start)?;
        let (first_only, end) = if self.chars.get(close + 1) == Some(&'#') {
            (false, close + 1)
        } else {
            (true, close)
        };
        if !matches!(self.chars.get(end + 1), None | Some('.') | Some('|')) {
            return Err(self.error(
                "Expected delimiter or end of query after closing parenthesis.",
                end + 1,
            ));
        }

        self.reject_nested_query(start + 2, close)?;

        let content_start = start + 2;
        let content = self.slice(content_start, close);

        let query = match self.find_operator(content_start, close) {
            None => {
                let (key_raw, key_start) = trim_span(&content, content_start);
                if key_raw.is_empty() {
                    return Err(self.error("Empty or invalid query.", start));
                }
                QueryPart {
                    key_parts: self.parse_query_key(&key_raw, key_start)?,
                    key_raw,
                    op: None,
                    first_only,
                }
            }
            Some((op_pos, op_str)) => {
                let key_text = self.slice(content_start, op_pos);
                let (key_raw, key_start) = trim_span(&key_text, content_start);
                let value_text = self.slice(op_pos + op_str.chars().count(), close);
                let (value_raw, value_start) =
                    trim_span(&value_text, op_pos + op_str.chars().count());
                let op = self.parse_operator(op_str, &key_raw, &value_raw, value_start)?;
                let key_parts = if key_raw.is_empty() {
                    Vec::new()
                } else {
                    self.parse_query_key(&key_raw, key_start)?
                };
                QueryPart {
                    key_raw,
                    key_parts,
                    op: Some(op),
                    first_only,
                }
            }
        };

        Ok((
            PathPart::new(PartKind::Query(Box::new(query)), start, delimiter),
            end,
        ))
    }

    /// Balanced-paren scan honoring backslash escapes and JSON strings.
    /// `start` is the index of the `#`; returns the index of the closing
    /// parenthesis.
    fn find_closing_paren(&self, start: usize) -> Result<usize, ParseError> {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut j = start + 1;
        while j < self.chars.len() {
            match self.chars[j] {
                '\\' => {
                    j += 2;
                    continue;
                }
                '"' => in_string = !in_string,
                '(' if !in_string => depth += 1,
                ')' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(j);
                    }
                }
                _ => {}
            }
            j += 1;
        }
        Err(self.error("Unbalanced parentheses.", start))
    }

    /// Sub-queries inside a query are out of the grammar; refuse them with a
    /// targeted error instead of mis-evaluating.
    fn reject_nested_query(&self, content_start: usize, close: usize) -> Result<(), ParseError> {
        let mut in_string = false;
        let mut j = content_start;
        while j < close {
            match self.chars[j] {
                '\\' => {
                    j += 2;
                    continue;
                }
                '"' => in_string = !in_string,
                '#' if !in_string && self.chars.get(j + 1) == Some(&'(') => {
                    return Err(self.error("Nested queries are not supported.", j));
                }
                _ => {}
            }
            j += 1;
        }
        Ok(())
    }

    /// First unescaped operator occurrence inside the query content,
    /// two-character operators winning over their one-character prefixes.
    fn find_operator(&self, content_start: usize, close: usize) -> Option<(usize, &'static str)> {
        let mut j = content_start;
        while j < close {
            if self.chars[j] == '\\' {
                j += 2;
                continue;
            }
            for op in QUERY_OPERATORS {
                let op_chars: Vec<char> = op.chars().collect();
                if j + op_chars.len() <= close
                    && self.chars[j..j + op_chars.len()] == op_chars[..]
                {
                    return Some((j, op));
                }
            }
            j += 1;
        }
        None
    }

    fn parse_operator(
        &self,
        op_str: &str,
        key_raw: &str,
        value_raw: &str,
        value_start: usize,
    ) -> Result<QueryOp, ParseError> {
        match op_str {
            "~" => match value_raw {
                "true" => Ok(QueryOp::Truthy(TruthyTag::True)),
                "false" => Ok(QueryOp::Truthy(TruthyTag::False)),
                "null" => Ok(QueryOp::Truthy(TruthyTag::Null)),
                "*" => Ok(QueryOp::Truthy(TruthyTag::Any)),
                _ => Err(self.error(
                    format!(
                        "Invalid value `{value_raw}` for the truthiness operator, expected \
                         `true`, `false`, `null` or `*`."
                    ),
                    value_start,
                )),
            },
            "=~" => {
                let pattern = match serde_json::from_str::<Value>(value_raw) {
                    Ok(Value::String(s)) => s,
                    _ => value_raw.to_owned(),
                };
                let regex = Regex::new(&pattern).map_err(|_| {
                    self.error(format!("Invalid regex `{pattern}`."), value_start)
                })?;
                Ok(QueryOp::RegexMatch(regex))
            }
            "%" | "!%" => {
                let literal = self.parse_literal(key_raw, value_raw, value_start)?;
                let pattern_text = match &literal {
                    Value::String(s) => s.clone(),
                    Value::Integer(i) => i.to_string(),
                    Value::Float(f) => f.to_string(),
                    Value::Bool(b) => b.to_string(),
                    Value::Null => "null".to_owned(),
                    _ => {
                        return Err(self.error(
                            format!(
                                "Invalid value `{value_raw}` for the query key `{key_raw}`."
                            ),
                            value_start,
                        ));
                    }
                };
                let pattern = compile_wildcard(&pattern_text).map_err(|_| {
                    self.error(format!("Invalid wildcard `{pattern_text}`."), value_start)
                })?;
                if op_str == "%" {
                    Ok(QueryOp::Match(pattern))
                } else {
                    Ok(QueryOp::NotMatch(pattern))
                }
            }
            _ => {
                let literal = self.parse_literal(key_raw, value_raw, value_start)?;
                Ok(match op_str {
                    "==" | "=" => QueryOp::Eq(literal),
                    "!=" => QueryOp::Ne(literal),
                    "<" => QueryOp::Lt(literal),
                    "<=" => QueryOp::Lte(literal),
                    ">" => QueryOp::Gt(literal),
                    ">=" => QueryOp::Gte(literal),
                    _ => unreachable!("operator table and dispatch are in sync"),
                })
            }
        }
    }

    fn parse_literal(
        &self,
        key_raw: &str,
        value_raw: &str,
        value_start: usize,
    ) -> Result<Value, ParseError> {
        serde_json::from_str::<Value>(value_raw).map_err(|_| {
            self.error(
                format!("Invalid value `{value_raw}` for the query key `{key_raw}`."),
                value_start,
            )
        })
    }

    /// The key side of a query is itself a path, restricted to plain
    /// fields, wildcards and indexes.
    fn parse_query_key(&self, key_raw: &str, key_start: usize) -> Result<Vec<PathPart>, ParseError> {
        let parts = parse_path(key_raw)
            .map_err(|e| self.error(e.message().to_owned(), key_start + e.position()))?;
        for part in &parts {
            match part.kind {
                PartKind::Field { .. } | PartKind::Wildcard { .. } | PartKind::Index { .. } => {}
                _ => {
                    return Err(self.error(
                        format!("Unsupported key path `{key_raw}` in query."),
                        key_start,
                    ));
                }
            }
        }
        Ok(parts)
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start.min(self.chars.len())..end.min(self.chars.len())]
            .iter()
            .collect()
    }

    fn error(&self, message: impl Into<String>, position: usize) -> ParseError {
        ParseError::new(message, self.query, position)
    }
}

/// Trims a span of query text, returning the trimmed text and the adjusted
/// start column.
fn trim_span(text: &str, start: usize) -> (String, usize) {
    let leading = text.chars().take_while(|c| c.is_whitespace()).count();
    (text.trim().to_owned(), start + leading)
}

fn has_unescaped_wildcard(raw: &str) -> bool {
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '*' | '?' => return true,
            _ => {}
        }
    }
    false
}

/// Removes the escape characters from a field segment, keeping the escaped
/// characters literally.
pub(crate) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(n) = chars.next() {
                out.push(n);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Compiles a GJSON wildcard into an anchored regex: `*` becomes `.*`
/// (consecutive stars squashed), `?` becomes `.`, everything else is
/// escaped. Escaped `*`/`?` revert to literals.
pub(crate) fn compile_wildcard(raw: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::from("^");
    let mut prev_star = false;
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(n) = chars.next() {
                    pattern.push_str(&regex::escape(&n.to_string()));
                }
                prev_star = false;
            }
            '*' => {
                if !prev_star {
                    pattern.push_str(".*");
                    prev_star = true;
                }
            }
            '?' => {
                pattern.push('.');
                prev_star = false;
            }
            _ => {
                pattern.push_str(&regex::escape(&c.to_string()));
                prev_star = false;
            }
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
}
