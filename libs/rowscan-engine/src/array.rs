use std::borrow::Cow;
use std::sync::Arc;

use rowscan_api::converter::ArrayDecoder;
use rowscan_api::error::ConvertError;
use rowscan_api::value::Value;

use crate::config::{ArrayFormat, ScanConfig};

/// Decoder selected by `arrays` / `array_delimiter`.
pub fn decoder_for(config: &ScanConfig) -> Arc<dyn ArrayDecoder> {
    match config.arrays {
        ArrayFormat::PgText => Arc::new(PgTextArrayDecoder::new(config.array_delimiter)),
        ArrayFormat::Json => Arc::new(JsonArrayDecoder),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Postgres text array literal
// ═══════════════════════════════════════════════════════════════

/// Decodes the Postgres text form of an array: `{a,"b c",NULL,{1,2}}`.
///
/// - elements are separated by the delimiter (`,` for nearly every type)
/// - double-quoted elements may contain anything; `\` escapes the next char
/// - unquoted `NULL` (any case) is a null element, `"NULL"` is the text
/// - whitespace around unquoted elements is ignored
/// - a leading dimension decoration (`[0:2]={...}`) is accepted and dropped
///
/// Elements without escapes borrow from the payload.
#[derive(Debug, Clone)]
pub struct PgTextArrayDecoder {
    delimiter: char,
}

impl PgTextArrayDecoder {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }
}

const DEFAULT_DELIMITER: char = ',';

impl Default for PgTextArrayDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl ArrayDecoder for PgTextArrayDecoder {
    fn name(&self) -> &'static str {
        "pg_text"
    }

    fn decode<'a>(&self, payload: &'a str) -> Result<Vec<Value<'a>>, ConvertError> {
        let body = strip_dimensions(payload.trim())?;
        let mut parser = PgParser {
            src: body,
            pos: 0,
            delimiter: self.delimiter,
        };
        let items = parser.array()?;
        parser.skip_ws();
        if parser.pos != body.len() {
            return Err(ConvertError::malformed(format!(
                "unexpected trailing input at offset {}",
                parser.pos
            )));
        }
        Ok(items)
    }
}

fn strip_dimensions(payload: &str) -> Result<&str, ConvertError> {
    if !payload.starts_with('[') {
        return Ok(payload);
    }
    match payload.find('=') {
        Some(eq) => Ok(payload[eq + 1..].trim_start()),
        None => Err(ConvertError::malformed("dimension decoration without '='")),
    }
}

struct PgParser<'a> {
    src: &'a str,
    pos: usize,
    delimiter: char,
}

impl<'a> PgParser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.bump(c);
        }
    }

    fn unexpected(&self, what: &str) -> ConvertError {
        match self.peek() {
            Some(c) => ConvertError::malformed(format!("expected {what}, found {c:?} at offset {}", self.pos)),
            None => ConvertError::malformed(format!("expected {what}, found end of input")),
        }
    }

    fn array(&mut self) -> Result<Vec<Value<'a>>, ConvertError> {
        if self.peek() != Some('{') {
            return Err(self.unexpected("'{'"));
        }
        self.bump('{');
        self.skip_ws();

        let mut items = Vec::new();
        if self.peek() == Some('}') {
            self.bump('}');
            return Ok(items);
        }

        loop {
            self.skip_ws();
            let item = match self.peek() {
                Some('{') => Value::Array(self.array()?),
                Some('"') => self.quoted()?,
                Some(_) => self.unquoted()?,
                None => return Err(self.unexpected("array element")),
            };
            items.push(item);

            self.skip_ws();
            match self.peek() {
                Some(c) if c == self.delimiter => self.bump(c),
                Some('}') => {
                    self.bump('}');
                    return Ok(items);
                }
                _ => return Err(self.unexpected("delimiter or '}'")),
            }
        }
    }

    fn quoted(&mut self) -> Result<Value<'a>, ConvertError> {
        self.bump('"');
        let start = self.pos;
        let mut owned: Option<String> = None;

        loop {
            match self.peek() {
                Some('"') => {
                    let text = match owned {
                        Some(s) => Cow::Owned(s),
                        None => Cow::Borrowed(&self.src[start..self.pos]),
                    };
                    self.bump('"');
                    return Ok(Value::Text(text));
                }
                Some('\\') => {
                    let buf = owned.get_or_insert_with(|| self.src[start..self.pos].to_string());
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => {
                            buf.push(c);
                            self.bump(c);
                        }
                        None => return Err(ConvertError::malformed("unterminated escape")),
                    }
                }
                Some(c) => {
                    if let Some(buf) = owned.as_mut() {
                        buf.push(c);
                    }
                    self.bump(c);
                }
                None => return Err(ConvertError::malformed("unterminated quoted element")),
            }
        }
    }

    fn unquoted(&mut self) -> Result<Value<'a>, ConvertError> {
        let start = self.pos;
        let mut owned: Option<String> = None;
        // bytes of `owned` up to and including the last escaped char
        let mut kept = 0;

        while let Some(c) = self.peek() {
            if c == self.delimiter || c == '}' {
                break;
            }
            match c {
                '{' | '"' => return Err(self.unexpected("element character")),
                '\\' => {
                    let buf = owned.get_or_insert_with(|| self.src[start..self.pos].to_string());
                    self.pos += 1;
                    match self.peek() {
                        Some(escaped) => {
                            buf.push(escaped);
                            kept = buf.len();
                            self.bump(escaped);
                        }
                        None => return Err(ConvertError::malformed("unterminated escape")),
                    }
                }
                _ => {
                    if let Some(buf) = owned.as_mut() {
                        buf.push(c);
                    }
                    self.bump(c);
                }
            }
        }

        match owned {
            Some(mut s) => {
                // escaped trailing whitespace is data
                let end = kept + s[kept..].trim_end().len();
                s.truncate(end);
                Ok(Value::Text(Cow::Owned(s)))
            }
            None => {
                let text = self.src[start..self.pos].trim_end();
                if text.is_empty() {
                    Err(ConvertError::malformed(format!("empty element at offset {start}")))
                } else if text.eq_ignore_ascii_case("NULL") {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Text(Cow::Borrowed(text)))
                }
            }
        }
    }
}

/// Render values as a Postgres text array literal with the `,` delimiter.
pub fn encode_pg_array(items: &[Value<'_>]) -> String {
    encode_pg_array_with(items, DEFAULT_DELIMITER)
}

/// Render values as a Postgres text array literal separated by `delimiter`.
///
/// Elements are quoted only when they would otherwise be misread: empty,
/// containing the delimiter, braces, quotes, backslashes or whitespace, or
/// spelling `NULL`. Nested arrays use the same delimiter.
pub fn encode_pg_array_with(items: &[Value<'_>], delimiter: char) -> String {
    let mut out = String::from("{");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        match item {
            Value::Null => out.push_str("NULL"),
            Value::Array(inner) => out.push_str(&encode_pg_array_with(inner, delimiter)),
            scalar => push_pg_element(&mut out, &scalar.to_string(), delimiter),
        }
    }
    out.push('}');
    out
}

fn push_pg_element(out: &mut String, text: &str, delimiter: char) {
    let needs_quotes = text.is_empty()
        || text.eq_ignore_ascii_case("NULL")
        || text
            .chars()
            .any(|c| c == delimiter || matches!(c, '{' | '}' | '"' | '\\') || c.is_whitespace());
    if !needs_quotes {
        out.push_str(text);
        return;
    }
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

// ═══════════════════════════════════════════════════════════════
//  JSON arrays
// ═══════════════════════════════════════════════════════════════

/// Decodes JSON array payloads (`["a", 1, null, [2, 3]]`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonArrayDecoder;

impl ArrayDecoder for JsonArrayDecoder {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode<'a>(&self, payload: &'a str) -> Result<Vec<Value<'a>>, ConvertError> {
        match serde_json::from_str::<serde_json::Value>(payload) {
            Ok(serde_json::Value::Array(items)) => Ok(items.into_iter().map(json_to_value).collect()),
            Ok(other) => Err(ConvertError::malformed(format!("expected JSON array, got {other}"))),
            Err(e) => Err(ConvertError::malformed(e.to_string())),
        }
    }
}

/// Map a JSON value onto the raw value model.
///
/// Objects have no raw counterpart and are kept as their JSON text.
pub fn json_to_value(value: serde_json::Value) -> Value<'static> {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt64(u)
            } else {
                n.as_f64().map_or(Value::Null, Value::Float64)
            }
        }
        serde_json::Value::String(s) => Value::Text(Cow::Owned(s)),
        serde_json::Value::Array(items) => Value::Array(items.into_iter().map(json_to_value).collect()),
        object @ serde_json::Value::Object(_) => Value::Text(Cow::Owned(object.to_string())),
    }
}
