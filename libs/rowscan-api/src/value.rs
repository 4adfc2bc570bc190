use std::borrow::Cow;
use std::fmt;

/// Raw column value as delivered by a cursor.
///
/// Strategy by type:
/// - Scalars (Int64, UInt64, Float, Bool): already decoded by the driver
/// - Decimal: `(value, scale)`, kept exact until the target field decides
/// - Text, Bytes: `Cow` (zero-copy when the driver can lend its buffer)
/// - Array: driver-native arrays, elements already split
///
/// Textual array payloads (`{a,b,c}`) arrive as `Text` and are decoded by an
/// `ArrayDecoder` once the target field is known to be an array.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    /// `(value, scale)`: `Decimal(12345, 2)` is `123.45`.
    Decimal(i128, u8),

    Text(Cow<'a, str>),
    /// Opaque binary data, not necessarily UTF-8.
    Bytes(Cow<'a, [u8]>),

    /// Recursive, elements converted individually.
    Array(Vec<Value<'a>>),

    Null,
}

impl<'a> Value<'a> {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the representation, used in mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int64(_) => "int64",
            Value::UInt64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Bool(_) => "bool",
            Value::Decimal(..) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Null => "null",
        }
    }

    /// Human-readable description of the value, e.g. `text "abc"`.
    ///
    /// Long text is cut at 48 characters.
    pub fn describe(&self) -> String {
        match self {
            Value::Text(s) => {
                let mut shown: String = s.chars().take(48).collect();
                if shown.len() < s.len() {
                    shown.push_str("...");
                }
                format!("text {shown:?}")
            }
            Value::Bytes(b) => format!("bytes (len {})", b.len()),
            Value::Array(items) => format!("array (len {})", items.len()),
            Value::Null => "null".to_string(),
            other => format!("{} {other}", other.type_name()),
        }
    }

    /// Borrowing view of the value: text and bytes point into `self`.
    pub fn lend(&self) -> Value<'_> {
        match self {
            Value::Text(s) => Value::Text(Cow::Borrowed(s.as_ref())),
            Value::Bytes(b) => Value::Bytes(Cow::Borrowed(b.as_ref())),
            Value::Array(items) => Value::Array(items.iter().map(Value::lend).collect()),
            other => other.clone(),
        }
    }

    /// Detach from any borrowed driver buffer.
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Int64(v) => Value::Int64(v),
            Value::UInt64(v) => Value::UInt64(v),
            Value::Float32(v) => Value::Float32(v),
            Value::Float64(v) => Value::Float64(v),
            Value::Bool(v) => Value::Bool(v),
            Value::Decimal(v, s) => Value::Decimal(v, s),
            Value::Text(s) => Value::Text(Cow::Owned(s.into_owned())),
            Value::Bytes(b) => Value::Bytes(Cow::Owned(b.into_owned())),
            Value::Array(items) => Value::Array(items.into_iter().map(Value::into_owned).collect()),
            Value::Null => Value::Null,
        }
    }
}

/// Renders scalars in their canonical textual form.
///
/// `Text` is written verbatim, `Bytes` as lowercase hex, arrays as
/// `[a, b]`.
impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Decimal(v, scale) => f.write_str(&format_decimal(*v, *scale)),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => {
                for byte in b.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Null => f.write_str("NULL"),
        }
    }
}

pub(crate) fn format_decimal(value: i128, scale: u8) -> String {
    if scale == 0 {
        return value.to_string();
    }
    let digits = value.unsigned_abs().to_string();
    let scale = scale as usize;
    let padded = if digits.len() <= scale {
        format!("{}{digits}", "0".repeat(scale - digits.len() + 1))
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    let sign = if value < 0 { "-" } else { "" };
    format!("{sign}{int_part}.{frac_part}")
}

impl From<i64> for Value<'_> {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i32> for Value<'_> {
    fn from(v: i32) -> Self {
        Value::Int64(v as i64)
    }
}

impl From<u64> for Value<'_> {
    fn from(v: u64) -> Self {
        Value::UInt64(v)
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Text(Cow::Borrowed(v))
    }
}

impl From<String> for Value<'_> {
    fn from(v: String) -> Self {
        Value::Text(Cow::Owned(v))
    }
}

impl<'a> From<Vec<Value<'a>>> for Value<'a> {
    fn from(v: Vec<Value<'a>>) -> Self {
        Value::Array(v)
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Positional array of values for one row. Order matches the cursor's
/// column names.
///
/// Values only, no names or types: all metadata lives in `ColumnPlan`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row<'a>(pub Vec<Value<'a>>);

impl<'a> Row<'a> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<Value<'a>> {
        self.0
    }
}

impl<'a> FromIterator<Value<'a>> for Row<'a> {
    fn from_iter<I: IntoIterator<Item = Value<'a>>>(iter: I) -> Self {
        Row(iter.into_iter().collect())
    }
}
