use std::ops::Deref;

use crate::error::ConvertError;
use crate::schema::{FieldKind, ScalarKind};
use crate::value::Value;

/// Conversion from a raw column value into a field type.
///
/// Rules are total and exact: every `Value` variant either converts or
/// yields an error, and nothing is truncated (`"12abc"` is not `12`,
/// `2.5` is not `2`).
///
/// Array payloads in textual form are decoded by the engine before they
/// reach this trait; `Vec<T>` only accepts `Value::Array`.
pub trait FromValue: Sized {
    /// Kind recorded in the type's manifest.
    const KIND: FieldKind;
    /// Whether `Value::Null` converts to an absent value.
    const NULLABLE: bool = false;

    fn from_value(value: Value<'_>) -> Result<Self, ConvertError>;
}

const INT: FieldKind = FieldKind::Scalar(ScalarKind::Int);
const FLOAT: FieldKind = FieldKind::Scalar(ScalarKind::Float);
const BOOL: FieldKind = FieldKind::Scalar(ScalarKind::Bool);
const TEXT: FieldKind = FieldKind::Scalar(ScalarKind::Text);
const BYTES: FieldKind = FieldKind::Scalar(ScalarKind::Bytes);

// ---------------------------------------------------------------------------
// Integers
// ---------------------------------------------------------------------------

fn to_i128(value: &Value<'_>) -> Result<i128, ConvertError> {
    match value {
        Value::Int64(v) => Ok(*v as i128),
        Value::UInt64(v) => Ok(*v as i128),
        Value::Float32(v) => integral_float(*v as f64, value),
        Value::Float64(v) => integral_float(*v, value),
        Value::Decimal(v, scale) => {
            let divisor = 10i128
                .checked_pow(*scale as u32)
                .ok_or_else(|| ConvertError::mismatch(INT, value))?;
            if v % divisor == 0 {
                Ok(v / divisor)
            } else {
                Err(ConvertError::mismatch(INT, value))
            }
        }
        Value::Text(s) => s.parse::<i128>().map_err(|_| ConvertError::mismatch(INT, value)),
        Value::Null => Err(ConvertError::Null),
        other => Err(ConvertError::mismatch(INT, other)),
    }
}

fn integral_float(v: f64, value: &Value<'_>) -> Result<i128, ConvertError> {
    // i128 covers every integral f64 below 2^127.
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1.7e38 {
        Ok(v as i128)
    } else {
        Err(ConvertError::mismatch(INT, value))
    }
}

macro_rules! int_from_value {
    ($($ty:ty),*) => {$(
        impl FromValue for $ty {
            const KIND: FieldKind = INT;

            fn from_value(value: Value<'_>) -> Result<Self, ConvertError> {
                let wide = to_i128(&value)?;
                <$ty>::try_from(wide).map_err(|_| {
                    ConvertError::mismatch_msg(
                        INT,
                        format!("{} (out of range for {})", value.describe(), stringify!($ty)),
                    )
                })
            }
        }
    )*};
}

// `u8` is left out so `Vec<u8>` is not mistaken for a byte column; use `Blob`.
int_from_value!(i8, i16, i32, i64, u16, u32, u64);

// ---------------------------------------------------------------------------
// Floats
// ---------------------------------------------------------------------------

fn to_f64(value: &Value<'_>) -> Result<f64, ConvertError> {
    match value {
        Value::Int64(v) => Ok(*v as f64),
        Value::UInt64(v) => Ok(*v as f64),
        Value::Float32(v) => Ok(*v as f64),
        Value::Float64(v) => Ok(*v),
        Value::Decimal(v, scale) => Ok(*v as f64 / 10f64.powi(*scale as i32)),
        Value::Text(s) => s.parse::<f64>().map_err(|_| ConvertError::mismatch(FLOAT, value)),
        Value::Null => Err(ConvertError::Null),
        other => Err(ConvertError::mismatch(FLOAT, other)),
    }
}

impl FromValue for f64 {
    const KIND: FieldKind = FLOAT;

    fn from_value(value: Value<'_>) -> Result<Self, ConvertError> {
        to_f64(&value)
    }
}

impl FromValue for f32 {
    const KIND: FieldKind = FLOAT;

    fn from_value(value: Value<'_>) -> Result<Self, ConvertError> {
        if let Value::Float32(v) = value {
            return Ok(v);
        }
        let wide = to_f64(&value)?;
        let narrow = wide as f32;
        if wide.is_finite() && narrow.is_infinite() {
            return Err(ConvertError::mismatch_msg(
                FLOAT,
                format!("{} (out of range for f32)", value.describe()),
            ));
        }
        Ok(narrow)
    }
}

// ---------------------------------------------------------------------------
// Bool
// ---------------------------------------------------------------------------

const TRUE_LITERALS: &[&str] = &["t", "true", "y", "yes", "on", "1"];
const FALSE_LITERALS: &[&str] = &["f", "false", "n", "no", "off", "0"];

impl FromValue for bool {
    const KIND: FieldKind = BOOL;

    fn from_value(value: Value<'_>) -> Result<Self, ConvertError> {
        match &value {
            Value::Bool(b) => Ok(*b),
            Value::Int64(0) | Value::UInt64(0) => Ok(false),
            Value::Int64(1) | Value::UInt64(1) => Ok(true),
            Value::Text(s) => {
                if TRUE_LITERALS.iter().any(|l| s.eq_ignore_ascii_case(l)) {
                    Ok(true)
                } else if FALSE_LITERALS.iter().any(|l| s.eq_ignore_ascii_case(l)) {
                    Ok(false)
                } else {
                    Err(ConvertError::mismatch(BOOL, &value))
                }
            }
            Value::Null => Err(ConvertError::Null),
            other => Err(ConvertError::mismatch(BOOL, other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Text and bytes
// ---------------------------------------------------------------------------

impl FromValue for String {
    const KIND: FieldKind = TEXT;

    fn from_value(value: Value<'_>) -> Result<Self, ConvertError> {
        match value {
            Value::Text(s) => Ok(s.into_owned()),
            Value::Bytes(b) => String::from_utf8(b.into_owned())
                .map_err(|_| ConvertError::mismatch_msg(TEXT, "bytes (invalid UTF-8)")),
            Value::Null => Err(ConvertError::Null),
            Value::Array(_) => Err(ConvertError::mismatch(TEXT, &value)),
            scalar => Ok(scalar.to_string()),
        }
    }
}

/// Binary column contents (`bytea`, `blob`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash, serde::Serialize)]
pub struct Blob(pub Vec<u8>);

impl Deref for Blob {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl FromValue for Blob {
    const KIND: FieldKind = BYTES;

    fn from_value(value: Value<'_>) -> Result<Self, ConvertError> {
        match value {
            Value::Bytes(b) => Ok(Blob(b.into_owned())),
            Value::Text(s) => Ok(Blob(s.into_owned().into_bytes())),
            Value::Null => Err(ConvertError::Null),
            other => Err(ConvertError::mismatch(BYTES, &other)),
        }
    }
}

/// `json` / `jsonb` columns. SQL `NULL` becomes JSON `null`.
impl FromValue for serde_json::Value {
    const KIND: FieldKind = TEXT;
    const NULLABLE: bool = true;

    fn from_value(value: Value<'_>) -> Result<Self, ConvertError> {
        let invalid = |e: serde_json::Error| ConvertError::mismatch_msg(TEXT, format!("invalid JSON ({e})"));
        match value {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Bool(b) => Ok(serde_json::Value::Bool(b)),
            Value::Int64(v) => Ok(v.into()),
            Value::UInt64(v) => Ok(v.into()),
            Value::Float32(v) => json_float(v as f64, &value),
            Value::Float64(v) => json_float(v, &value),
            Value::Decimal(..) => serde_json::from_str(&value.to_string()).map_err(invalid),
            Value::Text(s) => serde_json::from_str(&s).map_err(invalid),
            Value::Bytes(b) => serde_json::from_slice(&b).map_err(invalid),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| Self::from_value(item).map_err(|e| e.at_element(i)))
                .collect::<Result<Vec<_>, _>>()
                .map(serde_json::Value::Array),
        }
    }
}

fn json_float(v: f64, value: &Value<'_>) -> Result<serde_json::Value, ConvertError> {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .ok_or_else(|| ConvertError::mismatch(TEXT, value))
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

impl<T: FromValue> FromValue for Option<T> {
    const KIND: FieldKind = T::KIND;
    const NULLABLE: bool = true;

    fn from_value(value: Value<'_>) -> Result<Self, ConvertError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

/// Array columns. An empty array is an empty vector; `NULL` is an error
/// unless the field is `Option<Vec<T>>`.
impl<T: FromValue> FromValue for Vec<T> {
    const KIND: FieldKind = FieldKind::array_of(T::KIND);

    fn from_value(value: Value<'_>) -> Result<Self, ConvertError> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| T::from_value(item).map_err(|e| e.at_element(i)))
                .collect(),
            Value::Null => Err(ConvertError::Null),
            other => Err(ConvertError::mismatch(Self::KIND, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value<'_> {
        Value::from(s)
    }

    #[test]
    fn bool_accepts_fixed_literal_set() {
        for lit in ["t", "TRUE", "Yes", "on", "1"] {
            assert!(bool::from_value(text(lit)).unwrap(), "{lit}");
        }
        for lit in ["f", "False", "NO", "off", "0"] {
            assert!(!bool::from_value(text(lit)).unwrap(), "{lit}");
        }
        assert!(bool::from_value(text("maybe")).is_err());
        assert!(bool::from_value(Value::Int64(2)).is_err());
        assert!(bool::from_value(Value::Int64(1)).unwrap());
    }

    #[test]
    fn integer_parsing_is_exact() {
        assert_eq!(i64::from_value(text("42")).unwrap(), 42);
        assert_eq!(i64::from_value(text("-7")).unwrap(), -7);
        assert!(matches!(
            i64::from_value(text("12abc")),
            Err(ConvertError::Mismatch { .. })
        ));
        assert!(i64::from_value(text(" 12")).is_err());
        assert!(i64::from_value(text("1.5")).is_err());
    }

    #[test]
    fn integer_from_float_requires_integral_value() {
        assert_eq!(i32::from_value(Value::Float64(2.0)).unwrap(), 2);
        assert!(i32::from_value(Value::Float64(2.5)).is_err());
        assert!(i32::from_value(Value::Float64(f64::NAN)).is_err());
    }

    #[test]
    fn integer_range_is_checked() {
        assert_eq!(i16::from_value(Value::Int64(32_767)).unwrap(), 32_767);
        let err = i16::from_value(Value::Int64(40_000)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected int, got int64 40000 (out of range for i16)"
        );
        assert!(u32::from_value(Value::Int64(-1)).is_err());
    }

    #[test]
    fn decimal_converts_only_without_fraction() {
        assert_eq!(i64::from_value(Value::Decimal(1200, 2)).unwrap(), 12);
        assert!(i64::from_value(Value::Decimal(1234, 2)).is_err());
        assert!((f64::from_value(Value::Decimal(1234, 2)).unwrap() - 12.34).abs() < 1e-12);
    }

    #[test]
    fn float_from_text_and_numbers() {
        assert_eq!(f64::from_value(text("4.5")).unwrap(), 4.5);
        assert_eq!(f64::from_value(Value::Int64(3)).unwrap(), 3.0);
        assert!(f64::from_value(text("4.5x")).is_err());
        assert!(f64::from_value(Value::Bool(true)).is_err());
    }

    #[test]
    fn f32_rejects_values_beyond_its_range() {
        assert_eq!(f32::from_value(Value::Float64(1.5)).unwrap(), 1.5);
        assert_eq!(f32::from_value(Value::Float64(f64::INFINITY)).unwrap(), f32::INFINITY);

        let err = f32::from_value(Value::Float64(1e300)).unwrap_err();
        assert!(err.to_string().starts_with("expected float, got float64 1000"), "{err}");
        assert!(err.to_string().ends_with("(out of range for f32)"), "{err}");
        let err = f32::from_value(text("1e300")).unwrap_err();
        assert!(err.to_string().ends_with("(out of range for f32)"), "{err}");
    }

    #[test]
    fn string_renders_scalars() {
        assert_eq!(String::from_value(Value::Int64(5)).unwrap(), "5");
        assert_eq!(String::from_value(Value::Decimal(450, 2)).unwrap(), "4.50");
        assert_eq!(String::from_value(Value::Bool(true)).unwrap(), "true");
        assert!(String::from_value(Value::Bytes(vec![0xff, 0xfe].into())).is_err());
        assert!(String::from_value(Value::Array(vec![])).is_err());
    }

    #[test]
    fn null_handling() {
        assert_eq!(i64::from_value(Value::Null), Err(ConvertError::Null));
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(Value::Int64(3)).unwrap(), Some(3));
        assert_eq!(Vec::<String>::from_value(Value::Null), Err(ConvertError::Null));
        assert_eq!(Option::<Vec<String>>::from_value(Value::Null).unwrap(), None);
    }

    #[test]
    fn array_elements_convert_individually() {
        let arr = Value::Array(vec![text("1"), text("2"), text("x")]);
        let err = Vec::<i64>::from_value(arr).unwrap_err();
        let (path, innermost) = err.split_element_path();
        assert_eq!(path, vec![2]);
        assert!(matches!(innermost, ConvertError::Mismatch { .. }));

        let empty = Vec::<String>::from_value(Value::Array(vec![])).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn array_rejects_undecoded_payload() {
        let err = Vec::<String>::from_value(text("{a,b}")).unwrap_err();
        assert_eq!(err.to_string(), "expected text[], got text \"{a,b}\"");
    }

    #[test]
    fn nested_array_kind() {
        assert_eq!(<Vec<Vec<i64>> as FromValue>::KIND.to_string(), "int[][]");
        assert!(<Option<Vec<String>> as FromValue>::NULLABLE);
        assert!(!<Vec<Option<String>> as FromValue>::NULLABLE);
    }

    #[test]
    fn json_columns() {
        let v = serde_json::Value::from_value(text(r#"{"abv": 6.2}"#)).unwrap();
        assert_eq!(v["abv"], serde_json::json!(6.2));
        assert_eq!(serde_json::Value::from_value(Value::Null).unwrap(), serde_json::Value::Null);
        assert!(serde_json::Value::from_value(text("{oops")).is_err());
    }

    #[test]
    fn blob_from_bytes_or_text() {
        assert_eq!(&*Blob::from_value(Value::Bytes(vec![1, 2].into())).unwrap(), &[1, 2]);
        assert_eq!(&*Blob::from_value(text("ab")).unwrap(), b"ab");
        assert!(Blob::from_value(Value::Int64(1)).is_err());
    }
}
