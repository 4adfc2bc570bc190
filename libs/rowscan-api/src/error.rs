use std::fmt;

use crate::schema::FieldKind;
use crate::value::Value;

/// Failure converting one raw value into a field.
///
/// Carries no column context: the engine attaches column name and index
/// when it turns this into a scan error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertError {
    /// Null arrived for a type that cannot represent absence.
    Null,
    /// The raw representation cannot become the expected kind.
    Mismatch { expected: FieldKind, actual: String },
    /// An array element failed. `index` is its position in the enclosing
    /// array; `source` may itself be an `Element` for nested arrays.
    Element {
        index: usize,
        source: Box<ConvertError>,
    },
    /// Array payload could not be decoded.
    Malformed { reason: String },
    /// The field path does not lead to a field of the record.
    Path(Vec<usize>),
}

impl ConvertError {
    pub fn mismatch(expected: FieldKind, actual: &Value<'_>) -> Self {
        Self::Mismatch {
            expected,
            actual: actual.describe(),
        }
    }

    /// Mismatch with a free-form description of what was found.
    pub fn mismatch_msg(expected: FieldKind, actual: impl Into<String>) -> Self {
        Self::Mismatch {
            expected,
            actual: actual.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub fn at_element(self, index: usize) -> Self {
        Self::Element {
            index,
            source: Box::new(self),
        }
    }

    /// Element indices from the outermost array inwards, plus the innermost
    /// non-element error.
    pub fn split_element_path(&self) -> (Vec<usize>, &ConvertError) {
        let mut path = Vec::new();
        let mut current = self;
        while let ConvertError::Element { index, source } = current {
            path.push(*index);
            current = source.as_ref();
        }
        (path, current)
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::Null => write!(f, "null not allowed"),
            ConvertError::Mismatch { expected, actual } => {
                write!(f, "expected {expected}, got {actual}")
            }
            ConvertError::Element { index, source } => write!(f, "element [{index}]: {source}"),
            ConvertError::Malformed { reason } => write!(f, "malformed array payload: {reason}"),
            ConvertError::Path(path) => write!(f, "no field at path {path:?}"),
        }
    }
}

impl std::error::Error for ConvertError {}

/// Error raised by a cursor implementation.
///
/// The scanner never inspects or retries these; they reach the caller
/// unchanged.
#[derive(Debug)]
pub struct CursorError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CursorError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            source: None,
        }
    }

    pub fn with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Add context to the error, preserving the source.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            message: format!("{ctx}: {}", self.message),
            source: self.source,
        }
    }
}

impl fmt::Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "cursor: {}: {source}", self.message),
            None => write!(f, "cursor: {}", self.message),
        }
    }
}

impl std::error::Error for CursorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for CursorError {
    fn from(e: std::io::Error) -> Self {
        Self::with_source("io", e)
    }
}

impl From<serde_json::Error> for CursorError {
    fn from(e: serde_json::Error) -> Self {
        Self::with_source("invalid result set", e)
    }
}
