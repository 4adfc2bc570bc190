use rowscan_api::error::{ConvertError, CursorError};
use rowscan_api::schema::FieldKind;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("unsupported record type {type_name}: {reason}")]
    UnsupportedType { type_name: String, reason: String },

    #[error("duplicate tag '{tag}' in {type_name}: fields '{first}' and '{second}'")]
    DuplicateTag {
        type_name: String,
        tag: String,
        first: String,
        second: String,
    },

    #[error("field '{field}' of {type_name} has no tag")]
    MissingTag { type_name: String, field: String },

    #[error("column '{column}' (#{index}) has no matching field")]
    UnknownColumn { column: String, index: usize },

    #[error("column '{column}' appears twice (#{first} and #{second})")]
    DuplicateColumn {
        column: String,
        first: usize,
        second: usize,
    },

    #[error("required column '{tag}' is missing from the result set")]
    MissingRequiredColumn { tag: String },

    #[error("column '{column}' (#{index}){}: expected {expected}, got {actual}", element_suffix(.element))]
    TypeMismatch {
        column: String,
        index: usize,
        expected: FieldKind,
        actual: String,
        /// Element indices when the failure is inside an array, outermost
        /// first.
        element: Vec<usize>,
    },

    #[error("column '{column}' (#{index}){}: null not allowed", element_suffix(.element))]
    NullNotAllowed {
        column: String,
        index: usize,
        element: Vec<usize>,
    },

    #[error("column '{column}' is bound to path {path:?}, which the record does not have")]
    InvalidFieldPath { column: String, path: Vec<usize> },

    #[error("row has {actual} values but the result set has {expected} columns")]
    RowShape { expected: usize, actual: usize },

    #[error("no rows in result set")]
    NoRows,

    #[error("expected exactly one row, result set has more")]
    MultipleRows,

    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error("config error: {0}")]
    Config(String),
}

fn element_suffix(element: &[usize]) -> String {
    element.iter().map(|i| format!("[{i}]")).collect()
}

impl ScanError {
    /// Attach column context to a conversion failure.
    ///
    /// `kind` is the declared kind of the field, reported for malformed
    /// array payloads.
    pub fn from_convert(err: ConvertError, column: &str, index: usize, kind: FieldKind) -> Self {
        let (element, innermost) = err.split_element_path();
        match innermost {
            ConvertError::Null => ScanError::NullNotAllowed {
                column: column.to_string(),
                index,
                element,
            },
            ConvertError::Mismatch { expected, actual } => ScanError::TypeMismatch {
                column: column.to_string(),
                index,
                expected: *expected,
                actual: actual.clone(),
                element,
            },
            ConvertError::Malformed { reason } => ScanError::TypeMismatch {
                column: column.to_string(),
                index,
                expected: kind,
                actual: format!("malformed array payload ({reason})"),
                element,
            },
            ConvertError::Path(path) => ScanError::InvalidFieldPath {
                column: column.to_string(),
                path: path.clone(),
            },
            // split_element_path never stops on an element
            ConvertError::Element { .. } => ScanError::TypeMismatch {
                column: column.to_string(),
                index,
                expected: kind,
                actual: err.to_string(),
                element,
            },
        }
    }

    /// Data errors confined to one row. Everything else is structural or
    /// comes from the cursor and always aborts a scan.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            ScanError::TypeMismatch { .. } | ScanError::NullNotAllowed { .. }
        )
    }
}

/// A row skipped under `rows = "skip_row"`.
#[derive(Debug, thiserror::Error)]
#[error("row {row}: {error}")]
pub struct RowError {
    /// Zero-based position of the row in the result set.
    pub row: u64,
    #[source]
    pub error: ScanError,
}
