use std::future::Future;
use std::pin::Pin;

use rowscan_api::cursor::{AsyncCursor, Cursor};
use rowscan_api::error::CursorError;
use rowscan_api::value::{Row, Value};
use serde::Deserialize;

use crate::array::json_to_value;

/// In-memory result set implementing both cursor traits.
///
/// Rows are stored owned and lent out by reference, so scanning from it
/// exercises the borrowed text path the way a driver buffer would.
#[derive(Debug, Clone, Default)]
pub struct MemoryCursor {
    columns: Vec<String>,
    rows: Vec<Vec<Value<'static>>>,
    /// Rows handed out so far; the current row is `rows[read - 1]`.
    read: usize,
    failure: Option<(usize, String)>,
}

/// `{"columns": [...], "rows": [[...], ...]}`
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ResultSet {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

impl MemoryCursor {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_row<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = Value<'static>>,
    {
        self.push_row(values);
        self
    }

    /// Rows are stored as given; a width that differs from the column
    /// count surfaces as a row shape error when scanned.
    pub fn push_row<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = Value<'static>>,
    {
        self.rows.push(values.into_iter().collect());
    }

    /// Make the advance onto row `row` (zero-based) fail with `message`.
    /// `row == len()` fails the advance that would report exhaustion.
    pub fn fail_at(mut self, row: usize, message: impl Into<String>) -> Self {
        self.failure = Some((row, message.into()));
        self
    }

    /// Load a result set from JSON. Numbers become `Int64`, `UInt64` or
    /// `Float64`, nested arrays `Array`, objects their JSON text.
    pub fn from_json(json: &str) -> Result<Self, CursorError> {
        let set: ResultSet = serde_json::from_str(json)?;
        let width = set.columns.len();
        let mut rows = Vec::with_capacity(set.rows.len());
        for (i, row) in set.rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(CursorError::new(format!(
                    "row {i} has {} values, result set has {width} columns",
                    row.len()
                )));
            }
            rows.push(row.into_iter().map(json_to_value).collect());
        }
        Ok(Self {
            columns: set.columns,
            rows,
            ..Self::default()
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows handed out so far.
    pub fn rows_read(&self) -> usize {
        self.read
    }

    pub fn remaining(&self) -> usize {
        self.rows.len() - self.read
    }

    fn step(&mut self) -> Result<bool, CursorError> {
        if let Some((at, message)) = &self.failure {
            if *at == self.read {
                return Err(CursorError::new(message.clone()));
            }
        }
        if self.read < self.rows.len() {
            self.read += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn row(&self) -> Row<'_> {
        match self.read.checked_sub(1).and_then(|i| self.rows.get(i)) {
            Some(values) => values.iter().map(Value::lend).collect(),
            None => Row::default(),
        }
    }
}

impl Cursor for MemoryCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn advance(&mut self) -> Result<bool, CursorError> {
        self.step()
    }

    fn current(&self) -> Row<'_> {
        self.row()
    }
}

impl AsyncCursor for MemoryCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn advance(&mut self) -> Pin<Box<dyn Future<Output = Result<bool, CursorError>> + Send + '_>> {
        let result = self.step();
        Box::pin(std::future::ready(result))
    }

    fn current(&self) -> Row<'_> {
        self.row()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_rows_in_order() {
        let mut cursor = MemoryCursor::new(["id", "name"])
            .with_row([Value::Int64(1), Value::from("Pliny".to_string())])
            .with_row([Value::Int64(2), Value::Null]);

        assert!(Cursor::current(&cursor).is_empty());
        assert!(Cursor::advance(&mut cursor).unwrap());
        assert_eq!(Cursor::current(&cursor).0[1], Value::from("Pliny"));
        assert!(Cursor::advance(&mut cursor).unwrap());
        assert_eq!(cursor.remaining(), 0);
        assert!(!Cursor::advance(&mut cursor).unwrap());
        assert_eq!(cursor.rows_read(), 2);
    }

    #[test]
    fn injected_failure() {
        let mut cursor = MemoryCursor::new(["id"])
            .with_row([Value::Int64(1)])
            .with_row([Value::Int64(2)])
            .fail_at(1, "connection reset");
        assert!(Cursor::advance(&mut cursor).unwrap());
        let err = Cursor::advance(&mut cursor).unwrap_err();
        assert_eq!(err.to_string(), "cursor: connection reset");
    }

    #[test]
    fn loads_json_result_set() {
        let cursor = MemoryCursor::from_json(
            r#"{"columns": ["id", "tags", "rating"], "rows": [[1, "{a,b}", 4.5], [2, ["c"], null]]}"#,
        )
        .unwrap();
        assert_eq!(Cursor::columns(&cursor), ["id", "tags", "rating"]);
        assert_eq!(cursor.len(), 2);
        assert_eq!(cursor.rows[1][1], Value::Array(vec![Value::from("c")]));
        assert_eq!(cursor.rows[1][2], Value::Null);
    }

    #[test]
    fn rejects_ragged_or_invalid_json() {
        let err = MemoryCursor::from_json(r#"{"columns": ["a", "b"], "rows": [[1]]}"#).unwrap_err();
        assert!(err.to_string().contains("row 0 has 1 values"), "{err}");
        assert!(MemoryCursor::from_json("not json").is_err());
    }

    #[tokio::test]
    async fn async_advance_resolves_immediately() {
        let mut cursor = MemoryCursor::new(["id"]).with_row([Value::Int64(9)]);
        assert!(AsyncCursor::advance(&mut cursor).await.unwrap());
        assert_eq!(AsyncCursor::current(&cursor).0, [Value::Int64(9)]);
        assert!(!AsyncCursor::advance(&mut cursor).await.unwrap());
    }
}
