use std::future::Future;
use std::pin::Pin;

use crate::error::CursorError;
use crate::value::Row;

/// Forward-only row source owned by the database-access layer.
///
/// Stateful: one cursor must not be advanced from several threads at once.
pub trait Cursor {
    /// Column names of the result set, in row order.
    fn columns(&self) -> &[String];

    /// Move to the next row. `Ok(false)` means the result set is exhausted.
    fn advance(&mut self) -> Result<bool, CursorError>;

    /// Values of the current row, aligned with `columns()`.
    ///
    /// Only meaningful after `advance()` returned `Ok(true)`.
    fn current(&self) -> Row<'_>;
}

/// Cursor whose row fetch suspends on I/O.
///
/// Only `advance` awaits; column metadata and row values are already
/// available when it resolves.
pub trait AsyncCursor: Send {
    fn columns(&self) -> &[String];

    fn advance(&mut self) -> Pin<Box<dyn Future<Output = Result<bool, CursorError>> + Send + '_>>;

    fn current(&self) -> Row<'_>;
}
