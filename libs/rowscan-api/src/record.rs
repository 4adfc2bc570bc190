use crate::error::ConvertError;
use crate::schema::FieldDecl;
use crate::value::Value;

/// A statically declared record type that rows can be scanned into.
///
/// Implemented by `#[derive(Record)]`. The manifest replaces runtime
/// reflection: the engine walks `fields()` once per type and then writes
/// values through `set_field` using the resulting paths.
///
/// `Default` provides the zero value a row starts from; fields without a
/// matching column keep it.
pub trait Record: Default + 'static {
    /// Declared fields in declaration order, skipped fields excluded.
    fn fields() -> &'static [FieldDecl];

    /// Convert `value` and store it in the field at `path`.
    ///
    /// `path[0]` indexes `fields()`; the rest of the path is forwarded to
    /// flattened records.
    fn set_field(&mut self, path: &[usize], value: Value<'_>) -> Result<(), ConvertError>;

    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}
