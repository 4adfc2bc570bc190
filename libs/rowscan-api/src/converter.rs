use crate::error::ConvertError;
use crate::value::Value;

/// Decoder for textual array payloads.
///
/// Drivers disagree on how array columns reach the client: some hand over
/// native arrays (`Value::Array`, no decoding needed), others the server's
/// text form (`{a,b,c}`), others JSON. The engine picks one decoder per
/// scanner and applies it only to columns bound to array fields.
///
/// Elements come back as raw values (usually `Text` or `Null`) and are then
/// converted one by one with the element type's `FromValue` rule. Nested
/// arrays decode into nested `Value::Array`.
pub trait ArrayDecoder: Send + Sync {
    /// Name for logs.
    fn name(&self) -> &'static str;

    fn decode<'a>(&self, payload: &'a str) -> Result<Vec<Value<'a>>, ConvertError>;
}
