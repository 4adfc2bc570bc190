use std::borrow::Cow;

use rowscan_api::converter::ArrayDecoder;
use rowscan_api::error::ConvertError;
use rowscan_api::mapping::ColumnBinding;
use rowscan_api::record::Record;
use rowscan_api::schema::FieldKind;
use rowscan_api::value::Value;

use crate::error::ScanError;

/// Turn a textual array payload into `Value::Array` when the destination is
/// an array field. Everything else passes through untouched.
///
/// Borrowed text stays borrowed through decoding; owned text and bytes are
/// decoded and detached.
pub fn prepare<'a>(value: Value<'a>, kind: FieldKind, decoder: &dyn ArrayDecoder) -> Result<Value<'a>, ConvertError> {
    if !kind.is_array() {
        return Ok(value);
    }
    match value {
        Value::Text(Cow::Borrowed(payload)) => decoder.decode(payload).map(Value::Array),
        Value::Text(Cow::Owned(payload)) => decoder
            .decode(&payload)
            .map(|items| Value::Array(items).into_owned()),
        Value::Bytes(bytes) => {
            let payload = std::str::from_utf8(&bytes)
                .map_err(|e| ConvertError::malformed(format!("array payload is not UTF-8: {e}")))?;
            decoder
                .decode(payload)
                .map(|items| Value::Array(items).into_owned())
        }
        other => Ok(other),
    }
}

/// Convert one column value and store it in the bound field of `target`.
pub fn convert_into<T: Record>(
    target: &mut T,
    binding: &ColumnBinding,
    value: Value<'_>,
    decoder: &dyn ArrayDecoder,
) -> Result<(), ScanError> {
    let entry = &binding.entry;
    prepare(value, entry.kind, decoder)
        .and_then(|value| target.set_field(entry.path.as_slice(), value))
        .map_err(|e| ScanError::from_convert(e, &binding.column, binding.index, entry.kind))
}
