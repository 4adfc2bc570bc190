use rowscan_api::converter::ArrayDecoder;
use rowscan_api::mapping::ColumnPlan;
use rowscan_api::record::Record;
use rowscan_api::value::Row;

use crate::convert::convert_into;
use crate::error::ScanError;

/// Write one row into `target` following `plan`.
///
/// Columns are converted left to right and the first failure is returned;
/// fields written before it keep their new values. Skipped columns and
/// unbound fields are left alone.
pub fn scan_row<T: Record>(
    plan: &ColumnPlan,
    row: Row<'_>,
    target: &mut T,
    decoder: &dyn ArrayDecoder,
) -> Result<(), ScanError> {
    if row.len() != plan.width() {
        return Err(ScanError::RowShape {
            expected: plan.width(),
            actual: row.len(),
        });
    }

    for (index, value) in row.into_values().into_iter().enumerate() {
        if let Some(binding) = plan.binding_at(index) {
            convert_into(target, binding, value, decoder)?;
        }
    }
    Ok(())
}

/// Scan one row into a fresh `T::default()`.
pub fn scan_new<T: Record>(plan: &ColumnPlan, row: Row<'_>, decoder: &dyn ArrayDecoder) -> Result<T, ScanError> {
    let mut record = T::default();
    scan_row(plan, row, &mut record, decoder)?;
    Ok(record)
}
