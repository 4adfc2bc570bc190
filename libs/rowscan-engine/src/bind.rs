use rowscan_api::mapping::{ColumnBinding, ColumnPlan, TypeMap};

use crate::config::ColumnPolicy;
use crate::error::ScanError;

/// Route each result column to the field whose tag equals its name.
///
/// Matching is exact and case-sensitive. A column without a field fails in
/// strict mode and is skipped in lenient mode; a field claimed by two
/// columns always fails. Every `required` field must be claimed.
pub fn bind(type_map: &TypeMap, columns: &[String], policy: ColumnPolicy) -> Result<ColumnPlan, ScanError> {
    let mut bindings = Vec::with_capacity(columns.len());
    // entry index → column that claimed it
    let mut claimed: Vec<Option<usize>> = vec![None; type_map.len()];

    for (index, column) in columns.iter().enumerate() {
        let Some((entry_idx, entry)) = type_map.lookup(column) else {
            match policy {
                ColumnPolicy::Strict => {
                    return Err(ScanError::UnknownColumn {
                        column: column.clone(),
                        index,
                    });
                }
                ColumnPolicy::Lenient => {
                    tracing::trace!(record = %type_map.type_name(), column = %column, index, "no field for column, skipping");
                    continue;
                }
            }
        };

        if let Some(first) = claimed[entry_idx] {
            return Err(ScanError::DuplicateColumn {
                column: column.clone(),
                first,
                second: index,
            });
        }
        claimed[entry_idx] = Some(index);
        bindings.push(ColumnBinding {
            index,
            column: column.clone(),
            entry: entry.clone(),
        });
    }

    if let Some(entry) = type_map
        .entries()
        .iter()
        .zip(&claimed)
        .find_map(|(entry, slot)| (entry.required && slot.is_none()).then_some(entry))
    {
        return Err(ScanError::MissingRequiredColumn {
            tag: entry.tag.clone(),
        });
    }

    Ok(ColumnPlan::new(type_map.type_name(), columns.to_vec(), bindings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TagPolicy;
    use crate::reflect::reflect;
    use rowscan_api::Record;

    #[derive(Debug, Default, Record)]
    struct Beer {
        #[scan(tag = "id", required)]
        id: i64,
        #[scan(tag = "name")]
        name: String,
        #[scan(tag = "tags")]
        tags: Vec<String>,
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn beer_map() -> TypeMap {
        reflect::<Beer>(TagPolicy::FieldName).unwrap()
    }

    #[test]
    fn binds_in_column_order() {
        let plan = bind(&beer_map(), &columns(&["tags", "id", "name"]), ColumnPolicy::Strict).unwrap();
        assert_eq!(plan.width(), 3);
        assert_eq!(plan.binding_at(0).unwrap().entry.field, "tags");
        assert_eq!(plan.binding_at(1).unwrap().entry.field, "id");
        assert_eq!(plan.binding_at(2).unwrap().entry.field, "name");
        assert_eq!(plan.skipped().count(), 0);
    }

    #[test]
    fn unknown_column_strict_vs_lenient() {
        let cols = columns(&["id", "abv", "name"]);
        let err = bind(&beer_map(), &cols, ColumnPolicy::Strict).unwrap_err();
        assert!(matches!(err, ScanError::UnknownColumn { ref column, index: 1 } if column == "abv"));

        let plan = bind(&beer_map(), &cols, ColumnPolicy::Lenient).unwrap();
        assert!(plan.binding_at(1).is_none());
        assert_eq!(plan.skipped().collect::<Vec<_>>(), [1]);
        assert_eq!(plan.bindings().len(), 2);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let err = bind(&beer_map(), &columns(&["id", "Name"]), ColumnPolicy::Strict).unwrap_err();
        assert!(matches!(err, ScanError::UnknownColumn { index: 1, .. }));
    }

    #[test]
    fn duplicate_column_is_rejected() {
        let err = bind(&beer_map(), &columns(&["id", "name", "name"]), ColumnPolicy::Lenient).unwrap_err();
        assert!(matches!(
            err,
            ScanError::DuplicateColumn { ref column, first: 1, second: 2 } if column == "name"
        ));
    }

    #[test]
    fn required_column_must_be_present() {
        let err = bind(&beer_map(), &columns(&["name"]), ColumnPolicy::Strict).unwrap_err();
        assert!(matches!(err, ScanError::MissingRequiredColumn { ref tag } if tag == "id"));
    }

    #[test]
    fn empty_result_set_binds_nothing() {
        #[derive(Debug, Default, Record)]
        struct Loose {
            name: String,
        }
        let map = reflect::<Loose>(TagPolicy::FieldName).unwrap();
        let plan = bind(&map, &[], ColumnPolicy::Strict).unwrap();
        assert_eq!(plan.width(), 0);
        assert!(plan.bindings().is_empty());
    }
}
