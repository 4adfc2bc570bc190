use std::collections::HashMap;

use rowscan_api::mapping::{FieldEntry, FieldPath, TypeMap};
use rowscan_api::record::Record;
use rowscan_api::schema::{FieldDecl, FieldShape};

use crate::config::TagPolicy;
use crate::error::ScanError;

/// Build the tag → field map of `T` from its static manifest.
///
/// Flattened records are walked depth-first; their tags get the declared
/// prefix and their paths extend the parent's. Pure: the same type and
/// policy always give the same map.
pub fn reflect<T: Record>(policy: TagPolicy) -> Result<TypeMap, ScanError> {
    let type_name = T::type_name();
    let mut walker = Walker {
        root: type_name,
        policy,
        entries: Vec::new(),
        seen: HashMap::new(),
    };
    walker.walk(type_name, T::fields(), &[], "", "", false)?;

    if walker.entries.is_empty() {
        return Err(ScanError::UnsupportedType {
            type_name: type_name.to_string(),
            reason: format!("no scannable fields under tag policy {policy:?}"),
        });
    }
    Ok(TypeMap::new(type_name, walker.entries))
}

struct Walker<'r> {
    root: &'r str,
    policy: TagPolicy,
    entries: Vec<FieldEntry>,
    /// tag → index into `entries`
    seen: HashMap<String, usize>,
}

impl Walker<'_> {
    fn walk(
        &mut self,
        type_name: &str,
        decls: &[FieldDecl],
        path: &[usize],
        tag_prefix: &str,
        field_prefix: &str,
        required: bool,
    ) -> Result<(), ScanError> {
        if decls.is_empty() {
            return Err(ScanError::UnsupportedType {
                type_name: type_name.to_string(),
                reason: "declares no fields".into(),
            });
        }

        for (i, decl) in decls.iter().enumerate() {
            let mut field_path = path.to_vec();
            field_path.push(i);
            let field = if field_prefix.is_empty() {
                decl.field.to_string()
            } else {
                format!("{field_prefix}.{}", decl.field)
            };

            match decl.shape {
                FieldShape::Flatten {
                    fields,
                    type_name: nested,
                    prefix,
                } => {
                    let nested_prefix = format!("{tag_prefix}{prefix}");
                    // a required flattened record makes every promoted field required
                    self.walk(
                        nested(),
                        fields(),
                        &field_path,
                        &nested_prefix,
                        &field,
                        required || decl.required,
                    )?;
                }
                FieldShape::Leaf { kind, nullable } => {
                    let tag = match (decl.tag, self.policy) {
                        (Some(tag), _) => tag,
                        (None, TagPolicy::FieldName) => decl.field,
                        (None, TagPolicy::Ignore) => {
                            tracing::trace!(record = %self.root, field = %field, "untagged field ignored");
                            continue;
                        }
                        (None, TagPolicy::Require) => {
                            return Err(ScanError::MissingTag {
                                type_name: self.root.to_string(),
                                field,
                            });
                        }
                    };
                    let tag = format!("{tag_prefix}{tag}");

                    if let Some(&first) = self.seen.get(&tag) {
                        return Err(ScanError::DuplicateTag {
                            type_name: self.root.to_string(),
                            tag,
                            first: self.entries[first].field.clone(),
                            second: field,
                        });
                    }
                    self.seen.insert(tag.clone(), self.entries.len());
                    self.entries.push(FieldEntry {
                        tag,
                        field,
                        path: FieldPath(field_path),
                        kind,
                        nullable,
                        required: required || decl.required,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowscan_api::schema::{FieldKind, ScalarKind};
    use rowscan_api::Record;

    #[derive(Debug, Default, Record)]
    struct Brewery {
        #[scan(tag = "name")]
        name: String,
        city: Option<String>,
    }

    #[derive(Debug, Default, Record)]
    struct Beer {
        #[scan(tag = "id", required)]
        id: i64,
        #[scan(tag = "name")]
        name: String,
        rating: Option<f64>,
        #[scan(skip)]
        label: String,
        #[scan(flatten, prefix = "brewery_")]
        brewery: Brewery,
    }

    #[derive(Debug, Default, Record)]
    struct Clash {
        #[scan(tag = "id")]
        a: i64,
        #[scan(tag = "id")]
        b: i64,
    }

    #[derive(Debug, Default, Record)]
    struct Empty {}

    #[derive(Debug, Default, Record)]
    struct Untagged {
        a: i64,
        b: String,
    }

    #[test]
    fn flattens_with_prefix_and_paths() {
        let map = reflect::<Beer>(TagPolicy::FieldName).unwrap();
        let tags: Vec<&str> = map.entries().iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, ["id", "name", "rating", "brewery_name", "brewery_city"]);

        let (_, city) = map.lookup("brewery_city").unwrap();
        assert_eq!(city.field, "brewery.city");
        assert_eq!(city.path, FieldPath(vec![3, 1]));
        assert!(city.nullable);

        let (_, id) = map.lookup("id").unwrap();
        assert!(id.required);
        assert_eq!(id.kind, FieldKind::Scalar(ScalarKind::Int));
        assert!(map.lookup("label").is_none());
    }

    #[test]
    fn duplicate_tags_are_rejected() {
        let err = reflect::<Clash>(TagPolicy::FieldName).unwrap_err();
        assert!(matches!(
            err,
            ScanError::DuplicateTag { ref tag, ref first, ref second, .. }
                if tag == "id" && first == "a" && second == "b"
        ));
    }

    #[test]
    fn tag_policies() {
        assert_eq!(reflect::<Untagged>(TagPolicy::FieldName).unwrap().len(), 2);

        let err = reflect::<Untagged>(TagPolicy::Require).unwrap_err();
        assert!(matches!(err, ScanError::MissingTag { ref field, .. } if field == "a"));

        let err = reflect::<Untagged>(TagPolicy::Ignore).unwrap_err();
        assert!(matches!(err, ScanError::UnsupportedType { .. }));

        let map = reflect::<Beer>(TagPolicy::Ignore).unwrap();
        let tags: Vec<&str> = map.entries().iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, ["id", "name", "brewery_name"]);
    }

    #[derive(Debug, Default, Record)]
    struct Listing {
        #[scan(tag = "id")]
        id: i64,
        #[scan(flatten, required, prefix = "brewery_")]
        brewery: Brewery,
    }

    #[derive(Debug, Default, Record)]
    struct Keywords {
        r#type: String,
        #[scan(tag = "match")]
        r#match: Option<String>,
    }

    #[test]
    fn required_flatten_marks_promoted_fields() {
        let map = reflect::<Listing>(TagPolicy::FieldName).unwrap();
        let required: Vec<(&str, bool)> = map.entries().iter().map(|e| (e.tag.as_str(), e.required)).collect();
        assert_eq!(
            required,
            [("id", false), ("brewery_name", true), ("brewery_city", true)]
        );
    }

    #[test]
    fn raw_identifiers_use_the_plain_name() {
        let map = reflect::<Keywords>(TagPolicy::FieldName).unwrap();
        let (_, entry) = map.lookup("type").unwrap();
        assert_eq!(entry.field, "type");
        assert!(map.lookup("r#type").is_none());
        assert!(map.lookup("match").is_some());
    }

    #[test]
    fn records_without_fields_are_unsupported() {
        let err = reflect::<Empty>(TagPolicy::FieldName).unwrap_err();
        assert!(err.to_string().contains("declares no fields"), "{err}");
    }
}
