use std::fmt;

/// Semantic kind of a scalar field or of an array's elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Int,
    Float,
    Bool,
    Text,
    Bytes,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::Int => write!(f, "int"),
            ScalarKind::Float => write!(f, "float"),
            ScalarKind::Bool => write!(f, "bool"),
            ScalarKind::Text => write!(f, "text"),
            ScalarKind::Bytes => write!(f, "bytes"),
        }
    }
}

/// Declared kind of a destination field.
///
/// Arrays record their nesting depth: `Vec<String>` is `text[]` (depth 1),
/// `Vec<Vec<i64>>` is `int[][]` (depth 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Scalar(ScalarKind),
    Array { element: ScalarKind, depth: u8 },
}

impl FieldKind {
    /// Kind of an array whose elements have kind `inner`.
    pub const fn array_of(inner: FieldKind) -> FieldKind {
        match inner {
            FieldKind::Scalar(element) => FieldKind::Array { element, depth: 1 },
            FieldKind::Array { element, depth } => FieldKind::Array {
                element,
                depth: depth + 1,
            },
        }
    }

    pub const fn is_array(&self) -> bool {
        matches!(self, FieldKind::Array { .. })
    }

    /// Scalar kind of the field, or of the innermost array elements.
    pub const fn scalar(&self) -> ScalarKind {
        match self {
            FieldKind::Scalar(kind) => *kind,
            FieldKind::Array { element, .. } => *element,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Scalar(kind) => write!(f, "{kind}"),
            FieldKind::Array { element, depth } => {
                write!(f, "{element}")?;
                for _ in 0..*depth {
                    f.write_str("[]")?;
                }
                Ok(())
            }
        }
    }
}

/// How a declared field is reached.
#[derive(Debug, Clone, Copy)]
pub enum FieldShape {
    /// Field written directly from one column.
    Leaf { kind: FieldKind, nullable: bool },
    /// Nested record whose fields are promoted into the parent's tag
    /// namespace, each tag prefixed with `prefix`.
    Flatten {
        fields: fn() -> &'static [FieldDecl],
        type_name: fn() -> &'static str,
        prefix: &'static str,
    },
}

/// One entry of a record type's static manifest.
///
/// Generated by `#[derive(Record)]`; the position of a declaration in the
/// manifest is its index in a `FieldPath`. Skipped fields have no
/// declaration.
#[derive(Debug, Clone, Copy)]
pub struct FieldDecl {
    /// Rust field name.
    pub field: &'static str,
    /// Explicit `#[scan(tag = "...")]`, if any.
    pub tag: Option<&'static str>,
    /// `#[scan(required)]`: a result set without this column is rejected.
    pub required: bool,
    pub shape: FieldShape,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_kind_tracks_depth() {
        let text = FieldKind::Scalar(ScalarKind::Text);
        let one = FieldKind::array_of(text);
        let two = FieldKind::array_of(one);
        assert_eq!(one, FieldKind::Array { element: ScalarKind::Text, depth: 1 });
        assert_eq!(two.to_string(), "text[][]");
        assert_eq!(two.scalar(), ScalarKind::Text);
        assert!(!text.is_array());
    }
}
