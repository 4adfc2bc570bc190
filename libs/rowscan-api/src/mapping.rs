use std::collections::HashMap;
use std::fmt;

use crate::schema::FieldKind;

/// Indices leading from the root record to a field, one per nesting level.
///
/// `[4]` is the fifth declared field of the root; `[1, 0]` is the first
/// field of the flattened record declared second.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct FieldPath(pub Vec<usize>);

impl FieldPath {
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, idx) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{idx}")?;
        }
        Ok(())
    }
}

/// One scannable field after flattening.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldEntry {
    /// Column name this field matches.
    pub tag: String,
    /// Dotted Rust field path (`brewery.name`), for diagnostics.
    pub field: String,
    pub path: FieldPath,
    pub kind: FieldKind,
    pub nullable: bool,
    pub required: bool,
}

/// Tag → field mapping for one record type.
///
/// Built once per type by the reflector, immutable afterwards. Entries keep
/// declaration order (depth-first through flattened records).
#[derive(Debug, Clone, serde::Serialize)]
pub struct TypeMap {
    type_name: String,
    entries: Vec<FieldEntry>,
    #[serde(skip)]
    by_tag: HashMap<String, usize>,
}

impl TypeMap {
    /// Callers guarantee tags are unique; a repeated tag resolves to its
    /// last entry.
    pub fn new(type_name: impl Into<String>, entries: Vec<FieldEntry>) -> Self {
        let by_tag = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.tag.clone(), i))
            .collect();
        Self {
            type_name: type_name.into(),
            entries,
            by_tag,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    /// Case-sensitive exact lookup.
    pub fn lookup(&self, tag: &str) -> Option<(usize, &FieldEntry)> {
        self.by_tag.get(tag).map(|&i| (i, &self.entries[i]))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for TypeMap {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.entries == other.entries
    }
}

impl Eq for TypeMap {}

/// A column of the result set routed to a field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ColumnBinding {
    /// Position in the cursor's column list and in `Row.0`.
    pub index: usize,
    /// Column name (for errors and logs).
    pub column: String,
    pub entry: FieldEntry,
}

/// Column index → field routing for one result shape.
///
/// - `bindings`: one per matched column, ascending by column index
/// - `slots`: one per column, `None` for columns skipped in lenient mode
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ColumnPlan {
    type_name: String,
    columns: Vec<String>,
    bindings: Vec<ColumnBinding>,
    slots: Vec<Option<usize>>,
}

impl ColumnPlan {
    /// `bindings` must be sorted by column index, each index below
    /// `columns.len()`.
    pub fn new(type_name: impl Into<String>, columns: Vec<String>, bindings: Vec<ColumnBinding>) -> Self {
        let mut slots = vec![None; columns.len()];
        for (i, binding) in bindings.iter().enumerate() {
            slots[binding.index] = Some(i);
        }
        Self {
            type_name: type_name.into(),
            columns,
            bindings,
            slots,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of values every row must carry.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn bindings(&self) -> &[ColumnBinding] {
        &self.bindings
    }

    /// Binding for the column at `index`, `None` if the column is skipped.
    pub fn binding_at(&self, index: usize) -> Option<&ColumnBinding> {
        self.slots
            .get(index)
            .copied()
            .flatten()
            .map(|i| &self.bindings[i])
    }

    /// Indices of columns with no destination.
    pub fn skipped(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| i)
    }
}
