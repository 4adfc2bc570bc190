use serde::Deserialize;

use crate::error::ScanError;

/// What to do with a result column no field claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPolicy {
    /// Fail with `UnknownColumn`.
    #[default]
    Strict,
    /// Skip the column.
    Lenient,
}

/// How fields without `#[scan(tag = "...")]` are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagPolicy {
    /// The Rust field name is the tag.
    #[default]
    FieldName,
    /// Untagged fields are never scanned.
    Ignore,
    /// Untagged fields are a `MissingTag` error.
    Require,
}

/// What to do with a row that fails conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowErrorPolicy {
    /// Abort the scan on the first bad row.
    #[default]
    FailFast,
    /// Skip the row, collect the error, continue.
    SkipRow,
}

/// `scan_one` behaviour when more than one row is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OneRowPolicy {
    /// Fail with `MultipleRows`.
    #[default]
    Strict,
    /// Return the first row, leave the rest unread.
    TakeFirst,
}

/// Encoding of array columns that arrive as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayFormat {
    /// Postgres array literal: `{a,"b c",NULL}`.
    #[default]
    PgText,
    /// JSON array: `["a", "b c", null]`.
    Json,
}

/// Scanner configuration, parsed from TOML.
///
/// ```toml
/// columns = "lenient"
/// untagged = "require"
/// rows = "skip_row"
/// one_row = "take_first"
/// arrays = "pg_text"
/// array_delimiter = ","
/// plan_cache_capacity = 1024
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    #[serde(default)]
    pub columns: ColumnPolicy,

    #[serde(default)]
    pub untagged: TagPolicy,

    #[serde(default)]
    pub rows: RowErrorPolicy,

    #[serde(default)]
    pub one_row: OneRowPolicy,

    #[serde(default)]
    pub arrays: ArrayFormat,

    /// Element delimiter for `pg_text` arrays.
    #[serde(default = "default_array_delimiter")]
    pub array_delimiter: char,

    /// Maximum number of cached column plans (result shapes).
    #[serde(default = "default_plan_cache_capacity")]
    pub plan_cache_capacity: u64,
}

fn default_array_delimiter() -> char {
    ','
}

fn default_plan_cache_capacity() -> u64 {
    1024
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            columns: ColumnPolicy::default(),
            untagged: TagPolicy::default(),
            rows: RowErrorPolicy::default(),
            one_row: OneRowPolicy::default(),
            arrays: ArrayFormat::default(),
            array_delimiter: default_array_delimiter(),
            plan_cache_capacity: default_plan_cache_capacity(),
        }
    }
}

impl ScanConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, ScanError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ScanError::Config(format!("{path}: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ScanError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ScanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ScanError> {
        if matches!(self.array_delimiter, '{' | '}' | '"' | '\\') || self.array_delimiter.is_whitespace() {
            return Err(ScanError::Config(format!(
                "array_delimiter {:?} collides with array literal syntax",
                self.array_delimiter
            )));
        }
        if self.plan_cache_capacity == 0 {
            return Err(ScanError::Config("plan_cache_capacity must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ScanConfig::parse("").unwrap();
        assert_eq!(config, ScanConfig::default());
        assert_eq!(config.columns, ColumnPolicy::Strict);
        assert_eq!(config.rows, RowErrorPolicy::FailFast);
        assert_eq!(config.array_delimiter, ',');
    }

    #[test]
    fn parses_all_keys() {
        let config = ScanConfig::parse(
            r#"
            columns = "lenient"
            untagged = "require"
            rows = "skip_row"
            one_row = "take_first"
            arrays = "json"
            array_delimiter = ";"
            plan_cache_capacity = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.columns, ColumnPolicy::Lenient);
        assert_eq!(config.untagged, TagPolicy::Require);
        assert_eq!(config.rows, RowErrorPolicy::SkipRow);
        assert_eq!(config.one_row, OneRowPolicy::TakeFirst);
        assert_eq!(config.arrays, ArrayFormat::Json);
        assert_eq!(config.array_delimiter, ';');
        assert_eq!(config.plan_cache_capacity, 16);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(matches!(ScanConfig::parse("colums = \"strict\""), Err(ScanError::Config(_))));
        assert!(matches!(ScanConfig::parse("rows = \"sometimes\""), Err(ScanError::Config(_))));
        assert!(matches!(ScanConfig::parse("array_delimiter = \"{\""), Err(ScanError::Config(_))));
        assert!(matches!(ScanConfig::parse("plan_cache_capacity = 0"), Err(ScanError::Config(_))));
    }
}
