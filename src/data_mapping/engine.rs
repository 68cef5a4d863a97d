use regex::Regex;
use tracing::{debug, info};

use crate::dataset::Table;
use crate::errors::{AppError, AppResult};
use crate::models::{Mapping, Preview, Schema};

/// Number of data rows returned in previews
pub const PREVIEW_ROWS: usize = 5;

/// A compiled validator.
///
/// Patterns use prefix-match semantics: the match must begin at the first
/// character of the value but may stop before its end. Anchor the pattern
/// with `$` to require a full match.
#[derive(Debug, Clone)]
pub struct FieldMatcher {
    regex: Regex,
}

impl FieldMatcher {
    pub fn compile(column: &str, pattern: &str) -> AppResult<Self> {
        let regex = Regex::new(&format!(r"\A(?:{})", pattern)).map_err(|e| {
            AppError::validation(format!(
                "invalid validator for column '{}': {}",
                column, e
            ))
        })?;
        Ok(Self { regex })
    }

    /// Null values never match
    pub fn matches(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| self.regex.is_match(v))
    }
}

/// Applies mappings and schema validators to tables
#[derive(Debug, Clone, Copy, Default)]
pub struct DataMappingEngine;

impl DataMappingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Rename, subset and filter a table.
    ///
    /// Columns are renamed per the mapping; when the mapping names fewer
    /// columns than the table has, only the mapping's targets are kept, in
    /// mapping order. An empty mapping keeps every column. Each validated
    /// schema field then drops the rows whose value is null or does not match.
    ///
    /// Every validated field must name one of the mapping's targets, so an
    /// empty mapping cannot be combined with validators.
    pub fn apply(&self, mut table: Table, mapping: &Mapping, schema: &Schema) -> AppResult<Table> {
        for (column, _) in schema.validated_fields() {
            if !mapping.targets().any(|target| target == column) {
                return Err(AppError::validation(format!(
                    "schema field '{}' is not a target of the mapping",
                    column
                )));
            }
        }

        let original_columns = table.headers().len();
        let original_rows = table.row_count();

        table.rename_columns(mapping);

        if !mapping.is_empty() && mapping.len() < original_columns {
            table = table.select_columns(mapping.targets()).map_err(|e| match e {
                AppError::Validation { message } => AppError::validation(format!(
                    "mapping target not found after renaming: {}",
                    message
                )),
                other => other,
            })?;
            debug!(
                kept = table.headers().len(),
                dropped = original_columns - table.headers().len(),
                "Dropped unmapped columns"
            );
        }

        for (column, pattern) in schema.validated_fields() {
            let index = table.require_column(column).map_err(|_| {
                AppError::validation(format!(
                    "schema field '{}' is not a column of the mapped file",
                    column
                ))
            })?;
            let matcher = FieldMatcher::compile(column, pattern)?;

            let before = table.row_count();
            table.retain_rows(|row| matcher.matches(row[index].as_deref()));
            debug!(
                column,
                pattern,
                dropped = before - table.row_count(),
                "Applied validator"
            );
        }

        info!(
            rows_in = original_rows,
            rows_out = table.row_count(),
            columns = table.headers().len(),
            "Mapping applied"
        );
        Ok(table)
    }

    /// Header and the first [`PREVIEW_ROWS`] rows as JSON scalars
    pub fn preview(table: &Table) -> Preview {
        let head = table.head(PREVIEW_ROWS);
        Preview {
            header: head.headers().to_vec(),
            rows: head.json_rows(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldDescriptor;
    use rstest::rstest;
    use serde_json::json;

    fn table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    fn schema(fields: &[(&str, Option<&str>)]) -> Schema {
        Schema {
            fields: fields
                .iter()
                .map(|(col, validator)| FieldDescriptor {
                    col: col.to_string(),
                    validator: validator.map(str::to_string),
                })
                .collect(),
        }
    }

    #[rstest]
    #[case("[0-9]+", "123abc", true)]
    #[case("[0-9]+$", "123abc", false)]
    #[case("^[0-9]+$", "123", true)]
    #[case("[0-9]+", "abc123", false)]
    #[case("a|b", "bcd", true)]
    #[case("", "anything", true)]
    fn test_prefix_match(#[case] pattern: &str, #[case] value: &str, #[case] expected: bool) {
        let matcher = FieldMatcher::compile("col", pattern).unwrap();
        assert_eq!(matcher.matches(Some(value)), expected);
    }

    #[test]
    fn test_null_never_matches() {
        let matcher = FieldMatcher::compile("col", ".*").unwrap();
        assert!(!matcher.matches(None));
    }

    #[test]
    fn test_malformed_pattern_is_reported() {
        let err = FieldMatcher::compile("age", "[0-9").unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(err.to_string().contains("age"));
    }

    #[test]
    fn test_drops_rows_failing_validation() {
        let engine = DataMappingEngine::new();
        let mapping = Mapping::new([("name", "name"), ("age", "age")]).unwrap();
        let schema = schema(&[("age", Some("^[0-9]+$"))]);

        let result = engine
            .apply(table("name,age\nAlice,30\nBob,abc\n"), &mapping, &schema)
            .unwrap();

        assert_eq!(result.row_count(), 1);
        assert_eq!(
            serde_json::to_value(DataMappingEngine::preview(&result)).unwrap(),
            json!([["name", "age"], ["Alice", 30]])
        );
    }

    #[test]
    fn test_drops_unmapped_columns_in_mapping_order() {
        let engine = DataMappingEngine::new();
        let mapping = Mapping::new([("Years", "age"), ("Full Name", "name")]).unwrap();

        let result = engine
            .apply(
                table("Full Name,Years,Notes\nAlice,30,x\n"),
                &mapping,
                &Schema::default(),
            )
            .unwrap();

        assert_eq!(result.headers(), ["age", "name"]);
        assert_eq!(result.rows()[0][1].as_deref(), Some("Alice"));
    }

    #[test]
    fn test_empty_mapping_keeps_all_columns() {
        let engine = DataMappingEngine::new();
        let result = engine
            .apply(table("a,b\n1,2\n"), &Mapping::default(), &Schema::default())
            .unwrap();
        assert_eq!(result.headers(), ["a", "b"]);
    }

    #[test]
    fn test_full_mapping_renames_without_dropping() {
        let engine = DataMappingEngine::new();
        let mapping = Mapping::new([("a", "x"), ("b", "y")]).unwrap();
        let result = engine
            .apply(table("a,b\n1,2\n"), &mapping, &Schema::default())
            .unwrap();
        assert_eq!(result.headers(), ["x", "y"]);
    }

    #[test]
    fn test_rename_then_reverse_restores_header() {
        let engine = DataMappingEngine::new();
        let source = table("id,email,name\n1,a@b.c,Al\n");
        let mapping = Mapping::new([("id", "user_id"), ("email", "mail"), ("name", "who")]).unwrap();

        let renamed = engine.apply(source.clone(), &mapping, &Schema::default()).unwrap();
        let restored = engine
            .apply(renamed, &mapping.inverted().unwrap(), &Schema::default())
            .unwrap();

        assert_eq!(restored.headers(), source.headers());
    }

    #[test]
    fn test_mapping_target_missing_from_file() {
        let engine = DataMappingEngine::new();
        let mapping = Mapping::new([("nope", "x")]).unwrap();
        let err = engine
            .apply(table("a,b\n1,2\n"), &mapping, &Schema::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_schema_field_not_in_mapping_fails() {
        let engine = DataMappingEngine::new();
        let mapping = Mapping::new([("a", "x")]).unwrap();
        let err = engine
            .apply(
                table("a,b\n1,2\n"),
                &mapping,
                &schema(&[("b", Some(".*"))]),
            )
            .unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn test_validator_on_unmapped_passthrough_column_fails() {
        let engine = DataMappingEngine::new();
        let mapping = Mapping::new([("a", "x"), ("c", "y")]).unwrap();
        let err = engine
            .apply(
                table("a,b\n1,x\n2,\n"),
                &mapping,
                &schema(&[("b", Some(".*"))]),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn test_validator_with_empty_mapping_fails() {
        let engine = DataMappingEngine::new();
        let err = engine
            .apply(
                table("a,b\n1,x\n2,\n"),
                &Mapping::default(),
                &schema(&[("b", Some(".*"))]),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_unvalidated_field_outside_mapping_is_ignored() {
        let engine = DataMappingEngine::new();
        let mapping = Mapping::new([("a", "a"), ("b", "b")]).unwrap();
        let result = engine
            .apply(table("a,b\n1,2\n"), &mapping, &schema(&[("zzz", None)]))
            .unwrap();
        assert_eq!(result.row_count(), 1);
    }

    #[test]
    fn test_null_values_are_dropped() {
        let engine = DataMappingEngine::new();
        let mapping = Mapping::new([("a", "a"), ("b", "b")]).unwrap();
        let result = engine
            .apply(
                table("a,b\n1,\n2,x\n"),
                &mapping,
                &schema(&[("b", Some(".*"))]),
            )
            .unwrap();
        assert_eq!(result.row_count(), 1);
    }

    #[test]
    fn test_preview_is_capped() {
        let mut csv = String::from("n\n");
        for i in 0..12 {
            csv.push_str(&format!("{}\n", i));
        }
        let preview = DataMappingEngine::preview(&table(&csv));
        assert_eq!(preview.rows.len(), PREVIEW_ROWS);
    }

    #[test]
    fn test_validation_never_adds_rows() {
        let engine = DataMappingEngine::new();
        let source = table("v\n1\n22\nx\n\n333\n");
        let mapping = Mapping::new([("v", "v")]).unwrap();
        let before = source.row_count();
        for pattern in ["[0-9]", "^[0-9]{2}$", "x", ".*", "z"] {
            let result = engine
                .apply(source.clone(), &mapping, &schema(&[("v", Some(pattern))]))
                .unwrap();
            assert!(result.row_count() <= before);
        }
    }
}
