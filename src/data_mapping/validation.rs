//! Read-only scoring of a file against a schema

use tracing::debug;

use super::engine::{DataMappingEngine, FieldMatcher};
use crate::dataset::Table;
use crate::errors::AppResult;
use crate::models::{FieldReport, Mapping, Schema, ValidationReport};

/// Maximum number of invalid values reported per column
pub const INVALID_SAMPLE_SIZE: usize = 5;

impl DataMappingEngine {
    /// Score each validated schema field against the source column mapped onto it.
    ///
    /// The table is the unmapped upload, so every schema column is resolved
    /// back to its source column first. Nothing is written.
    pub fn validation_report(
        &self,
        table: &Table,
        mapping: &Mapping,
        schema: &Schema,
    ) -> AppResult<ValidationReport> {
        let mut report = ValidationReport::default();

        for (column, pattern) in schema.validated_fields() {
            let source = mapping.source_for(column)?;
            let matcher = FieldMatcher::compile(column, pattern)?;

            let mut valid = 0usize;
            let mut invalid = 0usize;
            let mut samples = Vec::new();

            for value in table.column(source)? {
                if matcher.matches(value) {
                    valid += 1;
                    continue;
                }
                invalid += 1;
                if samples.len() < INVALID_SAMPLE_SIZE {
                    samples.push(value.unwrap_or_default().to_string());
                }
            }

            debug!(column, source, valid, invalid, "Scored column");
            report.insert(
                column.to_string(),
                FieldReport {
                    percent: format_percent(valid, valid + invalid),
                    rows: samples,
                },
            );
        }

        Ok(report)
    }
}

/// `3 / 4` → `"75.00%"`. An empty column scores `"0.00%"`
pub fn format_percent(part: usize, total: usize) -> String {
    let ratio = if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    };
    format!("{:.2}%", ratio * 100.0)
}
