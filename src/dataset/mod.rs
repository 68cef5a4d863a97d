//! In-memory CSV tables
//!
//! A [`Table`] keeps every cell as the raw text read from the file. Empty
//! fields are null. Typing only happens when rows are turned into JSON,
//! see [`value::ColumnKind`].

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io;

use crate::errors::{AppError, AppResult};
use crate::models::Mapping;

pub mod value;

pub use value::ColumnKind;

pub type Cell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Parse a full CSV document. The first record is the header
    pub fn from_reader<R: io::Read>(reader: R) -> AppResult<Self> {
        Self::read_rows(reader, None)
    }

    /// Parse the header and at most `limit` data rows
    pub fn head_from_reader<R: io::Read>(reader: R, limit: usize) -> AppResult<Self> {
        Self::read_rows(reader, Some(limit))
    }

    fn read_rows<R: io::Read>(reader: R, limit: Option<usize>) -> AppResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(AppError::validation("file has no header row"));
        }

        let width = headers.len();
        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            if limit.is_some_and(|limit| rows.len() >= limit) {
                break;
            }
            let record = record?;
            if record.len() > width {
                return Err(AppError::validation(format!(
                    "row {} has {} fields, expected {}",
                    index + 1,
                    record.len(),
                    width
                )));
            }
            // Short rows are padded with nulls
            let mut row: Vec<Cell> = record
                .iter()
                .map(|field| (!field.is_empty()).then(|| field.to_string()))
                .collect();
            row.resize(width, None);
            rows.push(row);
        }

        Ok(Self {
            headers: dedupe_headers(headers),
            rows,
        })
    }

    /// Serialize back to CSV, nulls as empty fields
    pub fn to_csv_bytes(&self) -> AppResult<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        writer
            .into_inner()
            .map_err(|e| AppError::internal(format!("failed to flush CSV writer: {}", e)))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Values of one column, or a validation error naming the column
    pub fn column(&self, name: &str) -> AppResult<impl Iterator<Item = Option<&str>> + '_> {
        let index = self.require_column(name)?;
        Ok(self.rows.iter().map(move |row| row[index].as_deref()))
    }

    pub fn require_column(&self, name: &str) -> AppResult<usize> {
        self.column_index(name).ok_or_else(|| {
            AppError::validation(format!("column '{}' does not exist in the file", name))
        })
    }

    /// Rename headers per the mapping. Unmapped headers are kept as-is
    pub fn rename_columns(&mut self, mapping: &Mapping) {
        let renamed = self
            .headers
            .iter()
            .map(|h| mapping.get(h).unwrap_or(h).to_string())
            .collect();
        self.headers = dedupe_headers(renamed);
    }

    /// New table with only the named columns, in the given order
    pub fn select_columns<'a, I>(&self, names: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut indices = Vec::new();
        let mut headers = Vec::new();
        for name in names {
            indices.push(self.require_column(name)?);
            headers.push(name.to_string());
        }

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Self {
            headers: dedupe_headers(headers),
            rows,
        })
    }

    /// Keep the rows for which `keep` returns true
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Cell]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// Copy of the header and the first `limit` rows
    pub fn head(&self, limit: usize) -> Self {
        Self {
            headers: self.headers.clone(),
            rows: self.rows.iter().take(limit).cloned().collect(),
        }
    }

    fn column_kinds(&self) -> Vec<ColumnKind> {
        (0..self.headers.len())
            .map(|i| ColumnKind::infer(self.rows.iter().map(|row| row[i].as_deref())))
            .collect()
    }

    /// Rows as JSON scalars, typed per column
    pub fn json_rows(&self) -> Vec<Vec<Value>> {
        let kinds = self.column_kinds();
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| kind.to_json(cell.as_deref()))
                    .collect()
            })
            .collect()
    }

    /// Rows as JSON objects keyed by column name
    pub fn json_records(&self) -> Vec<Value> {
        self.json_rows()
            .into_iter()
            .map(|row| {
                let record: Map<String, Value> = self.headers.iter().cloned().zip(row).collect();
                Value::Object(record)
            })
            .collect()
    }

    /// Column name → {row index → value}
    pub fn json_columns(&self) -> Value {
        let rows = self.json_rows();
        let columns: Map<String, Value> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let values: Map<String, Value> = rows
                    .iter()
                    .enumerate()
                    .map(|(row_index, row)| (row_index.to_string(), row[i].clone()))
                    .collect();
                (header.clone(), Value::Object(values))
            })
            .collect();
        Value::Object(columns)
    }
}

/// Suffix repeated names with `.1`, `.2`, ... so every header is unique
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    headers
        .into_iter()
        .map(|header| {
            let mut candidate = header.clone();
            let mut n = 1;
            while seen.contains(&candidate) {
                candidate = format!("{}.{}", header, n);
                n += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> Table {
        Table::from_reader("name,age,city\nAlice,30,Paris\nBob,,Rome\n".as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_nulls_and_short_rows() {
        let table = Table::from_reader("a,b,c\n1,,3\n4,5\n".as_bytes()).unwrap();
        assert_eq!(table.headers(), ["a", "b", "c"]);
        assert_eq!(
            table.rows()[0],
            vec![Some("1".to_string()), None, Some("3".to_string())]
        );
        assert_eq!(table.rows()[1][2], None);
    }

    #[test]
    fn test_parse_rejects_long_rows() {
        let err = Table::from_reader("a,b\n1,2,3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_parse_rejects_empty_file() {
        assert!(Table::from_reader("".as_bytes()).is_err());
    }

    #[test]
    fn test_head_from_reader_limits_rows() {
        let data: String = std::iter::once("n\n".to_string())
            .chain((0..20).map(|i| format!("{}\n", i)))
            .collect();
        let table = Table::head_from_reader(data.as_bytes(), 5).unwrap();
        assert_eq!(table.row_count(), 5);
    }

    #[test]
    fn test_quoted_headers_survive() {
        let table = Table::from_reader("\"last, first\",age\n\"Doe, J\",4\n".as_bytes()).unwrap();
        assert_eq!(table.headers()[0], "last, first");
        let bytes = table.to_csv_bytes().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "\"last, first\",age\n\"Doe, J\",4\n"
        );
    }

    #[test]
    fn test_duplicate_headers_are_suffixed() {
        let table = Table::from_reader("a,a,b,a\n1,2,3,4\n".as_bytes()).unwrap();
        assert_eq!(table.headers(), ["a", "a.1", "b", "a.2"]);
    }

    #[test]
    fn test_rename_and_select() {
        let mut table = people();
        let mapping = Mapping::new([("name", "full_name")]).unwrap();
        table.rename_columns(&mapping);
        assert_eq!(table.headers(), ["full_name", "age", "city"]);

        let selected = table.select_columns(["city", "full_name"]).unwrap();
        assert_eq!(selected.headers(), ["city", "full_name"]);
        assert_eq!(selected.rows()[1][0].as_deref(), Some("Rome"));

        assert!(table.select_columns(["missing"]).is_err());
    }

    #[test]
    fn test_json_views() {
        let table = people();
        assert_eq!(
            table.json_rows(),
            vec![
                vec![json!("Alice"), json!(30), json!("Paris")],
                vec![json!("Bob"), Value::Null, json!("Rome")],
            ]
        );
        assert_eq!(
            table.json_records()[0],
            json!({"name": "Alice", "age": 30, "city": "Paris"})
        );
        assert_eq!(
            table.json_columns()["age"],
            json!({"0": 30, "1": null})
        );
    }

    #[test]
    fn test_csv_round_trip_writes_nulls_as_empty() {
        let table = people();
        let text = String::from_utf8(table.to_csv_bytes().unwrap()).unwrap();
        assert_eq!(text, "name,age,city\nAlice,30,Paris\nBob,,Rome\n");
    }
}
