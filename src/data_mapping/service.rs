use serde_json::Value;
use tracing::info;

use super::engine::{DataMappingEngine, PREVIEW_ROWS};
use crate::dataset::Table;
use crate::errors::AppResult;
use crate::models::{Mapping, Preview, Schema, ValidationReport};
use crate::storage::FileStore;

/// File-level entry points for uploads, mapping and validation
#[derive(Debug, Clone)]
pub struct DataMappingService {
    store: FileStore,
    engine: DataMappingEngine,
}

impl DataMappingService {
    pub fn new(store: FileStore) -> Self {
        Self {
            store,
            engine: DataMappingEngine::new(),
        }
    }

    pub async fn save_upload(&self, user: &str, filename: &str, content: &[u8]) -> AppResult<()> {
        self.store.save(user, filename, content).await?;
        info!(user, filename, bytes = content.len(), "Stored upload");
        Ok(())
    }

    /// Column → {row index → value} for the first rows of an upload
    pub async fn upload_preview(&self, user: &str, filename: &str) -> AppResult<Value> {
        let path = self.store.source_path(user, filename)?;
        let bytes = self.store.read(&path).await?;
        let head = Table::head_from_reader(bytes.as_slice(), PREVIEW_ROWS)?;
        Ok(head.json_columns())
    }

    /// Map and validate an upload into its `-mod.csv` copy and preview the result
    pub async fn map_file(
        &self,
        user: &str,
        filename: &str,
        mapping: &Mapping,
        schema: &Schema,
    ) -> AppResult<Preview> {
        let source = self.store.source_path(user, filename)?;
        let target = self.store.derived_path(user, filename)?;

        let table = Table::from_reader(self.store.read(&source).await?.as_slice())?;
        let mapped = self.engine.apply(table, mapping, schema)?;

        self.store.write(&target, &mapped.to_csv_bytes()?).await?;
        info!(
            user,
            filename,
            output = %target.display(),
            rows = mapped.row_count(),
            "Wrote mapped file"
        );

        Ok(DataMappingEngine::preview(&mapped))
    }

    /// Score an upload against the schema without writing anything
    pub async fn validate_file(
        &self,
        user: &str,
        filename: &str,
        mapping: &Mapping,
        schema: &Schema,
    ) -> AppResult<ValidationReport> {
        let source = self.store.source_path(user, filename)?;
        let table = Table::from_reader(self.store.read(&source).await?.as_slice())?;
        self.engine.validation_report(&table, mapping, schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::models::FieldDescriptor;
    use serde_json::json;

    async fn service_with(csv: &str) -> (tempfile::TempDir, DataMappingService) {
        let dir = tempfile::tempdir().unwrap();
        let service = DataMappingService::new(FileStore::new(dir.path().to_path_buf()));
        service
            .save_upload("alice", "people.csv", csv.as_bytes())
            .await
            .unwrap();
        (dir, service)
    }

    fn age_schema() -> Schema {
        Schema {
            fields: vec![FieldDescriptor {
                col: "age".to_string(),
                validator: Some("^[0-9]+$".to_string()),
            }],
        }
    }

    #[tokio::test]
    async fn test_upload_preview() {
        let (_dir, service) = service_with("name,age\nAlice,30\nBob,41\n").await;
        let preview = service.upload_preview("alice", "people.csv").await.unwrap();
        assert_eq!(
            preview,
            json!({"name": {"0": "Alice", "1": "Bob"}, "age": {"0": 30, "1": 41}})
        );
    }

    #[tokio::test]
    async fn test_map_file_writes_derived_copy() {
        let (dir, service) = service_with("name,age\nAlice,30\nBob,abc\n").await;
        let mapping = Mapping::new([("name", "name"), ("age", "age")]).unwrap();

        let preview = service
            .map_file("alice", "people.csv", &mapping, &age_schema())
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_value(&preview).unwrap(),
            json!([["name", "age"], ["Alice", 30]])
        );

        let written = std::fs::read_to_string(dir.path().join("alice/people-mod.csv")).unwrap();
        assert_eq!(written, "name,age\nAlice,30\n");
        let source = std::fs::read_to_string(dir.path().join("alice/people.csv")).unwrap();
        assert_eq!(source, "name,age\nAlice,30\nBob,abc\n");
    }

    #[tokio::test]
    async fn test_validate_file_does_not_write() {
        let (dir, service) = service_with("name,age\nAlice,30\nBob,abc\nCy,7\nDi,8\n").await;
        let mapping = Mapping::new([("name", "name"), ("age", "age")]).unwrap();

        let report = service
            .validate_file("alice", "people.csv", &mapping, &age_schema())
            .await
            .unwrap();
        assert_eq!(report.get("age").unwrap().percent, "75.00%");
        assert!(!dir.path().join("alice/people-mod.csv").exists());
    }

    #[tokio::test]
    async fn test_missing_upload_is_not_found() {
        let (_dir, service) = service_with("a\n1\n").await;
        let err = service
            .map_file("alice", "other.csv", &Mapping::default(), &Schema::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
