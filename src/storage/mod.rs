//! Per-user flat-file storage
//!
//! Layout under the data directory:
//!
//! ```text
//! <data_dir>/<user>/<file>.csv        uploaded source
//! <data_dir>/<user>/<file>-mod.csv    mapped and validated copy
//! <data_dir>/<user>/output/           staged export files
//! <data_dir>/<user>/config.json       export target config
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::errors::{AppError, AppResult};

const DERIVED_SUFFIX: &str = "-mod.csv";

#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub async fn ensure_data_dir(&self) -> AppResult<()> {
        fs::create_dir_all(&self.data_dir).await?;
        Ok(())
    }

    /// Directory holding one user's files
    pub fn user_dir(&self, user: &str) -> AppResult<PathBuf> {
        validate_segment("user", user)?;
        Ok(self.data_dir.join(user))
    }

    /// Path of an uploaded file
    pub fn source_path(&self, user: &str, filename: &str) -> AppResult<PathBuf> {
        validate_segment("filename", filename)?;
        Ok(self.user_dir(user)?.join(filename))
    }

    /// Path of the mapped copy of an uploaded file
    pub fn derived_path(&self, user: &str, filename: &str) -> AppResult<PathBuf> {
        validate_segment("filename", filename)?;
        Ok(self.user_dir(user)?.join(derived_file_name(filename)))
    }

    pub fn output_dir(&self, user: &str) -> AppResult<PathBuf> {
        Ok(self.user_dir(user)?.join("output"))
    }

    pub fn target_config_path(&self, user: &str) -> AppResult<PathBuf> {
        Ok(self.user_dir(user)?.join("config.json"))
    }

    /// Store an upload, replacing any earlier file with the same name
    pub async fn save(&self, user: &str, filename: &str, content: &[u8]) -> AppResult<PathBuf> {
        let path = self.source_path(user, filename)?;
        fs::create_dir_all(self.user_dir(user)?).await?;
        fs::write(&path, content).await?;
        debug!(path = %path.display(), bytes = content.len(), "Saved upload");
        Ok(path)
    }

    /// Read a stored file, reporting a missing file as not found
    pub async fn read(&self, path: &Path) -> AppResult<Vec<u8>> {
        fs::read(path).await.map_err(|e| not_found_or_io(e, path))
    }

    pub async fn write(&self, path: &Path, content: &[u8]) -> AppResult<()> {
        fs::write(path, content).await?;
        Ok(())
    }
}

/// `people.csv` → `people-mod.csv`; names without `.csv` get the suffix appended
pub fn derived_file_name(filename: &str) -> String {
    let stem = filename.strip_suffix(".csv").unwrap_or(filename);
    format!("{}{}", stem, DERIVED_SUFFIX)
}

pub(crate) fn not_found_or_io(error: std::io::Error, path: &Path) -> AppError {
    if error.kind() == ErrorKind::NotFound {
        AppError::not_found("file", path.display().to_string())
    } else {
        AppError::Io(error)
    }
}

/// Reject anything that could escape the user directory
fn validate_segment(field: &str, value: &str) -> AppResult<()> {
    let invalid = value.is_empty()
        || value == "."
        || value.contains("..")
        || value.contains(['/', '\\', '\0']);
    if invalid {
        return Err(AppError::validation(format!(
            "invalid {}: '{}'",
            field,
            value.escape_default()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("people.csv", "people-mod.csv")]
    #[case("people", "people-mod.csv")]
    #[case("archive.csv.csv", "archive.csv-mod.csv")]
    fn test_derived_file_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(derived_file_name(input), expected);
    }

    #[rstest]
    #[case("")]
    #[case("..")]
    #[case("../etc")]
    #[case("a/b")]
    #[case("a\\b")]
    #[case(".")]
    fn test_rejects_unsafe_segments(#[case] segment: &str) {
        let store = FileStore::new(PathBuf::from("/data"));
        assert!(store.source_path("alice", segment).is_err());
        assert!(store.user_dir(segment).is_err());
    }

    #[test]
    fn test_paths() {
        let store = FileStore::new(PathBuf::from("/data"));
        assert_eq!(
            store.derived_path("alice", "people.csv").unwrap(),
            PathBuf::from("/data/alice/people-mod.csv")
        );
        assert_eq!(
            store.output_dir("alice").unwrap(),
            PathBuf::from("/data/alice/output")
        );
    }

    #[tokio::test]
    async fn test_save_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());

        let path = store.save("alice", "people.csv", b"a,b\n1,2\n").await.unwrap();
        assert_eq!(store.read(&path).await.unwrap(), b"a,b\n1,2\n");

        let missing = store.source_path("alice", "other.csv").unwrap();
        assert!(matches!(
            store.read(&missing).await,
            Err(AppError::NotFound { .. })
        ));
    }
}
