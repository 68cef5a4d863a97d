//! Hand-off of mapped files to an external export target
//!
//! An export moves through three states. With no target configured it is
//! idle and does nothing. Staging copies (csv) or converts (json) the
//! `-mod.csv` file into the user's `output/` directory and writes the
//! target's `config.json`. Invoking runs the target command in the user
//! directory and waits for it to exit.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::config::{ExportConfig, ExportFormat};
use crate::dataset::Table;
use crate::errors::{AppError, AppResult};
use crate::storage::{derived_file_name, not_found_or_io, FileStore};

/// What an export request resulted in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// No target is configured
    Skipped,
    /// The target ran and exited successfully
    Completed { output_dir: PathBuf },
}

#[derive(Debug, Clone)]
pub struct Exporter {
    config: ExportConfig,
    store: FileStore,
}

/// Files are in place and the target config is written; the command has not run yet
#[derive(Debug)]
pub struct StagedExport {
    pub target: String,
    pub user_dir: PathBuf,
    pub output_dir: PathBuf,
    pub config_path: PathBuf,
    pub command: String,
}

impl Exporter {
    pub fn new(config: ExportConfig, store: FileStore) -> Self {
        Self { config, store }
    }

    /// Stage and run the export for one mapped file
    pub async fn export(&self, user: &str, filename: &str) -> AppResult<ExportOutcome> {
        let Some(target) = self.config.target.as_deref() else {
            info!(user, filename, "No export target configured, skipping export");
            return Ok(ExportOutcome::Skipped);
        };

        let staged = self.stage(target, user, filename).await?;
        let output_dir = staged.output_dir.clone();
        staged.invoke().await?;

        Ok(ExportOutcome::Completed { output_dir })
    }

    /// Prepare the output directory and target config
    pub async fn stage(&self, target: &str, user: &str, filename: &str) -> AppResult<StagedExport> {
        let user_dir = self.store.user_dir(user)?;
        let mapped_path = self.store.derived_path(user, filename)?;
        let output_dir = self.store.output_dir(user)?;
        let config_path = self.store.target_config_path(user)?;

        if let Err(e) = fs::metadata(&mapped_path).await {
            return Err(match not_found_or_io(e, &mapped_path) {
                AppError::NotFound { .. } => {
                    AppError::not_found("mapped file", derived_file_name(filename))
                }
                other => other,
            });
        }

        match fs::remove_dir_all(&output_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&output_dir).await?;

        let written = match self.config.format {
            ExportFormat::Csv => {
                let dest = output_dir.join(filename);
                fs::copy(&mapped_path, &dest)
                    .await
                    .map_err(|e| not_found_or_io(e, &mapped_path))?;
                dest
            }
            ExportFormat::Json => {
                let dest = output_dir.join(json_file_name(filename));
                let bytes = fs::read(&mapped_path)
                    .await
                    .map_err(|e| not_found_or_io(e, &mapped_path))?;
                let table = Table::from_reader(bytes.as_slice())?;
                let records = Value::Array(table.json_records());
                fs::write(&dest, serde_json::to_vec_pretty(&records)?).await?;
                dest
            }
        };

        let target_config = build_target_config(&self.config.settings, &output_dir, user);
        fs::write(&config_path, serde_json::to_vec_pretty(&target_config)?).await?;

        info!(
            user,
            export_target = target,
            staged = %written.display(),
            config = %config_path.display(),
            "Export staged"
        );

        Ok(StagedExport {
            target: target.to_string(),
            user_dir,
            output_dir,
            config_path,
            command: self.config.command.replace("{target}", target),
        })
    }
}

impl StagedExport {
    /// Run the target command through `sh -c` and wait for it to exit
    pub async fn invoke(self) -> AppResult<()> {
        info!(
            export_target = %self.target,
            command = %self.command,
            cwd = %self.user_dir.display(),
            "Running export target"
        );

        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(&self.user_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                error!(export_target = %self.target, "Failed to launch export target: {}", e);
                AppError::external_service("export", format!("failed to launch target: {}", e))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            error!(
                export_target = %self.target,
                status = %output.status,
                stderr = %stderr.trim(),
                "Export target failed"
            );
            return Err(AppError::external_service(
                "export",
                format!("target '{}' exited with {}", self.target, output.status),
            ));
        }

        if !stderr.trim().is_empty() {
            warn!(export_target = %self.target, stderr = %stderr.trim(), "Export target wrote to stderr");
        }
        info!(export_target = %self.target, "Export target completed");
        Ok(())
    }
}

/// Target config: `input_path` plus each setting with `{user}` filled in
pub fn build_target_config(
    settings: &BTreeMap<String, String>,
    output_dir: &Path,
    user: &str,
) -> Map<String, Value> {
    let mut config = Map::new();
    config.insert(
        "input_path".to_string(),
        Value::String(output_dir.display().to_string()),
    );
    for (key, value) in settings {
        config.insert(key.clone(), Value::String(value.replace("{user}", user)));
    }
    config
}

fn json_file_name(filename: &str) -> String {
    let stem = filename.strip_suffix(".csv").unwrap_or(filename);
    format!("{}.json", stem)
}
