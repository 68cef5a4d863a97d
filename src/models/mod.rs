use serde::{Deserialize, Serialize};
use std::fmt;

pub mod data_mapping;

pub use data_mapping::{FieldDescriptor, FieldReport, Mapping, Preview, Schema, ValidationReport};

/// Points in a file's lifecycle that are announced to the webhook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    #[serde(rename = "file.uploaded")]
    FileUploaded,
    #[serde(rename = "mapping.completed")]
    MappingCompleted,
    #[serde(rename = "mapping.validation")]
    MappingValidation,
    #[serde(rename = "data.exported")]
    DataExported,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileUploaded => "file.uploaded",
            Self::MappingCompleted => "mapping.completed",
            Self::MappingValidation => "mapping.validation",
            Self::DataExported => "data.exported",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a lifecycle webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub user: String,
    pub lifecycle: Lifecycle,
}
