//! Request and response shapes for column mapping and validation

use serde::de::{self, MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use crate::errors::{AppError, AppResult};

/// Original column name → target column name, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    entries: Vec<(String, String)>,
}

impl Mapping {
    /// Build a mapping, rejecting duplicate source columns
    pub fn new<I, K, V>(pairs: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut mapping = Self::default();
        for (source, target) in pairs {
            mapping.insert(source.into(), target.into())?;
        }
        Ok(mapping)
    }

    fn insert(&mut self, source: String, target: String) -> AppResult<()> {
        if self.get(&source).is_some() {
            return Err(AppError::validation(format!(
                "mapping lists column '{}' more than once",
                source
            )));
        }
        self.entries.push((source, target));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Target name for a source column
    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, t)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, t)| (s.as_str(), t.as_str()))
    }

    /// Target names in mapping order
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, t)| t.as_str())
    }

    /// Source column that maps onto `target`.
    ///
    /// Fails when no source maps to it, or when several do: picking one
    /// of them would validate a column the caller may not have meant.
    pub fn source_for(&self, target: &str) -> AppResult<&str> {
        let mut sources = self
            .entries
            .iter()
            .filter(|(_, t)| t == target)
            .map(|(s, _)| s.as_str());

        let first = sources.next().ok_or_else(|| {
            AppError::validation(format!("no column in the mapping maps to '{}'", target))
        })?;

        let others: Vec<&str> = sources.collect();
        if !others.is_empty() {
            return Err(AppError::validation(format!(
                "mapping is ambiguous: '{}' is the target of '{}' and '{}'",
                target,
                first,
                others.join("', '")
            )));
        }
        Ok(first)
    }

    /// Mapping with source and target swapped, when it is injective
    pub fn inverted(&self) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for target in self.targets() {
            if !seen.insert(target) {
                return Err(AppError::validation(format!(
                    "mapping cannot be inverted: '{}' is targeted more than once",
                    target
                )));
            }
        }
        Self::new(self.iter().map(|(s, t)| (t.to_string(), s.to_string())))
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (source, target) in &self.entries {
            map.serialize_entry(source, target)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = Mapping;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of column name to column name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Mapping, A::Error> {
                let mut mapping = Mapping::default();
                while let Some((source, target)) = access.next_entry::<String, String>()? {
                    mapping.insert(source, target).map_err(de::Error::custom)?;
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}

/// A target column with an optional validator regex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub col: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
}

/// The set of fields a mapped file is expected to provide
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Fields that carry a validator, with the pattern
    pub fn validated_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter_map(|f| f.validator.as_deref().map(|v| (f.col.as_str(), v)))
    }
}

/// Validation outcome for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldReport {
    /// Share of valid values, e.g. `"75.00%"`
    pub percent: String,
    /// A sample of the invalid raw values, missing values as `""`
    pub rows: Vec<String>,
}

/// Per-column validation results, serialized as an object in schema order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    fields: Vec<(String, FieldReport)>,
}

impl ValidationReport {
    pub fn insert(&mut self, col: String, report: FieldReport) {
        match self.fields.iter_mut().find(|(c, _)| *c == col) {
            Some((_, existing)) => *existing = report,
            None => self.fields.push((col, report)),
        }
    }

    pub fn get(&self, col: &str) -> Option<&FieldReport> {
        self.fields.iter().find(|(c, _)| c == col).map(|(_, r)| r)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ValidationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (col, report) in &self.fields {
            map.serialize_entry(col, report)?;
        }
        map.end()
    }
}

/// Header row followed by the first data rows, serialized as a list of lists
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub header: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl Serialize for Preview {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len() + 1))?;
        seq.serialize_element(&self.header)?;
        for row in &self.rows {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}
