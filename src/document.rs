//! Loading of the desired-state document.
//!
//! The document is a YAML sequence of groups, each optionally holding
//! `entries`. Entries are decoded individually so a single bad entry is
//! reported and skipped instead of rejecting the whole document.

use serde::de::{self, Deserializer, Unexpected};
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{CheckEntry, DesiredEntry, GroupSpec};

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Not a file: {0:?}")]
    NotAFile(PathBuf),
    #[error("Failed to read document {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse document {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Deserialize, Debug)]
struct RawGroup {
    name: String,
    #[serde(default = "default_public", deserialize_with = "yaml11_bool")]
    public: bool,
    #[serde(default)]
    entries: Option<Vec<Value>>,
}

fn default_public() -> bool {
    true
}

/// Accepts YAML 1.1 boolean spellings (`yes`, `no`, `on`, `off`) alongside
/// real booleans. serde_yaml only understands the YAML 1.2 core schema.
fn yaml11_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(flag) => Ok(flag),
        Value::String(text) => match text.to_ascii_lowercase().as_str() {
            "yes" | "true" | "on" => Ok(true),
            "no" | "false" | "off" => Ok(false),
            _ => Err(de::Error::invalid_value(
                Unexpected::Str(&text),
                &"a boolean (true/false, yes/no, on/off)",
            )),
        },
        other => Err(de::Error::custom(format!("expected a boolean, found {other:?}"))),
    }
}

pub fn load_document(path: &Path) -> Result<Vec<GroupSpec>, DocumentError> {
    if !path.is_file() {
        return Err(DocumentError::NotAFile(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let groups = parse_document(&contents).map_err(|source| DocumentError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = ?path, groups = groups.len(), "Loaded desired-state document.");
    Ok(groups)
}

pub fn parse_document(contents: &str) -> Result<Vec<GroupSpec>, serde_yaml::Error> {
    let is_blank = contents.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    });
    if is_blank {
        return Ok(Vec::new());
    }

    // `<<: *anchor` keys are resolved before any entry is decoded.
    let mut value: Value = serde_yaml::from_str(contents)?;
    value.apply_merge()?;
    let raw: Option<Vec<RawGroup>> = serde_yaml::from_value(value)?;

    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|group| GroupSpec {
            name: group.name,
            public: group.public,
            entries: group
                .entries
                .unwrap_or_default()
                .into_iter()
                .map(decode_entry)
                .collect(),
        })
        .collect())
}

fn decode_entry(value: Value) -> DesiredEntry {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string);

    match serde_yaml::from_value::<CheckEntry>(value) {
        Ok(entry) => DesiredEntry::Valid(entry),
        Err(e) => {
            debug!(check = ?name, error = %e, "Entry does not describe a check.");
            DesiredEntry::Malformed {
                name,
                reason: e.to_string(),
            }
        }
    }
}
