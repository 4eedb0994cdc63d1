use std::str::FromStr;
use serde::Deserialize;

/// Canonical stack name type used as the DAG node key.
pub type StackName = String;

/// Mode for storing deployed-stack hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashStorageMode {
    /// Store hashes in a file (`.cfngin/hashes`).
    File,
    /// Store hashes in memory only (lost on restart).
    Memory,
}

impl Default for HashStorageMode {
    fn default() -> Self {
        HashStorageMode::Memory
    }
}

/// Output format for `cfngin graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphFormat {
    Dot,
    Json,
}

impl Default for GraphFormat {
    fn default() -> Self {
        GraphFormat::Dot
    }
}

impl FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dot" => Ok(GraphFormat::Dot),
            "json" => Ok(GraphFormat::Json),
            other => Err(format!(
                "invalid graph format: {other} (expected \"dot\" or \"json\")"
            )),
        }
    }
}
