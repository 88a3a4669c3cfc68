//! Tabular dataset reference.
//!
//! The engine never parses the data itself: agents only see the dataset
//! name and column list, and the generated script loads the full file
//! at execution time. Only the CSV header row is read here.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::info;

/// A read-only reference to one loaded dataset. Shared across requests,
/// never mutated by any agent invocation.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetRef {
    /// Frame name agents refer to (`df_name`).
    pub name: String,
    /// Path the generated script should load the data from.
    pub path: PathBuf,
    /// Column names from the header row.
    pub columns: Vec<String>,
}

impl DatasetRef {
    /// Build a reference from a CSV file by reading its header row.
    ///
    /// `name` overrides the frame name; defaults to the file stem.
    pub fn from_csv(path: &Path, name: Option<&str>) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open dataset: {}", path.display()))?;

        let mut header = String::new();
        BufReader::new(file)
            .read_line(&mut header)
            .with_context(|| format!("Failed to read header row: {}", path.display()))?;

        let columns = parse_header(&header);
        if columns.is_empty() {
            bail!("Dataset has no header row: {}", path.display());
        }

        let name = match name {
            Some(n) => n.to_string(),
            None => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "dataset".to_string()),
        };

        info!("Loaded dataset '{}' with {} columns", name, columns.len());

        Ok(Self {
            name,
            path: path.to_path_buf(),
            columns,
        })
    }

    /// The summary exposed to agents: name and columns, never the data.
    pub fn summary(&self) -> String {
        format!(
            "df_name: {} (file: {})\ncolumns: {}\nSet df as a copy of df_name before analysis.",
            self.name,
            self.path.display(),
            self.columns.join(", ")
        )
    }
}

/// Split a CSV header row into trimmed, unquoted column names.
fn parse_header(header: &str) -> Vec<String> {
    header
        .trim()
        .split(',')
        .map(|col| col.trim().trim_matches('"').trim().to_string())
        .filter(|col| !col.is_empty())
        .collect()
}
