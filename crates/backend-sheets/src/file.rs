//! Grid stored as JSON on disk.

use crate::{BackendError, TabularSource};
use carcupid_model::Grid;
use carcupid_query::SheetRequest;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize)]
struct ValuesEnvelope {
    #[serde(default)]
    values: Grid,
}

/// Accepts a bare grid or the `{"data": {"values": ...}}` proxy envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum GridFile {
    Grid(Grid),
    Envelope { data: ValuesEnvelope },
}

/// Parse grid JSON in either accepted shape.
pub fn parse_grid(json: &str) -> Result<Grid, BackendError> {
    let file: GridFile =
        serde_json::from_str(json).map_err(|e| BackendError::ParseError(e.to_string()))?;
    Ok(match file {
        GridFile::Grid(grid) => grid,
        GridFile::Envelope { data } => data.values,
    })
}

/// Reads a grid exported to a local file. The sheet request is ignored.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TabularSource for FileSource {
    async fn fetch_grid(&self, _request: &SheetRequest) -> Result<Grid, BackendError> {
        tracing::debug!(path = %self.path.display(), "Reading grid file");
        let json = tokio::fs::read_to_string(&self.path).await?;
        parse_grid(&json)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
