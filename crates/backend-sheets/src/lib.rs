//! Tabular data sources for the vehicle dataset.
//!
//! Provides the `TabularSource` trait and its implementations:
//! - `SheetsBackend`: Google Sheets values API
//! - `FileSource`: a JSON grid on disk
//! - `CachedSource`: wraps any source with a `CacheStore`

pub mod cache;
pub mod file;
pub mod sheets;

pub use cache::{CacheStore, CachedSource, DirCache, SessionCache};
pub use file::FileSource;
pub use sheets::{ServiceAccount, SheetInfo, SheetsAuth, SheetsBackend, SheetsConfig};

use carcupid_model::Grid;
use carcupid_query::SheetRequest;
use std::future::Future;
use thiserror::Error;

/// Errors from tabular source operations.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for sources of a two-dimensional cell grid.
pub trait TabularSource {
    /// Fetch the full grid for a sheet range.
    fn fetch_grid(
        &self,
        request: &SheetRequest,
    ) -> impl Future<Output = Result<Grid, BackendError>> + Send;

    /// Get the source name for logging.
    fn name(&self) -> &'static str;
}
