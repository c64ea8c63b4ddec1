//! Dataset scoping and request translation.
//!
//! Describes *what* to load and score independently of any backend:
//! - `DatasetScope`: which (make, model, year) rows are scored
//! - `SheetRequest`: which spreadsheet range to fetch, and its cache key
//! - `ListingsQuery`: year-range listing search, translated per API dialect

use carcupid_features::{columns, strict_number, Dataset};
use carcupid_model::Row;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("Missing sheet ID")]
    EmptySheetId,
    #[error("Invalid target (expected make|model): {0}")]
    InvalidTarget(String),
}

/// Default range of the vehicle database tab.
pub const DEFAULT_RANGE: &str = "DATABASE";

/// Default scoped model year.
pub const DEFAULT_YEAR: f64 = 2024.0;

/// Default (make, model) allow-list.
pub const DEFAULT_TARGETS: [&str; 5] = [
    "bmw|3 series",
    "ford|f-150",
    "ford|f-150 lightning",
    "toyota|prius",
    "toyota|prius plug-in",
];

fn target_key(make: &str, model: &str) -> String {
    format!("{}|{}", make.trim().to_lowercase(), model.trim().to_lowercase())
}

/// Restricts a dataset to an allow-list of vehicles and a model year.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetScope {
    /// Every body row
    All,
    Targets {
        year: f64,
        /// Lower-cased `make|model` keys
        targets: HashSet<String>,
    },
}

impl Default for DatasetScope {
    fn default() -> Self {
        Self::Targets {
            year: DEFAULT_YEAR,
            targets: DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl DatasetScope {
    pub fn all() -> Self {
        Self::All
    }

    /// Build a scope from `make|model` strings.
    pub fn targets<I, S>(year: f64, targets: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let targets = targets
            .into_iter()
            .map(|t| {
                let t = t.as_ref();
                t.split_once('|')
                    .map(|(make, model)| target_key(make, model))
                    .ok_or_else(|| QueryError::InvalidTarget(t.to_string()))
            })
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Self::Targets { year, targets })
    }

    /// Replace the year, keeping the allow-list.
    pub fn with_year(self, year: f64) -> Self {
        match self {
            Self::All => Self::All,
            Self::Targets { targets, .. } => Self::Targets { year, targets },
        }
    }

    /// Whether a row belongs to the scope.
    pub fn matches(&self, dataset: &Dataset, row: &[carcupid_model::Cell]) -> bool {
        match self {
            Self::All => true,
            Self::Targets { year, targets } => {
                let index = &dataset.index;
                let row_year = strict_number(index.get(row, columns::YEAR));
                if row_year != Some(*year) {
                    return false;
                }
                let make = index.get(row, columns::MAKE).to_text();
                let model = index.get(row, columns::MODEL).to_text();
                targets.contains(&target_key(&make, &model))
            }
        }
    }

    /// Rows of `dataset` within the scope, in sheet order.
    pub fn filter<'a>(&self, dataset: &'a Dataset) -> Vec<&'a Row> {
        dataset
            .rows
            .iter()
            .filter(|row| self.matches(dataset, row))
            .collect()
    }
}

/// A spreadsheet range to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRequest {
    pub spreadsheet_id: String,
    pub range: String,
}

impl SheetRequest {
    pub fn new(spreadsheet_id: impl Into<String>, range: Option<String>) -> Result<Self, QueryError> {
        let spreadsheet_id = spreadsheet_id.into();
        if spreadsheet_id.trim().is_empty() {
            return Err(QueryError::EmptySheetId);
        }
        let range = range
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RANGE.to_string());
        Ok(Self {
            spreadsheet_id,
            range,
        })
    }

    /// Key under which the fetched grid is cached.
    pub fn cache_key(&self) -> String {
        format!("sheet:{}:{}", self.spreadsheet_id, self.range)
    }
}

/// Paged listing search over a model-year range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingsQuery {
    pub start_year: u32,
    pub end_year: u32,
    /// Items per page
    pub limit: u32,
    pub pages: u32,
}

impl Default for ListingsQuery {
    fn default() -> Self {
        Self {
            start_year: 2018,
            end_year: 2025,
            limit: 100,
            pages: 3,
        }
    }
}

impl ListingsQuery {
    pub fn new(start_year: u32, end_year: u32) -> Self {
        Self {
            start_year,
            end_year,
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_pages(mut self, pages: u32) -> Self {
        self.pages = pages;
        self
    }

    /// Bring every field into the range the API accepts.
    pub fn clamped(&self) -> Self {
        let start_year = self.start_year.clamp(1900, 2100);
        Self {
            start_year,
            end_year: self.end_year.clamp(start_year, 2100),
            limit: self.limit.clamp(20, 200),
            pages: self.pages.clamp(1, 20),
        }
    }
}

/// Trait for translating queries to backend-specific syntax.
pub trait QueryDialect {
    type Output;

    /// Translate one page of a listings query.
    fn translate(&self, query: &ListingsQuery, page: u32) -> Self::Output;
}

/// auto.dev listings parameters.
#[derive(Debug, Default)]
pub struct AutoDevDialect;

impl QueryDialect for AutoDevDialect {
    type Output = Vec<(String, String)>;

    fn translate(&self, query: &ListingsQuery, page: u32) -> Vec<(String, String)> {
        // Only the vehicle.* prefixed year filter is honoured by the API.
        vec![
            ("limit".to_string(), query.limit.to_string()),
            ("page".to_string(), page.to_string()),
            (
                "vehicle.year".to_string(),
                format!("{}-{}", query.start_year, query.end_year),
            ),
        ]
    }
}
