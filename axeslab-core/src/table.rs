//! In-memory table model: ordered, named, equal-length columns.
//!
//! Column kinds are inferred from cell text at load time. The engine never
//! mutates a table; orderings are returned as row permutations.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;

/// Cell spellings treated as missing values.
pub const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("column not found: {0}")]
    MissingColumn(String),

    #[error("column {0} is not numeric")]
    NotNumeric(String),

    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("column {column} has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
    /// Text whose every present cell parses as a date or date-time.
    Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

pub fn is_missing_token(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell.trim())
}

/// Parse RFC 3339, `%Y-%m-%d %H:%M:%S`, `%Y-%m-%dT%H:%M:%S` or `%Y-%m-%d`.
pub fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    let cell = cell.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(cell) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cell, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    /// Build a column from raw cells: numeric when every present cell
    /// parses as `f64`, text otherwise.
    pub fn infer<S: AsRef<str>>(name: impl Into<String>, cells: &[S]) -> Self {
        let present: Vec<Option<&str>> = cells
            .iter()
            .map(|c| {
                let c = c.as_ref().trim();
                (!is_missing_token(c)).then_some(c)
            })
            .collect();

        let parsed: Option<Vec<Option<f64>>> = present
            .iter()
            .map(|c| match c {
                None => Some(None),
                Some(s) => s.parse::<f64>().ok().map(Some),
            })
            .collect();

        match parsed {
            Some(values) => Self::numeric(name, values),
            None => Self::text(
                name,
                present.into_iter().map(|c| c.map(str::to_string)).collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match &self.data {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Text(cells) => {
                let mut present = cells.iter().flatten().peekable();
                if present.peek().is_some() && present.all(|c| parse_timestamp(c).is_some()) {
                    ColumnKind::Timestamp
                } else {
                    ColumnKind::Text
                }
            }
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    pub fn null_count(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.iter().filter(|c| !matches!(c, Some(x) if x.is_finite())).count(),
            ColumnData::Text(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Cell rendered as text; missing cells render empty.
    pub fn cell_string(&self, row: usize) -> String {
        match &self.data {
            ColumnData::Numeric(v) => match v.get(row).copied().flatten() {
                Some(x) => x.to_string(),
                None => String::new(),
            },
            ColumnData::Text(v) => v.get(row).cloned().flatten().unwrap_or_default(),
        }
    }

    /// Per-row class labels, treating numeric and text cells alike.
    pub fn labels(&self) -> Vec<Option<String>> {
        match &self.data {
            ColumnData::Numeric(v) => v
                .iter()
                .map(|c| c.filter(|x| x.is_finite()).map(|x| x.to_string()))
                .collect(),
            ColumnData::Text(v) => v.clone(),
        }
    }

    /// Encode a text column as codes over its sorted distinct values.
    ///
    /// `None` when the column is numeric or has more than `max_codes`
    /// distinct values.
    pub fn category_codes(&self, max_codes: usize) -> Option<Vec<Option<f64>>> {
        let ColumnData::Text(cells) = &self.data else {
            return None;
        };
        let distinct: BTreeSet<&str> = cells.iter().flatten().map(String::as_str).collect();
        if distinct.len() > max_codes {
            return None;
        }
        let codes: Vec<&str> = distinct.into_iter().collect();
        Some(
            cells
                .iter()
                .map(|c| {
                    c.as_deref()
                        .and_then(|s| codes.binary_search(&s).ok())
                        .map(|i| i as f64)
                })
                .collect(),
        )
    }

    /// Row permutation sorting by this column: numeric and timestamp
    /// columns by value, text lexically. Missing keys go last; ties keep
    /// their original order.
    pub fn sort_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        match (&self.data, self.kind()) {
            (ColumnData::Numeric(v), _) => {
                let keys: Vec<Option<f64>> = v.iter().map(|c| c.filter(|x| !x.is_nan())).collect();
                order.sort_by(|&a, &b| missing_last(keys[a].as_ref(), keys[b].as_ref()));
            }
            (ColumnData::Text(v), ColumnKind::Timestamp) => {
                let keys: Vec<Option<NaiveDateTime>> = v
                    .iter()
                    .map(|c| c.as_deref().and_then(parse_timestamp))
                    .collect();
                order.sort_by(|&a, &b| missing_last(keys[a].as_ref(), keys[b].as_ref()));
            }
            (ColumnData::Text(v), _) => {
                order.sort_by(|&a, &b| missing_last(v[a].as_ref(), v[b].as_ref()));
            }
        }
        order
    }
}

fn missing_last<T: PartialOrd>(a: Option<&T>, b: Option<&T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// An ordered set of named, equal-length columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for c in &columns {
            if !seen.insert(c.name.as_str()) {
                return Err(TableError::DuplicateColumn(c.name.clone()));
            }
        }
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(TableError::LengthMismatch {
                    column: bad.name.clone(),
                    expected,
                    actual: bad.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column, TableError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    pub fn first_column(&self) -> Option<&Column> {
        self.columns.first()
    }

    pub fn last_column(&self) -> Option<&Column> {
        self.columns.last()
    }

    pub fn numeric_values(&self, name: &str) -> Result<&[Option<f64>], TableError> {
        self.column(name)?
            .as_numeric()
            .ok_or_else(|| TableError::NotNumeric(name.to_string()))
    }

    pub fn numeric_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_numeric())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Row permutation ordering the table by `time_column`.
    pub fn time_order(&self, time_column: &str) -> Result<Vec<usize>, TableError> {
        Ok(self.column(time_column)?.sort_order())
    }

    /// Row-major matrix of the named numeric columns; missing cells are NaN.
    pub fn numeric_matrix(&self, names: &[&str]) -> Result<Vec<Vec<f64>>, TableError> {
        let cols = names
            .iter()
            .map(|n| self.numeric_values(n))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((0..self.n_rows())
            .map(|row| cols.iter().map(|c| c[row].unwrap_or(f64::NAN)).collect())
            .collect())
    }
}
