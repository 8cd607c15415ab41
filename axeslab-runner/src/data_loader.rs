//! CSV loading into the core table model.
//!
//! The first row is the header. Fields are trimmed; empty, `NA`, `NaN`,
//! `null` and similar cells are missing. Each column's kind is inferred
//! from all of its cells (see [`Column::infer`]). Tables are written back
//! with missing cells left empty.

use std::io::{Read, Write};
use std::path::Path;

use axeslab_core::{Column, Dataset, TableError};
use thiserror::Error;
use tracing::debug;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("input has no header row")]
    NoHeader,

    #[error("empty column name at position {0}")]
    EmptyHeader(usize),

    #[error("invalid table: {0}")]
    Table(#[from] TableError),
}

/// Load a CSV file with a header row.
pub fn load_csv(path: &Path) -> Result<Dataset, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let dataset = read_csv(file)?;
    debug!(
        path = %path.display(),
        rows = dataset.n_rows(),
        columns = dataset.n_columns(),
        "loaded CSV"
    );
    Ok(dataset)
}

/// Read CSV from any reader.
///
/// Rows must all have the header's width; the `csv` reader rejects ragged
/// records.
pub fn read_csv<R: Read>(reader: R) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(LoadError::NoHeader);
    }
    if let Some(pos) = headers.iter().position(|h| h.is_empty()) {
        return Err(LoadError::EmptyHeader(pos));
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (column, field) in cells.iter_mut().zip(record.iter()) {
            column.push(field.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| Column::infer(name, &raw))
        .collect();
    Ok(Dataset::new(columns)?)
}

/// Write `data` as CSV with a header row, creating parent directories.
pub fn save_csv(path: &Path, data: &Dataset) -> Result<(), LoadError> {
    let io_err = |source| LoadError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = std::fs::File::create(path).map_err(io_err)?;
    write_csv(file, data)?;
    debug!(path = %path.display(), rows = data.n_rows(), "wrote CSV");
    Ok(())
}

/// Write `data` as CSV to any writer.
pub fn write_csv<W: Write>(writer: W, data: &Dataset) -> Result<(), LoadError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(data.column_names())?;
    for row in 0..data.n_rows() {
        writer.write_record(data.columns().iter().map(|c| c.cell_string(row)))?;
    }
    writer.flush().map_err(|e| LoadError::Csv(e.into()))?;
    Ok(())
}
