// src/error.rs

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::table::TableError;

/// Canonical result for the readers.
pub type Result<T> = std::result::Result<T, ReadError>;

/// Everything that can go wrong while loading result tables.
///
/// The run-set aggregator recovers from an iteration failure only when
/// [`ReadError::is_io`] holds; every other variant aborts the aggregation.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store `{}` missing keys: {}", path.display(), missing.join(", "))]
    MissingKeys { path: PathBuf, missing: Vec<String> },

    #[error("no CSV files found in `{}`", dir.display())]
    NoTablesFound { dir: PathBuf },

    #[error("`{}` is an HDF5 file, not a ZIP/Parquet store", path.display())]
    Hdf5Store { path: PathBuf },

    #[error("`{}` is empty; no header row", path.display())]
    EmptyCsv { path: PathBuf },

    #[error("key `{key}` not found in store `{}`", path.display())]
    KeyNotFound { path: PathBuf, key: String },

    #[error("CSV error in `{}`: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Parquet error in `{}` (key `{key}`): {source}", path.display())]
    Parquet {
        path: PathBuf,
        key: String,
        #[source]
        source: parquet::errors::ParquetError,
    },

    #[error("Arrow error in `{}` (key `{key}`): {source}", path.display())]
    Arrow {
        path: PathBuf,
        key: String,
        #[source]
        source: arrow::error::ArrowError,
    },

    #[error("archive error in `{}`: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("YAML error in `{}`: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("`{}` does not hold a mapping at its top level", path.display())]
    NotAMapping { path: PathBuf },

    #[error("`{}` has invalid iteration label `{label}`", path.display())]
    InvalidIteration { path: PathBuf, label: String },

    #[error("malformed table `{table}` in `{}`: {source}", path.display())]
    Table {
        path: PathBuf,
        table: String,
        #[source]
        source: TableError,
    },
}

impl ReadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ReadError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for I/O-class failures: unreadable or absent files, HDF5 stores
    /// this reader cannot open, and incomplete result sets. Decode and parse
    /// errors are not I/O-class.
    pub fn is_io(&self) -> bool {
        match self {
            ReadError::Io { .. }
            | ReadError::Hdf5Store { .. }
            | ReadError::MissingKeys { .. }
            | ReadError::NoTablesFound { .. } => true,
            ReadError::Csv { source, .. } => source.is_io_error(),
            ReadError::Zip { source, .. } => matches!(
                source,
                zip::result::ZipError::Io(_) | zip::result::ZipError::FileNotFound
            ),
            _ => false,
        }
    }
}
