//! Readers for a single run's result tables.
//!
//! A run is stored either as one columnar store file (`solution.hdf`) or as
//! a directory with one CSV file per table. [`detect_format`] picks between
//! the two.

pub mod csv_dir;
pub mod store;

use std::{fmt, path::Path};

use crate::attr::AttrMap;

pub use csv_dir::{read_csv_dir, read_csv_frame};
pub use store::read_store;

/// All tables of one run plus its `config_run` and `config_model` documents.
pub type ResultSet = AttrMap;

/// Tables every complete store must hold.
pub const REQUIRED_KEYS: [&str; 11] = [
    "capacity_factor",
    "costs",
    "levelized_cost",
    "locations",
    "metadata",
    "node",
    "parameters",
    "shares",
    "summary",
    "time_res",
    "totals",
];

pub const STORE_FILE: &str = "solution.hdf";
pub const CONFIG_RUN_KEY: &str = "config_run";
pub const CONFIG_MODEL_KEY: &str = "config_model";
pub const CONFIG_RUN_SUFFIX: &str = ".config_run.yaml";
pub const CONFIG_MODEL_SUFFIX: &str = ".config_model.yaml";

/// On-disk layout of one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Hdf,
    Csv,
}

impl Format {
    pub fn as_str(&self) -> &str {
        match self {
            Format::Hdf => "hdf",
            Format::Csv => "csv",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Hdf` if `dir/solution.hdf` exists, `Csv` otherwise.
pub fn detect_format(dir: impl AsRef<Path>) -> Format {
    if dir.as_ref().join(STORE_FILE).exists() {
        Format::Hdf
    } else {
        Format::Csv
    }
}

/// `None` and an empty list both mean "read everything available".
pub(crate) fn requested(tables: Option<&[String]>) -> Option<&[String]> {
    tables.filter(|t| !t.is_empty())
}
