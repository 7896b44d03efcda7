//! Loads the result tables of repeated model runs.
//!
//! A run-set directory holds an `iterations.csv` index and one `NNNN/`
//! subdirectory per iteration. Each iteration is either a single store file
//! (`solution.hdf`, with its two YAML companion documents) or a directory of
//! CSV tables. [`read_dir`] assembles all of them into a [`RunSet`].

pub mod attr;
pub mod error;
pub mod logging;
pub mod read;
pub mod runs;
pub mod table;

#[cfg(test)]
mod testutil;

pub use attr::{AttrMap, Entry};
pub use error::{ReadError, Result};
pub use read::{
    detect_format, read_csv_dir, read_store, Format, ResultSet, REQUIRED_KEYS,
};
pub use runs::{iteration_dir, read_dir, IterationIndex, RunSet};
pub use table::{Frame, Panel, Table, Value};
