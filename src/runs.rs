// src/runs.rs

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use tracing::{debug, instrument, warn};

use crate::error::{ReadError, Result};
use crate::read::{detect_format, read_csv_dir, read_csv_frame, read_store, Format, ResultSet, STORE_FILE};
use crate::table::{Frame, Value};

/// Index file listing the iterations of a run-set.
pub const ITERATIONS_FILE: &str = "iterations.csv";

/// The `iterations.csv` table: one row per iteration, indexed by iteration
/// number, with whatever parameter columns the run-set varied.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationIndex {
    frame: Frame,
    iterations: Vec<u32>,
}

impl IterationIndex {
    /// Reads `path`; every index label must be a non-negative integer.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let frame = read_csv_frame(path, false)?;
        let iterations = frame
            .index()
            .iter()
            .map(|label| {
                let iteration = match label {
                    Value::Int(i) => u32::try_from(*i).ok(),
                    _ => None,
                };
                iteration.ok_or_else(|| ReadError::InvalidIteration {
                    path: path.to_path_buf(),
                    label: label.to_string(),
                })
            })
            .collect::<Result<Vec<u32>>>()?;
        Ok(Self { frame, iterations })
    }

    /// Iteration numbers in file order.
    pub fn iterations(&self) -> &[u32] {
        &self.iterations
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }
}

/// An iteration index plus one result set per iteration. Iterations that
/// could not be read hold an empty result set.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSet {
    pub iterations: IterationIndex,
    pub solutions: BTreeMap<u32, ResultSet>,
}

impl RunSet {
    pub fn solution(&self, iteration: u32) -> Option<&ResultSet> {
        self.solutions.get(&iteration)
    }

    /// Iterations whose result set is empty.
    pub fn failed_iterations(&self) -> Vec<u32> {
        self.solutions
            .iter()
            .filter(|(_, s)| s.is_empty())
            .map(|(i, _)| *i)
            .collect()
    }
}

/// `<root>/NNNN`, the iteration number zero-padded to at least four digits.
pub fn iteration_dir(root: &Path, iteration: u32) -> PathBuf {
    root.join(format!("{:04}", iteration))
}

/// Combines the per-iteration results under `dir` into one [`RunSet`].
///
/// The iteration index must be readable; its failure aborts the call. Each
/// iteration's format is detected on its own. An I/O-class failure while
/// reading an iteration is logged and leaves an empty result set in its
/// place; any other failure aborts the call.
#[instrument(level = "info", skip(dir, tables), fields(dir = %dir.as_ref().display()))]
pub fn read_dir<P: AsRef<Path>>(dir: P, tables: Option<&[String]>) -> Result<RunSet> {
    let dir = dir.as_ref();
    let iterations = IterationIndex::from_csv(&dir.join(ITERATIONS_FILE))?;

    let mut solutions = BTreeMap::new();
    for &i in iterations.iterations() {
        let run_dir = iteration_dir(dir, i);
        let fmt = detect_format(&run_dir);
        debug!(iteration = i, format = %fmt, "format detected");

        let result = match fmt {
            Format::Hdf => {
                let store = run_dir.join(STORE_FILE);
                debug!(path = %store.display(), "read store");
                read_store(&store, tables)
            }
            Format::Csv => {
                debug!(path = %run_dir.display(), "read CSV directory");
                read_csv_dir(&run_dir, tables)
            }
        };

        let solution = match result {
            Ok(solution) => solution,
            Err(err) if err.is_io() => {
                warn!(
                    dir = %run_dir.display(),
                    iteration = i,
                    error = %err,
                    "I/O error reading iteration, leaving it empty"
                );
                ResultSet::new()
            }
            Err(err) => return Err(err),
        };
        solutions.insert(i, solution);
    }

    Ok(RunSet {
        iterations,
        solutions,
    })
}
