use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use csv::ReaderBuilder;
use glob::{glob_with, MatchOptions, Pattern};
use tracing::{debug, instrument};

use super::{requested, ResultSet};
use crate::attr::Entry;
use crate::error::{ReadError, Result};
use crate::table::{
    infer::{infer_column, infer_index},
    Frame, Table,
};

/// Loads one run from a directory of `<table>.csv` files.
///
/// Without an explicit list every `*.csv` directly inside `dir` is read,
/// keyed by file stem. A table carrying a `minor` column is folded into a
/// 3-D [`Table::Panel`]. No required-key check and no companion documents:
/// that belongs to the store path only.
#[instrument(level = "debug", skip(dir, tables), fields(dir = %dir.as_ref().display()))]
pub fn read_csv_dir<P: AsRef<Path>>(dir: P, tables: Option<&[String]>) -> Result<ResultSet> {
    let dir = dir.as_ref();
    let names = match requested(tables) {
        Some(t) => t.to_vec(),
        None => {
            let found = list_tables(dir)?;
            if found.is_empty() {
                return Err(ReadError::NoTablesFound {
                    dir: dir.to_path_buf(),
                });
            }
            found
        }
    };

    let mut solution = ResultSet::new();
    for name in names {
        let src = dir.join(format!("{}.csv", name));
        let frame = read_csv_frame(&src, true)?;
        // If `minor` is among the columns, this is a flattened 3-D table.
        let table = Table::from_frame(frame).map_err(|source| ReadError::Table {
            path: src.clone(),
            table: name.clone(),
            source,
        })?;
        debug!(table = %name, ndim = table.ndim(), "loaded table");
        solution.insert(name, Entry::Table(table));
    }
    Ok(solution)
}

/// Reads one CSV file; the first column is the row index, parsed as dates
/// when `parse_dates` is set and every label looks like one. Repeated
/// headers are renamed `name.1`, `name.2`, ...; a file without a header
/// row is [`ReadError::EmptyCsv`].
pub fn read_csv_frame(path: &Path, parse_dates: bool) -> Result<Frame> {
    let file = File::open(path).map_err(|e| ReadError::io(path, e))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));
    let csv_err = |source| ReadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() {
        return Err(ReadError::EmptyCsv {
            path: path.to_path_buf(),
        });
    }
    let headers = dedupe_headers(headers);

    let mut index_raw = Vec::new();
    let mut columns_raw: Vec<Vec<String>> = vec![Vec::new(); headers.len() - 1];
    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        let mut fields = record.iter();
        index_raw.push(fields.next().unwrap_or_default().to_string());
        for (col, field) in columns_raw.iter_mut().zip(fields) {
            col.push(field.to_string());
        }
    }

    let index_name = Some(headers[0].clone()).filter(|h| !h.is_empty());
    let index = infer_index(&index_raw, parse_dates);
    let columns = headers[1..]
        .iter()
        .cloned()
        .zip(columns_raw.iter().map(|raw| infer_column(raw)))
        .collect();
    Frame::new(index_name, index, columns).map_err(|source| ReadError::Table {
        path: path.to_path_buf(),
        table: table_name(path),
        source,
    })
}

/// Renames repeats the way pandas does: `a, a, a.1` becomes `a, a.1, a.1.1`.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|mut name| {
            let mut count = counts.get(&name).copied().unwrap_or(0);
            while count > 0 {
                counts.insert(name.clone(), count + 1);
                name = format!("{}.{}", name, count);
                count = counts.get(&name).copied().unwrap_or(0);
            }
            counts.insert(name.clone(), count + 1);
            name
        })
        .collect()
}

/// File stems of the `*.csv` files directly inside `dir`, sorted. Dotfiles
/// are skipped.
fn list_tables(dir: &Path) -> Result<Vec<String>> {
    let pattern = format!("{}/*.csv", Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let entries = glob_with(&pattern, options).map_err(|e| {
        ReadError::io(dir, io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let path: PathBuf = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            ReadError::io(path, io::Error::from(e))
        })?;
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn table_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
