use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs::File,
    io::{self, Read, Seek},
    path::{Path, PathBuf},
};

use arrow::{
    array::{Array, ArrayRef, AsArray},
    datatypes::{
        DataType, Date32Type, Date64Type, Float16Type, Float32Type, Float64Type, Int16Type,
        Int32Type, Int64Type, Int8Type, TimeUnit, TimestampMicrosecondType,
        TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType, UInt16Type,
        UInt32Type, UInt64Type, UInt8Type,
    },
    record_batch::{RecordBatch, RecordBatchReader},
    util::display::array_value_to_string,
};
use bytes::Bytes;
use chrono::{DateTime, NaiveDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::{debug, instrument};
use zip::ZipArchive;

use super::{
    requested, ResultSet, CONFIG_MODEL_KEY, CONFIG_MODEL_SUFFIX, CONFIG_RUN_KEY,
    CONFIG_RUN_SUFFIX, REQUIRED_KEYS,
};
use crate::attr::{AttrMap, Entry};
use crate::error::{ReadError, Result};
use crate::table::{Frame, Table, Value};

const MEMBER_SUFFIX: &str = ".parquet";
/// Format signature at the start of an HDF5 file.
const HDF5_SIGNATURE: &[u8; 8] = b"\x89HDF\r\n\x1a\n";
/// Column pandas writes for an unnamed row index.
const PANDAS_INDEX: &str = "__index_level_0__";

/// Loads one run from a single store file plus its two companion documents.
///
/// The store is a ZIP container with one Parquet member per table. Without
/// an explicit list every member is read. An HDF5 file under the store name
/// is [`ReadError::Hdf5Store`], which is I/O-class. Fails with
/// [`ReadError::MissingKeys`] when any of [`REQUIRED_KEYS`] is absent
/// afterwards. The companion documents are `<file>.config_run.yaml` and
/// `<file>.config_model.yaml`, stored under `config_run` and `config_model`.
#[instrument(level = "debug", skip(path, tables), fields(path = %path.as_ref().display()))]
pub fn read_store<P: AsRef<Path>>(path: P, tables: Option<&[String]>) -> Result<ResultSet> {
    let path = path.as_ref();
    let mut solution = read_tables(path, tables)?;

    let mut missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|k| !solution.contains_key(k))
        .map(|k| k.to_string())
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(ReadError::MissingKeys {
            path: path.to_path_buf(),
            missing,
        });
    }

    let config_run = AttrMap::from_yaml_file(companion(path, CONFIG_RUN_SUFFIX))?;
    let config_model = AttrMap::from_yaml_file(companion(path, CONFIG_MODEL_SUFFIX))?;
    solution.insert(CONFIG_RUN_KEY, Entry::Map(config_run));
    solution.insert(CONFIG_MODEL_KEY, Entry::Map(config_model));
    Ok(solution)
}

/// `<file><suffix>`, appended to the full file name.
fn companion(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Opens the container read-only and decodes the requested members. The
/// archive (and its file handle) is dropped before returning.
fn read_tables(path: &Path, tables: Option<&[String]>) -> Result<ResultSet> {
    let mut file = File::open(path).map_err(|e| ReadError::io(path, e))?;
    if is_hdf5(&mut file).map_err(|e| ReadError::io(path, e))? {
        return Err(ReadError::Hdf5Store {
            path: path.to_path_buf(),
        });
    }
    let mut archive = ZipArchive::new(file).map_err(|source| ReadError::Zip {
        path: path.to_path_buf(),
        source,
    })?;

    // key → member name; keys lose the suffix and any leading/trailing '/'
    let members: BTreeMap<String, String> = archive
        .file_names()
        .filter_map(|name| member_key(name).map(|key| (key, name.to_string())))
        .collect();

    let keys: Vec<String> = match requested(tables) {
        Some(t) => t.to_vec(),
        None => members.keys().cloned().collect(),
    };

    let mut solution = ResultSet::new();
    for requested_key in keys {
        let key = requested_key.trim_matches('/').to_string();
        let member = members.get(&key).ok_or_else(|| ReadError::KeyNotFound {
            path: path.to_path_buf(),
            key: requested_key.clone(),
        })?;

        let mut entry = archive.by_name(member).map_err(|source| ReadError::Zip {
            path: path.to_path_buf(),
            source,
        })?;
        let mut buf = Vec::new();
        entry
            .read_to_end(&mut buf)
            .map_err(|e| ReadError::io(path, e))?;
        drop(entry);

        let frame = decode_member(path, &key, Bytes::from(buf))?;
        let table = Table::from_frame(frame).map_err(|source| ReadError::Table {
            path: path.to_path_buf(),
            table: key.clone(),
            source,
        })?;
        debug!(key = %key, ndim = table.ndim(), "loaded table");
        solution.insert(key, Entry::Table(table));
    }
    drop(archive);
    Ok(solution)
}

/// Checks the signature, then rewinds.
fn is_hdf5(file: &mut File) -> io::Result<bool> {
    let mut magic = Vec::with_capacity(HDF5_SIGNATURE.len());
    file.by_ref()
        .take(HDF5_SIGNATURE.len() as u64)
        .read_to_end(&mut magic)?;
    file.rewind()?;
    Ok(magic == HDF5_SIGNATURE)
}

/// `costs.parquet` and `/costs.parquet` both yield `costs`.
fn member_key(name: &str) -> Option<String> {
    name.strip_suffix(MEMBER_SUFFIX)
        .map(|stem| stem.trim_matches('/').to_string())
        .filter(|key| !key.is_empty())
}

fn decode_member(path: &Path, key: &str, data: Bytes) -> Result<Frame> {
    let parquet_err = |source| ReadError::Parquet {
        path: path.to_path_buf(),
        key: key.to_string(),
        source,
    };
    let reader = ParquetRecordBatchReaderBuilder::try_new(data)
        .map_err(parquet_err)?
        .build()
        .map_err(parquet_err)?;
    let schema = reader.schema();
    let batches = reader
        .collect::<std::result::Result<Vec<RecordBatch>, _>>()
        .map_err(|source| ReadError::Arrow {
            path: path.to_path_buf(),
            key: key.to_string(),
            source,
        })?;

    let mut columns: Vec<(String, Vec<Value>)> = schema
        .fields()
        .iter()
        .map(|f| (f.name().clone(), Vec::new()))
        .collect();
    for batch in &batches {
        for (i, (_, values)) in columns.iter_mut().enumerate() {
            values.extend(array_values(batch.column(i)));
        }
    }
    if columns.is_empty() {
        return Ok(Frame::default());
    }

    let index_pos = columns
        .iter()
        .position(|(name, _)| name == PANDAS_INDEX)
        .unwrap_or(0);
    let (index_name, index) = columns.remove(index_pos);
    let index_name = Some(index_name).filter(|n| n != PANDAS_INDEX);

    Frame::new(index_name, index, columns).map_err(|source| ReadError::Table {
        path: path.to_path_buf(),
        table: key.to_string(),
        source,
    })
}

/// Converts one Arrow column into cells.
fn array_values(array: &ArrayRef) -> Vec<Value> {
    (0..array.len())
        .map(|row| {
            if array.is_null(row) {
                Value::Null
            } else {
                cell(array, row)
            }
        })
        .collect()
}

fn cell(array: &ArrayRef, row: usize) -> Value {
    match array.data_type() {
        DataType::Boolean => Value::Bool(array.as_boolean().value(row)),
        DataType::Int8 => Value::Int(array.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => Value::Int(array.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => Value::Int(array.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => Value::Int(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::Int(array.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => Value::Int(array.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => Value::Int(array.as_primitive::<UInt32Type>().value(row).into()),
        DataType::UInt64 => {
            let v = array.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v).map_or(Value::Float(v as f64), Value::Int)
        }
        DataType::Float16 => {
            Value::Float(array.as_primitive::<Float16Type>().value(row).to_f64())
        }
        DataType::Float32 => {
            Value::Float(array.as_primitive::<Float32Type>().value(row).into())
        }
        DataType::Float64 => Value::Float(array.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Value::Str(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::Str(array.as_string::<i64>().value(row).to_string()),
        DataType::Utf8View => Value::Str(array.as_string_view().value(row).to_string()),
        DataType::Timestamp(unit, _) => {
            let (secs, nanos) = match unit {
                TimeUnit::Second => {
                    (array.as_primitive::<TimestampSecondType>().value(row), 0)
                }
                TimeUnit::Millisecond => split(
                    array.as_primitive::<TimestampMillisecondType>().value(row),
                    1_000,
                ),
                TimeUnit::Microsecond => split(
                    array.as_primitive::<TimestampMicrosecondType>().value(row),
                    1_000_000,
                ),
                TimeUnit::Nanosecond => split(
                    array.as_primitive::<TimestampNanosecondType>().value(row),
                    1_000_000_000,
                ),
            };
            timestamp(secs, nanos).unwrap_or(Value::Null)
        }
        DataType::Date32 => {
            let days = array.as_primitive::<Date32Type>().value(row);
            NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days.into())))
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(Value::Null, Value::Timestamp)
        }
        DataType::Date64 => {
            let (secs, nanos) = split(array.as_primitive::<Date64Type>().value(row), 1_000);
            timestamp(secs, nanos).unwrap_or(Value::Null)
        }
        _ => array_value_to_string(array.as_ref(), row)
            .map(Value::Str)
            .unwrap_or(Value::Null),
    }
}

/// Splits a count of `per_sec` ticks into whole seconds and nanoseconds.
fn split(ticks: i64, per_sec: i64) -> (i64, u32) {
    let secs = ticks.div_euclid(per_sec);
    let rem = ticks.rem_euclid(per_sec);
    (secs, (rem * (1_000_000_000 / per_sec)) as u32)
}

fn timestamp(secs: i64, nanos: u32) -> Option<Value> {
    DateTime::from_timestamp(secs, nanos)
        .map(|dt| dt.naive_utc())
        .map(Value::Timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{init_test_logging, write_companions, write_store, StoreMember};
    use anyhow::Result;

    fn required() -> Vec<StoreMember> {
        REQUIRED_KEYS
            .iter()
            .map(|k| StoreMember::simple(k))
            .collect()
    }

    #[test]
    fn reads_complete_store_with_companions() -> Result<()> {
        init_test_logging();
        let dir = tempfile::tempdir()?;
        let store = dir.path().join("solution.hdf");
        write_store(&store, &required())?;
        write_companions(&store)?;

        let solution = read_store(&store, None)?;
        let mut expected: Vec<&str> = REQUIRED_KEYS.to_vec();
        expected.extend([CONFIG_RUN_KEY, CONFIG_MODEL_KEY]);
        expected.sort();
        assert_eq!(solution.keys().collect::<Vec<_>>(), expected);

        let costs = solution.table("costs").and_then(Table::as_frame).unwrap();
        assert_eq!(costs.index(), [Value::from("r1"), Value::from("r2")]);
        assert_eq!(costs.get(&Value::from("r2"), "value"), Some(&Value::Float(2.0)));

        let run = solution.map(CONFIG_RUN_KEY).unwrap();
        assert_eq!(run.scalar("name"), Some(&Value::from("run")));
        Ok(())
    }

    #[test]
    fn names_the_missing_key() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = dir.path().join("solution.hdf");
        let members: Vec<StoreMember> = required()
            .into_iter()
            .filter(|m| m.name != "shares")
            .collect();
        write_store(&store, &members)?;
        write_companions(&store)?;

        match read_store(&store, None) {
            Err(ReadError::MissingKeys { missing, .. }) => assert_eq!(missing, ["shares"]),
            other => panic!("expected MissingKeys, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn explicit_keys_must_exist() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = dir.path().join("solution.hdf");
        write_store(&store, &required())?;
        write_companions(&store)?;

        let err = read_store(&store, Some(&["nope".to_string()][..])).unwrap_err();
        assert!(matches!(err, ReadError::KeyNotFound { ref key, .. } if key == "nope"));
        assert!(!err.is_io());

        // a subset that drops required tables fails the completeness check
        let err = read_store(&store, Some(&["/costs".to_string()][..])).unwrap_err();
        assert!(matches!(err, ReadError::MissingKeys { .. }));
        Ok(())
    }

    #[test]
    fn missing_companion_is_io() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = dir.path().join("solution.hdf");
        write_store(&store, &required())?;

        let err = read_store(&store, None).unwrap_err();
        assert!(matches!(err, ReadError::Io { ref path, .. }
            if path.to_string_lossy().ends_with("solution.hdf.config_run.yaml")));
        assert!(err.is_io());
        Ok(())
    }

    #[test]
    fn absent_store_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_store(dir.path().join("solution.hdf"), None).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn flattened_member_folds_into_panel() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = dir.path().join("solution.hdf");
        let mut members = required();
        members.retain(|m| m.name != "node");
        members.push(StoreMember::flattened("node"));
        write_store(&store, &members)?;
        write_companions(&store)?;

        let solution = read_store(&store, None)?;
        let panel = solution.table("node").and_then(Table::as_panel).unwrap();
        assert_eq!(panel.shape(), (1, 2, 2));
        assert_eq!(
            panel.get("e:cap", &Value::Int(1), &Value::from("pv")),
            Some(&Value::Float(4.0))
        );
        Ok(())
    }

    #[test]
    fn hdf5_file_is_io_class() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = dir.path().join("solution.hdf");
        let mut bytes = HDF5_SIGNATURE.to_vec();
        bytes.extend([0u8; 512]);
        std::fs::write(&store, bytes)?;

        let err = read_store(&store, None).unwrap_err();
        assert!(matches!(err, ReadError::Hdf5Store { .. }));
        assert!(err.is_io());

        // too short to carry a signature: still a broken archive
        std::fs::write(&store, b"\x89H")?;
        let err = read_store(&store, None).unwrap_err();
        assert!(matches!(err, ReadError::Zip { .. }));
        Ok(())
    }

    #[test]
    fn member_names_become_keys() {
        assert_eq!(member_key("costs.parquet").as_deref(), Some("costs"));
        assert_eq!(member_key("/costs.parquet").as_deref(), Some("costs"));
        assert_eq!(member_key("/group/costs/.parquet").as_deref(), Some("group/costs"));
        assert_eq!(member_key("costs.csv"), None);
        assert_eq!(member_key("/.parquet"), None);
    }

    #[test]
    fn splits_ticks_into_timestamps() {
        assert_eq!(split(-1_500, 1_000), (-2, 500_000_000));
        let t = timestamp(86_400, 0).unwrap();
        assert_eq!(t.to_string(), "1970-01-02 00:00:00");
    }
}
