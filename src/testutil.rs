//! Fixture builders shared by the unit tests.

use std::{fs, io::Write, path::Path, sync::Arc};

use anyhow::Result;
use arrow::{
    array::{ArrayRef, Float64Array, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::arrow::ArrowWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::read::{CONFIG_MODEL_SUFFIX, CONFIG_RUN_SUFFIX};

pub fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,runset=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn write_file(path: impl AsRef<Path>, content: &str) -> Result<()> {
    fs::write(path, content)?;
    Ok(())
}

/// One Parquet member of a store container.
pub struct StoreMember {
    pub name: String,
    pub batch: RecordBatch,
}

impl StoreMember {
    /// Two rows `r1`, `r2` with one `value` column; the index is written the
    /// way pandas does, as a trailing `__index_level_0__` column.
    pub fn simple(name: &str) -> Self {
        let schema = Schema::new(vec![
            Field::new("value", DataType::Float64, true),
            Field::new("__index_level_0__", DataType::Utf8, false),
        ]);
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Float64Array::from(vec![1.0, 2.0])),
            Arc::new(StringArray::from(vec!["r1", "r2"])),
        ];
        Self::new(name, schema, columns)
    }

    /// A flattened 3-D table: index `major`, a `minor` column and one item.
    pub fn flattened(name: &str) -> Self {
        let schema = Schema::new(vec![
            Field::new("major", DataType::Int64, false),
            Field::new("minor", DataType::Utf8, false),
            Field::new("e:cap", DataType::Float64, true),
        ]);
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![0, 0, 1, 1])),
            Arc::new(StringArray::from(vec!["ccgt", "pv", "ccgt", "pv"])),
            Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0, 4.0])),
        ];
        Self::new(name, schema, columns)
    }

    fn new(name: &str, schema: Schema, columns: Vec<ArrayRef>) -> Self {
        let batch = RecordBatch::try_new(Arc::new(schema), columns)
            .expect("fixture columns match fixture schema");
        Self {
            name: name.to_string(),
            batch,
        }
    }

    fn to_parquet(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, self.batch.schema(), None)?;
        writer.write(&self.batch)?;
        writer.close()?;
        Ok(buf)
    }
}

/// Writes a store container holding `members` as `<name>.parquet`.
pub fn write_store(path: &Path, members: &[StoreMember]) -> Result<()> {
    let mut zip = ZipWriter::new(fs::File::create(path)?);
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Stored);
    for member in members {
        zip.start_file(format!("{}.parquet", member.name), options.clone())?;
        zip.write_all(&member.to_parquet()?)?;
    }
    zip.finish()?;
    Ok(())
}

/// Writes both companion documents next to a store file.
pub fn write_companions(store: &Path) -> Result<()> {
    let base = store.as_os_str().to_string_lossy();
    fs::write(
        format!("{}{}", base, CONFIG_RUN_SUFFIX),
        "name: run\nsubset_t: ['2005-01-01', '2005-01-02']\n",
    )?;
    fs::write(
        format!("{}{}", base, CONFIG_MODEL_SUFFIX),
        "name: model\ntechs:\n  ccgt: {parent: supply}\n",
    )?;
    Ok(())
}

/// Writes a complete CSV run: one plain table and one flattened 3-D table.
pub fn write_csv_run(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    write_file(dir.join("costs.csv"), "y,ccgt,pv\nr1,1.0,2.0\nr2,3.0,4.0\n")?;
    write_file(
        dir.join("node.csv"),
        "major,minor,e:power\n2005-01-01,ccgt,1.0\n2005-01-01,pv,2.0\n",
    )?;
    Ok(())
}
