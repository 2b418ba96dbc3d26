//! Parquet read/write for the readings table.
//!
//! The on-disk layout is a fixed column order: `timestamp` (naive
//! microsecond resolution) followed by the six value fields in canonical
//! order. Writes go through a temp file and an atomic rename so a crashed
//! write never corrupts the dataset.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use time::{OffsetDateTime, PrimitiveDateTime};

use awair_types::{Reading, SensorField};

use crate::error::{Error, Result};

pub(crate) fn schema() -> SchemaRef {
    let mut fields = Vec::with_capacity(1 + SensorField::ALL.len());
    fields.push(Field::new(
        "timestamp",
        DataType::Timestamp(TimeUnit::Microsecond, None),
        false,
    ));
    for field in SensorField::ALL {
        fields.push(Field::new(field.as_str(), DataType::Float64, false));
    }
    Arc::new(Schema::new(fields))
}

fn to_micros(ts: PrimitiveDateTime) -> i64 {
    (ts.assume_utc().unix_timestamp_nanos() / 1_000) as i64
}

fn from_micros(us: i64) -> Result<PrimitiveDateTime> {
    let odt = OffsetDateTime::from_unix_timestamp_nanos(i128::from(us) * 1_000)
        .map_err(|e| Error::Schema(format!("timestamp out of range: {e}")))?;
    Ok(PrimitiveDateTime::new(odt.date(), odt.time()))
}

pub(crate) fn readings_to_batch(rows: &[Reading]) -> Result<RecordBatch> {
    let timestamps: TimestampMicrosecondArray =
        rows.iter().map(|r| Some(to_micros(r.timestamp))).collect();

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(1 + SensorField::ALL.len());
    columns.push(Arc::new(timestamps));
    for field in SensorField::ALL {
        let values: Float64Array = rows.iter().map(|r| Some(r.field(field))).collect();
        columns.push(Arc::new(values));
    }

    Ok(RecordBatch::try_new(schema(), columns)?)
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
        .ok_or_else(|| Error::Schema(format!("missing or mistyped column '{name}'")))
}

pub(crate) fn batch_to_readings(batch: &RecordBatch) -> Result<Vec<Reading>> {
    let timestamps = batch
        .column_by_name("timestamp")
        .and_then(|c| c.as_any().downcast_ref::<TimestampMicrosecondArray>())
        .ok_or_else(|| Error::Schema("missing or mistyped column 'timestamp'".to_string()))?;

    let temp = float_column(batch, "temp")?;
    let co2 = float_column(batch, "co2")?;
    let pm10 = float_column(batch, "pm10")?;
    let pm25 = float_column(batch, "pm25")?;
    let humid = float_column(batch, "humid")?;
    let voc = float_column(batch, "voc")?;

    let mut rows = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        rows.push(Reading {
            timestamp: from_micros(timestamps.value(i))?,
            temp: temp.value(i),
            co2: co2.value(i),
            pm10: pm10.value(i),
            pm25: pm25.value(i),
            humid: humid.value(i),
            voc: voc.value(i),
        });
    }
    Ok(rows)
}

/// Read every reading in the file. A missing file is an empty dataset.
pub(crate) fn read_file(path: &Path) -> Result<Vec<Reading>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(Error::Storage {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut rows = Vec::new();
    for batch in reader {
        rows.extend(batch_to_readings(&batch?)?);
    }
    Ok(rows)
}

/// Rewrite the whole file from `rows`, atomically.
pub(crate) fn write_file(path: &Path, rows: &[Reading]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    let batch = readings_to_batch(rows)?;

    let tmp = path.with_extension("parquet.tmp");
    let file = File::create(&tmp).map_err(|e| Error::Storage {
        path: tmp.clone(),
        source: e,
    })?;

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(Default::default()))
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    fs::rename(&tmp, path).map_err(|e| Error::Storage {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Size of the backing file in bytes; 0 if it does not exist yet.
pub(crate) fn file_size(path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(Error::Storage {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
