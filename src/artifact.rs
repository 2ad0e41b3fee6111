//! Parquet artifacts: the columnar files the extractors produce and the
//! load sink consumes. The file stem is the canonical table name downstream.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::debug;

use crate::frame::Frame;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow conversion failed: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Parquet codec failed: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Artifact has no columns; empty frames must carry their declared column set")]
    NoColumns,
}

/// Write a frame as a Parquet file, creating parent directories as needed.
/// An empty (zero-row) frame still produces a valid file, since downstream
/// consumers depend on every artifact existing, but it must carry at least
/// its declared columns: Parquet cannot represent a readable zero-column
/// file, so writing one is rejected rather than producing a corrupt
/// artifact. Extractors register their entity's base columns before writing
/// an empty result.
pub fn write(frame: &Frame, path: &Path) -> Result<(), ArtifactError> {
    if frame.columns().is_empty() {
        return Err(ArtifactError::NoColumns);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let fields: Vec<Field> = frame
        .columns()
        .iter()
        .map(|name| Field::new(name, infer_type(frame, name), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), None)?;
    let arrays: Vec<ArrayRef> = schema
        .fields()
        .iter()
        .map(|field| build_array(frame, field.name(), field.data_type()))
        .collect();
    let batch = RecordBatch::try_new(schema, arrays)?;
    writer.write(&batch)?;
    writer.close()?;
    debug!(path = %path.display(), rows = frame.len(), "wrote artifact");
    Ok(())
}

/// Read a Parquet artifact back into a frame. Values come back as the JSON
/// types they were written from; a zero-column file reads as an empty frame.
#[allow(dead_code)] // Inspection entry point; the load sink reads artifacts through the store instead
pub fn read(path: &Path) -> Result<Frame, ArtifactError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();

    let mut frame = Frame::new();
    for field in schema.fields() {
        frame.ensure_column(field.name());
    }
    if schema.fields().is_empty() {
        return Ok(frame);
    }

    let reader = builder.build()?;
    for batch in reader {
        let batch = batch?;
        for row_index in 0..batch.num_rows() {
            let mut record = Map::new();
            for (column_index, field) in schema.fields().iter().enumerate() {
                let value = cell(batch.column(column_index), row_index)?;
                record.insert(field.name().clone(), value);
            }
            frame.push(record);
        }
    }
    Ok(frame)
}

/// Pick an Arrow type for one column from the values observed in it.
/// Mixed or non-scalar columns fall back to Utf8 (nested values are stored
/// as their JSON text).
fn infer_type(frame: &Frame, column: &str) -> DataType {
    let mut saw_bool = false;
    let mut saw_int = false;
    let mut saw_float = false;
    let mut saw_text = false;

    for row in frame.rows() {
        match row.get(column) {
            None | Some(Value::Null) => {}
            Some(Value::Bool(_)) => saw_bool = true,
            Some(Value::Number(n)) => {
                if n.as_i64().is_some() {
                    saw_int = true;
                } else {
                    saw_float = true;
                }
            }
            Some(_) => saw_text = true,
        }
    }

    if saw_text || (saw_bool && (saw_int || saw_float)) {
        DataType::Utf8
    } else if saw_float {
        DataType::Float64
    } else if saw_int {
        DataType::Int64
    } else if saw_bool {
        DataType::Boolean
    } else {
        // All null (or zero rows): type is arbitrary, strings are harmless.
        DataType::Utf8
    }
}

fn build_array(frame: &Frame, column: &str, data_type: &DataType) -> ArrayRef {
    match data_type {
        DataType::Boolean => {
            let values: Vec<Option<bool>> = frame
                .rows()
                .iter()
                .map(|row| row.get(column).and_then(Value::as_bool))
                .collect();
            Arc::new(BooleanArray::from(values))
        }
        DataType::Int64 => {
            let values: Vec<Option<i64>> = frame
                .rows()
                .iter()
                .map(|row| row.get(column).and_then(Value::as_i64))
                .collect();
            Arc::new(Int64Array::from(values))
        }
        DataType::Float64 => {
            let values: Vec<Option<f64>> = frame
                .rows()
                .iter()
                .map(|row| row.get(column).and_then(Value::as_f64))
                .collect();
            Arc::new(Float64Array::from(values))
        }
        _ => {
            let values: Vec<Option<String>> = frame
                .rows()
                .iter()
                .map(|row| match row.get(column) {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                })
                .collect();
            Arc::new(StringArray::from(values))
        }
    }
}

fn cell(array: &ArrayRef, row_index: usize) -> Result<Value, ArtifactError> {
    if array.is_null(row_index) {
        return Ok(Value::Null);
    }
    let value = match array.data_type() {
        DataType::Boolean => Value::Bool(typed::<BooleanArray>(array)?.value(row_index)),
        DataType::Int64 => Value::Number(typed::<Int64Array>(array)?.value(row_index).into()),
        DataType::Float64 => Number::from_f64(typed::<Float64Array>(array)?.value(row_index))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        DataType::Utf8 => Value::String(typed::<StringArray>(array)?.value(row_index).to_string()),
        _ => Value::String(arrow::util::display::array_value_to_string(
            array.as_ref(),
            row_index,
        )?),
    };
    Ok(value)
}

fn typed<A: 'static>(array: &ArrayRef) -> Result<&A, ArtifactError> {
    array.as_any().downcast_ref::<A>().ok_or_else(|| {
        ArtifactError::Arrow(ArrowError::CastError(format!(
            "column does not match its declared type {}",
            array.data_type()
        )))
    })
}
