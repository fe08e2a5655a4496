//! Write events to Parquet files in the `xsec_events_v1` schema.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Builder, Int32Builder, ListBuilder};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use xs_core::{DEFAULT_WEIGHT_COLUMN, Error, EventRecord, Result};

use crate::schema::event_schema;

fn write_error(e: impl std::fmt::Display) -> Error {
    Error::Encode(e.to_string())
}

/// Build an Arrow [`RecordBatch`] from events, storing weights under `weight_column`.
pub fn events_to_record_batch(events: &[EventRecord], weight_column: &str) -> Result<RecordBatch> {
    let schema = event_schema(weight_column).map_err(write_error)?;

    let mut id1 = Int32Builder::with_capacity(events.len());
    let mut id2 = Int32Builder::with_capacity(events.len());
    let mut kf = ListBuilder::new(Int32Builder::new());
    let mut weight = Float64Builder::with_capacity(events.len());

    for ev in events {
        id1.append_value(ev.id1);
        id2.append_value(ev.id2);
        kf.values().append_slice(&ev.kf);
        kf.append(true);
        weight.append_value(ev.weight);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(id1.finish()),
        Arc::new(id2.finish()),
        Arc::new(kf.finish()),
        Arc::new(weight.finish()),
    ];

    RecordBatch::try_new(Arc::new(schema), columns).map_err(write_error)
}

fn writer_properties(max_row_group_size: Option<usize>) -> WriterProperties {
    let mut props = WriterProperties::builder().set_compression(Compression::SNAPPY);
    if let Some(n) = max_row_group_size {
        props = props.set_max_row_group_size(n.max(1));
    }
    props.build()
}

/// Write `events` to a Parquet file at `path` with the default `weight` column.
pub fn write_events_parquet(path: &Path, events: &[EventRecord]) -> Result<()> {
    let file = File::create(path)?;
    write_batch(file, &events_to_record_batch(events, DEFAULT_WEIGHT_COLUMN)?, None)
}

/// Write `events` to Parquet bytes in memory with the default `weight` column.
pub fn write_events_parquet_bytes(events: &[EventRecord]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_batch(&mut buf, &events_to_record_batch(events, DEFAULT_WEIGHT_COLUMN)?, None)?;
    Ok(buf)
}

/// Write a [`RecordBatch`] to `sink`, splitting row groups at `max_row_group_size` rows.
pub fn write_batch<W: std::io::Write + Send>(
    sink: W,
    batch: &RecordBatch,
    max_row_group_size: Option<usize>,
) -> Result<()> {
    let props = writer_properties(max_row_group_size);
    let mut writer = ArrowWriter::try_new(sink, batch.schema(), Some(props)).map_err(write_error)?;
    writer.write(batch).map_err(write_error)?;
    writer.close().map_err(write_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::Int32Type;

    struct FullDisk;

    impl std::io::Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn record_batch_layout() {
        let events = vec![
            EventRecord::new(21, 21, vec![25, 21], 0.5),
            EventRecord::new(2, -2, vec![], -1.25),
        ];
        let batch = events_to_record_batch(&events, "me_wgt").unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(3).name(), "me_wgt");

        let kf = batch.column(2).as_list::<i32>();
        assert_eq!(kf.value(0).as_primitive::<Int32Type>().values().to_vec(), vec![25, 21]);
        assert_eq!(kf.value(1).len(), 0);
    }

    #[test]
    fn empty_input_writes_a_valid_file() {
        let bytes = write_events_parquet_bytes(&[]).unwrap();
        assert!(bytes.starts_with(b"PAR1"));
        assert!(bytes.ends_with(b"PAR1"));
    }

    #[test]
    fn sink_failure_is_an_encode_error() {
        let batch = events_to_record_batch(&[EventRecord::new(1, 2, vec![3], 1.0)], "weight")
            .unwrap();
        let err = write_batch(FullDisk, &batch, None).unwrap_err();
        assert!(matches!(err, Error::Encode(_)), "{err}");
    }

    #[test]
    fn missing_directory_stays_an_io_error() {
        let path = Path::new("/nonexistent/xsec/out.parquet");
        let err = write_events_parquet(path, &[]).unwrap_err();
        assert!(matches!(err, Error::Io(_)), "{err}");
    }
}
