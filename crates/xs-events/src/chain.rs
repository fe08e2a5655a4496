//! Chained, lazy event reader over Parquet event files.
//!
//! [`EventChain`] checks every input up front (footer and schema) and keeps
//! only the decoded footer metadata. Each input is reopened when the chain
//! reaches it and closed as soon as it is exhausted, so at most one input
//! handle is held at a time. Only the four event columns are read.

use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, AsArray, Float64Array, Int32Array, ListArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int32Type};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::{
    ArrowReaderMetadata, ArrowReaderOptions, ParquetRecordBatchReader,
    ParquetRecordBatchReaderBuilder,
};
use parquet::file::reader::ChunkReader;

use xs_core::{Error, EventRecord, EventSource, Result};

use crate::schema::{
    EVENTS_SCHEMA_V1, ID1_COLUMN, ID2_COLUMN, KF_COLUMN, kf_data_type, schema_meta,
    validate_event_schema,
};

/// Rows decoded per record batch.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Opens one input. Called once when the chain is built and again when the
/// chain reaches the input.
pub type Opener<R> = Box<dyn FnMut() -> std::io::Result<R> + Send>;

/// An input that passed validation but has not been reached yet.
struct PendingInput<R> {
    label: PathBuf,
    metadata: ArrowReaderMetadata,
    mask: ProjectionMask,
    opener: Opener<R>,
}

/// The input currently being read.
struct OpenInput {
    label: PathBuf,
    reader: ParquetRecordBatchReader,
    batch: Option<DecodedBatch>,
    entry: u64,
}

impl OpenInput {
    fn next_record(&mut self, weight_column: &str) -> Result<Option<EventRecord>> {
        loop {
            if let Some(batch) = self.batch.as_mut() {
                let rec = batch.next_record(weight_column).map_err(|reason| {
                    let label = self.label.display();
                    Error::Decode(format!("{label} entry {}: {reason}", self.entry))
                })?;
                if let Some(rec) = rec {
                    self.entry += 1;
                    return Ok(Some(rec));
                }
                self.batch = None;
            }

            let Some(batch) = self.reader.next() else {
                return Ok(None);
            };
            let batch =
                batch.map_err(|e| Error::Decode(format!("{}: {e}", self.label.display())))?;
            let decoded = DecodedBatch::new(&batch, weight_column)
                .map_err(|reason| Error::Decode(format!("{}: {reason}", self.label.display())))?;
            self.batch = Some(decoded);
        }
    }
}

/// Event columns of one record batch, normalized to their canonical types.
struct DecodedBatch {
    id1: Int32Array,
    id2: Int32Array,
    kf: ListArray,
    weight: Float64Array,
    row: usize,
}

fn column_as(
    batch: &RecordBatch,
    name: &str,
    to: &DataType,
) -> std::result::Result<ArrayRef, String> {
    let col = batch.column_by_name(name).ok_or_else(|| format!("column `{name}` not in batch"))?;
    cast(col.as_ref(), to).map_err(|e| format!("column `{name}`: {e}"))
}

impl DecodedBatch {
    fn new(batch: &RecordBatch, weight_column: &str) -> std::result::Result<Self, String> {
        let id1 = column_as(batch, ID1_COLUMN, &DataType::Int32)?;
        let id2 = column_as(batch, ID2_COLUMN, &DataType::Int32)?;
        let kf = column_as(batch, KF_COLUMN, &kf_data_type())?;
        let weight = column_as(batch, weight_column, &DataType::Float64)?;
        Ok(Self {
            id1: id1.as_primitive::<Int32Type>().clone(),
            id2: id2.as_primitive::<Int32Type>().clone(),
            kf: kf.as_list::<i32>().clone(),
            weight: weight.as_primitive::<Float64Type>().clone(),
            row: 0,
        })
    }

    fn next_record(
        &mut self,
        weight_column: &str,
    ) -> std::result::Result<Option<EventRecord>, String> {
        let row = self.row;
        if row >= self.weight.len() {
            return Ok(None);
        }
        self.row += 1;

        // Casting out-of-range integers also yields nulls.
        let nulls = [
            self.id1.is_null(row),
            self.id2.is_null(row),
            self.kf.is_null(row),
            self.weight.is_null(row),
        ];
        if let Some(i) = nulls.iter().position(|&null| null) {
            let name = [ID1_COLUMN, ID2_COLUMN, KF_COLUMN, weight_column][i];
            return Err(format!("null or out-of-range `{name}`"));
        }

        let flavors = self.kf.value(row);
        let flavors = flavors.as_primitive::<Int32Type>();
        if flavors.null_count() > 0 {
            return Err("null flavor code in `kf`".to_string());
        }

        Ok(Some(EventRecord {
            id1: self.id1.value(row),
            id2: self.id2.value(row),
            kf: flavors.values().to_vec(),
            weight: self.weight.value(row),
        }))
    }
}

/// Logical concatenation of event files, read lazily in input order.
///
/// ```no_run
/// use xs_core::{Estimator, RunningStats};
/// use xs_events::EventChain;
///
/// let chain = EventChain::open(&["part1.parquet", "part2.parquet"], "weight")?;
/// let mut stats = RunningStats::new();
/// for ev in chain {
///     stats.update(&ev?);
/// }
/// println!("{}", stats.finalize(Estimator::Naive)?);
/// # Ok::<(), xs_core::Error>(())
/// ```
pub struct EventChain<R = File> {
    pending: VecDeque<PendingInput<R>>,
    current: Option<OpenInput>,
    weight_column: String,
    batch_size: usize,
    declared: u64,
    failed: bool,
}

impl EventChain<File> {
    /// Open and validate every file in `inputs`.
    ///
    /// Fails with [`Error::SourceOpen`] on the first input that cannot be
    /// opened, is not Parquet, or lacks an event column; no records are
    /// produced in that case. Each file is closed again after its footer is
    /// read.
    pub fn open<P: AsRef<Path>>(inputs: &[P], weight_column: &str) -> Result<Self> {
        let openers = inputs
            .iter()
            .map(|input| {
                let path = input.as_ref().to_path_buf();
                let target = path.clone();
                let opener: Opener<File> = Box::new(move || File::open(&target));
                (path, opener)
            })
            .collect();
        Self::from_openers(openers, weight_column)
    }
}

impl EventChain<Bytes> {
    /// Build a chain over in-memory Parquet buffers, labelled for error messages.
    pub fn from_bytes<L: Into<PathBuf>>(
        inputs: Vec<(L, Bytes)>,
        weight_column: &str,
    ) -> Result<Self> {
        let openers = inputs
            .into_iter()
            .map(|(label, bytes)| {
                let opener: Opener<Bytes> = Box::new(move || Ok(bytes.clone()));
                (label.into(), opener)
            })
            .collect();
        Self::from_openers(openers, weight_column)
    }
}

impl<R: ChunkReader + 'static> EventChain<R> {
    /// Build a chain from one opener per input, in order.
    ///
    /// Every opener is called once here to check the input; the reader is
    /// dropped before the next input is checked. The footer metadata is kept
    /// and the opener is called again when iteration reaches the input.
    pub fn from_openers(inputs: Vec<(PathBuf, Opener<R>)>, weight_column: &str) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::Argument("event chain needs at least one input".into()));
        }

        let mut pending = VecDeque::with_capacity(inputs.len());
        let mut declared = 0u64;

        for (label, mut opener) in inputs {
            let reader = opener().map_err(|e| Error::source_open(&label, e))?;
            let metadata = ArrowReaderMetadata::load(&reader, ArrowReaderOptions::new())
                .map_err(|e| Error::source_open(&label, e))?;
            drop(reader);

            let schema = metadata.schema().clone();
            let roots = validate_event_schema(&schema, weight_column)
                .map_err(|reason| Error::source_open(&label, reason))?;

            match schema_meta(&schema) {
                Some(Ok(meta)) if meta.version != EVENTS_SCHEMA_V1 => tracing::warn!(
                    "{}: unknown event schema version '{}', reading columns by name",
                    label.display(),
                    meta.version
                ),
                Some(Err(e)) => {
                    tracing::warn!("{}: ignoring malformed schema metadata: {e}", label.display())
                }
                _ => {}
            }

            let rows = metadata.metadata().file_metadata().num_rows().max(0) as u64;
            tracing::debug!("checked {} ({rows} entries)", label.display());
            declared += rows;

            let mask = ProjectionMask::roots(metadata.parquet_schema(), roots);
            pending.push_back(PendingInput { label, metadata, mask, opener });
        }

        Ok(Self {
            pending,
            current: None,
            weight_column: weight_column.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            declared,
            failed: false,
        })
    }

    /// Rows decoded per record batch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Total entries declared in the footers of all inputs.
    pub fn total_entries(&self) -> u64 {
        self.declared
    }

    /// Number of inputs not yet fully read.
    pub fn remaining_inputs(&self) -> usize {
        self.pending.len() + usize::from(self.current.is_some())
    }

    fn next_record(&mut self) -> Result<Option<EventRecord>> {
        loop {
            if let Some(input) = self.current.as_mut() {
                if let Some(rec) = input.next_record(&self.weight_column)? {
                    return Ok(Some(rec));
                }
                tracing::debug!("closed {} after {} entries", input.label.display(), input.entry);
                self.current = None;
                continue;
            }

            let Some(mut next) = self.pending.pop_front() else {
                return Ok(None);
            };
            let input = (next.opener)().map_err(|e| Error::source_open(&next.label, e))?;
            let reader = ParquetRecordBatchReaderBuilder::new_with_metadata(input, next.metadata)
                .with_projection(next.mask)
                .with_batch_size(self.batch_size)
                .build()
                .map_err(|e| Error::source_open(&next.label, e))?;
            tracing::debug!("opened {}", next.label.display());
            self.current = Some(OpenInput { label: next.label, reader, batch: None, entry: 0 });
        }
    }
}

impl<R: ChunkReader + 'static> Iterator for EventChain<R> {
    type Item = Result<EventRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_record() {
            Ok(rec) => rec.map(Ok),
            Err(e) => {
                // Fused after an error; release every handle right away.
                self.failed = true;
                self.current = None;
                self.pending.clear();
                Some(Err(e))
            }
        }
    }
}

impl<R: ChunkReader + 'static> EventSource for EventChain<R> {
    fn declared_entries(&self) -> Option<u64> {
        Some(self.declared)
    }
}
