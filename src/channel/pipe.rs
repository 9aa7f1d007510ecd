//! Point-to-point aggregation channel
//!
//! One pipe per worker. A finished worker writes exactly one fixed-size
//! record; the coordinator reads one record per pipe and folds them.
//!
//! # Record format
//!
//! ```text
//! [8 bytes: sum f64][8 bytes: count u64][8 bytes: unknown u64]   (little-endian)
//! ```
//!
//! Records are bincode-encoded with fixed-width integers, so every record is
//! exactly [`RECORD_LEN`] bytes. That is far below `PIPE_BUF`, which makes
//! each write atomic.
//!
//! # Descriptor ownership
//!
//! After fork a worker keeps only its own write end. The coordinator drops
//! each worker's write end as soon as that worker is spawned, so a worker
//! that dies without writing shows up as EOF rather than a blocked read.

use super::{AggregationChannel, ChannelKind};
use crate::error::{PulseError, Result};
use crate::stats::aggregator::StatisticsAggregator;
use crate::stats::Aggregate;
use std::fs::File;
use std::io::{self, Read, Write};

/// Size of one encoded aggregate record in bytes
pub const RECORD_LEN: usize = 24;

/// Encode an aggregate as a fixed-size record
pub fn encode_record(aggregate: &Aggregate) -> Result<[u8; RECORD_LEN]> {
    let bytes = bincode::serialize(aggregate)
        .map_err(|e| PulseError::Channel(format!("failed to encode record: {}", e)))?;
    bytes.as_slice().try_into().map_err(|_| {
        PulseError::Channel(format!(
            "encoded record is {} bytes, expected {}",
            bytes.len(),
            RECORD_LEN
        ))
    })
}

/// Decode a fixed-size record
pub fn decode_record(record: &[u8; RECORD_LEN]) -> Result<Aggregate> {
    bincode::deserialize(record)
        .map_err(|e| PulseError::Channel(format!("failed to decode record: {}", e)))
}

#[derive(Debug)]
struct WorkerPipe {
    reader: Option<File>,
    writer: Option<File>,
}

/// One private pipe per worker
#[derive(Debug)]
pub struct PointToPointChannel {
    pipes: Vec<WorkerPipe>,
}

impl PointToPointChannel {
    /// Create `worker_count` pipes
    pub fn new(worker_count: usize) -> Result<Self> {
        let mut pipes = Vec::with_capacity(worker_count);
        for worker in 0..worker_count {
            let (read_end, write_end) = nix::unistd::pipe().map_err(|e| {
                PulseError::ChannelSetup(format!("unable to create pipe for worker {}: {}", worker, e))
            })?;
            pipes.push(WorkerPipe {
                reader: Some(File::from(read_end)),
                writer: Some(File::from(write_end)),
            });
        }
        Ok(Self { pipes })
    }

    fn pipe_mut(&mut self, worker_id: usize) -> Result<&mut WorkerPipe> {
        self.pipes
            .get_mut(worker_id)
            .ok_or_else(|| PulseError::Channel(format!("no pipe for worker {}", worker_id)))
    }
}

impl AggregationChannel for PointToPointChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::PointToPoint
    }

    fn attach_worker(&mut self, worker_id: usize) -> Result<()> {
        self.pipe_mut(worker_id)?;
        for (id, pipe) in self.pipes.iter_mut().enumerate() {
            pipe.reader = None;
            if id != worker_id {
                pipe.writer = None;
            }
        }
        Ok(())
    }

    fn worker_spawned(&mut self, worker_id: usize) -> Result<()> {
        self.pipe_mut(worker_id)?.writer = None;
        Ok(())
    }

    fn submit_local(&mut self, worker_id: usize, local: &Aggregate) -> Result<()> {
        let record = encode_record(local)?;
        let mut writer = self.pipe_mut(worker_id)?.writer.take().ok_or_else(|| {
            PulseError::Channel(format!("worker {} has no open write end", worker_id))
        })?;

        // Single write of the whole record; dropping the writer closes it
        writer.write_all(&record)?;
        tracing::debug!(worker = worker_id, count = local.count, "record written");
        Ok(())
    }

    fn collect_final(&mut self) -> Result<Aggregate> {
        let mut collected = StatisticsAggregator::new();

        for (worker, pipe) in self.pipes.iter_mut().enumerate() {
            // Our own copy of the write end must be closed or EOF never comes
            pipe.writer = None;
            let mut reader = pipe.reader.take().ok_or_else(|| {
                PulseError::Channel(format!("worker {} pipe already drained", worker))
            })?;

            match read_record(&mut reader, worker)? {
                Some(record) => collected.add_worker(worker, record),
                None => tracing::warn!(worker, "pipe closed without a record"),
            }
        }

        // Every worker must have delivered; a silent one is not a zero
        if let Some(&worker) = collected.missing(self.pipes.len()).first() {
            return Err(PulseError::MissingRecord { worker });
        }
        Ok(collected.aggregate())
    }
}

/// Read exactly one record and make sure nothing follows it
///
/// `None` means the pipe closed before any byte arrived.
fn read_record<R: Read>(reader: &mut R, worker: usize) -> Result<Option<Aggregate>> {
    let mut buf = [0u8; RECORD_LEN];
    let got = read_full(reader, &mut buf)?;

    if got == 0 {
        return Ok(None);
    }
    if got < RECORD_LEN {
        return Err(PulseError::TruncatedRecord { worker, got });
    }

    let mut extra = [0u8; 1];
    if read_full(reader, &mut extra)? > 0 {
        return Err(PulseError::DuplicateRecord { worker });
    }

    decode_record(&buf).map(Some)
}

/// Fill `buf` or stop at EOF; returns the number of bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
