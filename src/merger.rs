//! K-way merge driver.

use std::error::Error;
use std::fmt;
use std::io;
use std::io::prelude::*;

use crate::codec::RecordCodec;
use crate::reader::RecordReader;

/// Merge error.
#[derive(Debug)]
pub enum MergeError {
    /// Read failure on a run.
    Run(io::Error),
    /// Write failure on the output stream.
    Output(io::Error),
}

impl Error for MergeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match self {
            MergeError::Run(err) => err,
            MergeError::Output(err) => err,
        })
    }
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::Run(err) => write!(f, "run read failed: {}", err),
            MergeError::Output(err) => write!(f, "output write failed: {}", err),
        }
    }
}

/// Merges the sorted runs of one sort into a single sorted output.
///
/// The run readers live in an arena that is never reordered; the driver
/// scans a separate dense list of active arena indices and retires an
/// exhausted run by removing its index only. Selection compares the
/// current record of every active run and, among runs whose records
/// compare equal, picks the last-indexed active run (see
/// [`RecordCodec::min_index`]). The scan is O(k) per emitted record,
/// deliberately simple rather than heap-based.
pub struct MergeDriver<R> {
    codec: RecordCodec,
    runs: Vec<RecordReader<R>>,
    active: Vec<usize>,
}

impl<R: Read> MergeDriver<R> {
    /// Creates a driver over pre-loaded run readers. A reader exhausted
    /// at open (an empty run) contributes no active entry.
    pub fn new(codec: RecordCodec, runs: Vec<RecordReader<R>>) -> Self {
        let active = runs
            .iter()
            .enumerate()
            .filter(|(_, run)| run.current().is_some())
            .map(|(index, _)| index)
            .collect();

        MergeDriver { codec, runs, active }
    }

    /// Emits every record of every run to `output` in ascending key
    /// order. Returns the number of records written.
    pub fn merge<W: Write>(mut self, output: &mut W) -> Result<u64, MergeError> {
        let mut emitted = 0;

        while let Some(position) = self.select() {
            let index = self.active[position];
            let run = &mut self.runs[index];

            if let Some(record) = run.current() {
                output.write_all(record).map_err(MergeError::Output)?;
                emitted += 1;
            }

            run.advance().map_err(MergeError::Run)?;
            if run.current().is_none() {
                // Order-preserving removal keeps the remaining index
                // space dense and the selection order stable.
                self.active.remove(position);
            }
        }

        return Ok(emitted);
    }

    /// Position within the active list of the run to emit from next.
    fn select(&self) -> Option<usize> {
        let heads = self.active.iter().filter_map(|&index| self.runs[index].current());
        self.codec.min_index(heads)
    }
}
