//! Sequential record cursor over runs and input streams.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::Path;

use crate::codec::RecordWidth;

/// One-record-at-a-time cursor over a byte source.
///
/// The cursor always holds the next unconsumed record, pre-loaded after
/// open and after every [`advance`](RecordReader::advance). The same
/// cursor reads spilled run files and the raw input stream, so both share
/// the trailing-tail contract: a tail shorter than one record is silently
/// dropped, never an error.
pub struct RecordReader<R> {
    source: R,
    width: RecordWidth,
    current: [u8; RecordWidth::MAX],
    ready: bool,
}

impl RecordReader<io::BufReader<fs::File>> {
    /// Opens a run file and positions the cursor at its first record.
    pub fn open(path: &Path, width: RecordWidth) -> io::Result<Self> {
        let file = fs::File::open(path)?;
        Self::new(io::BufReader::new(file), width)
    }
}

impl<R: Read> RecordReader<R> {
    /// Wraps a byte source and pre-loads the first record. A source
    /// holding no complete record yields an immediately exhausted cursor.
    pub fn new(source: R, width: RecordWidth) -> io::Result<Self> {
        let mut reader = RecordReader {
            source,
            width,
            current: [0; RecordWidth::MAX],
            ready: false,
        };
        reader.advance()?;

        return Ok(reader);
    }

    /// Returns the current record without consuming it, or [`None`] once
    /// the source is exhausted.
    pub fn current(&self) -> Option<&[u8]> {
        if self.ready {
            Some(&self.current[..self.width.bytes()])
        } else {
            None
        }
    }

    /// Consumes the current record and loads the next one. An I/O error
    /// is terminal: the cursor reports exhaustion afterwards.
    pub fn advance(&mut self) -> io::Result<()> {
        self.ready = false;
        if self.fill()? {
            self.ready = true;
        }

        Ok(())
    }

    fn fill(&mut self) -> io::Result<bool> {
        let want = self.width.bytes();
        let mut got = 0;

        while got < want {
            match self.source.read(&mut self.current[got..want]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        // A tail shorter than one record is dropped.
        return Ok(got == want);
    }
}
