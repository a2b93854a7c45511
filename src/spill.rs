//! Spilling sorted chunks to run files.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use log;
use tempfile;

use crate::buffer::ChunkBuffer;

/// Creates and owns the run files of one sort.
///
/// Runs live in a scoped temporary directory created inside the configured
/// parent. Dropping the store removes the directory and every run in it,
/// on success and on every error path alike.
pub struct RunStore {
    dir: tempfile::TempDir,
    next_id: usize,
}

impl RunStore {
    /// Creates the scoped run directory.
    ///
    /// # Arguments
    /// * `parent` - Directory to hold the run directory. If the parameter
    ///   is [`None`] the default OS temporary directory will be used.
    pub fn new(parent: Option<&Path>) -> io::Result<Self> {
        let dir = match parent {
            Some(path) => tempfile::Builder::new().prefix("binsort-").tempdir_in(path),
            None => tempfile::Builder::new().prefix("binsort-").tempdir(),
        }?;

        log::info!("using {} as a temporary directory", dir.path().display());

        Ok(RunStore { dir, next_id: 0 })
    }

    /// Persists a sorted buffer as a new run file and resets the buffer
    /// for the next chunk.
    ///
    /// Run names are a fixed prefix plus a counter that increases
    /// monotonically over the life of the store, so every run of one sort
    /// is unique. Returns the run's path; the caller owns the collection
    /// of spilled runs.
    pub fn spill(&mut self, buffer: &mut ChunkBuffer) -> io::Result<PathBuf> {
        let path = self.dir.path().join(format!("run.{}", self.next_id));
        self.next_id += 1;

        let mut writer = io::BufWriter::new(fs::File::create(&path)?);
        writer.write_all(buffer.as_bytes())?;
        writer.flush()?;

        log::debug!("spilled {} ({} records)", path.display(), buffer.len());

        buffer.reset();
        return Ok(path);
    }
}
