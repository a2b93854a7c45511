//! External sorter.

use std::error::Error;
use std::fmt;
use std::io;
use std::io::prelude::*;
use std::path::Path;

use log;

use crate::buffer::ChunkBuffer;
use crate::codec::{RecordCodec, RecordWidth, Signedness};
use crate::merger::{MergeDriver, MergeError};
use crate::reader::RecordReader;
use crate::spill::RunStore;

/// Default chunk buffer capacity in bytes.
pub const DEFAULT_CHUNK_CAPACITY: usize = 32 * 1024 * 1024;

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Record width is not 1, 2, 4 or 8 bytes.
    InvalidWidth(usize),
    /// Chunk capacity is zero or not a multiple of the record width.
    InvalidCapacity { capacity: usize, width: usize },
    /// Temporary directory creation error.
    TempDir(io::Error),
    /// Input stream read error.
    Input(io::Error),
    /// Run file creation, write or read error.
    Run(io::Error),
    /// Output stream write error.
    Output(io::Error),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SortError::InvalidWidth(_) | SortError::InvalidCapacity { .. } => None,
            SortError::TempDir(err)
            | SortError::Input(err)
            | SortError::Run(err)
            | SortError::Output(err) => Some(err),
        }
    }
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortError::InvalidWidth(width) => {
                write!(f, "record width must be 1, 2, 4 or 8 bytes, got {}", width)
            }
            SortError::InvalidCapacity { capacity, width } => write!(
                f,
                "chunk capacity must be a positive multiple of the record width (capacity {}, width {})",
                capacity, width
            ),
            SortError::TempDir(err) => write!(f, "temporary directory not created: {}", err),
            SortError::Input(err) => write!(f, "input stream read failed: {}", err),
            SortError::Run(err) => write!(f, "run file I/O failed: {}", err),
            SortError::Output(err) => write!(f, "output stream write failed: {}", err),
        }
    }
}

impl From<MergeError> for SortError {
    fn from(err: MergeError) -> Self {
        match err {
            MergeError::Run(err) => SortError::Run(err),
            MergeError::Output(err) => SortError::Output(err),
        }
    }
}

/// External sorter builder. Provides methods for [`ExternalSorter`]
/// initialization.
#[derive(Clone)]
pub struct ExternalSorterBuilder {
    /// Record width in bytes.
    width: usize,
    /// Integer interpretation of record bytes.
    signedness: Signedness,
    /// Chunk buffer capacity in bytes.
    chunk_capacity: usize,
    /// Directory to be used to store run files.
    tmp_dir: Option<Box<Path>>,
}

impl ExternalSorterBuilder {
    /// Creates an instance of a builder with default parameters: 8-byte
    /// signed records, a 32 MiB chunk buffer and the OS temporary
    /// directory.
    pub fn new() -> Self {
        ExternalSorterBuilder::default()
    }

    /// Builds an [`ExternalSorter`] instance using provided configuration.
    /// Configuration violations are reported here, before any I/O starts.
    pub fn build(self) -> Result<ExternalSorter, SortError> {
        let width = RecordWidth::new(self.width).ok_or(SortError::InvalidWidth(self.width))?;

        if self.chunk_capacity == 0 || self.chunk_capacity % width.bytes() != 0 {
            return Err(SortError::InvalidCapacity {
                capacity: self.chunk_capacity,
                width: width.bytes(),
            });
        }

        return Ok(ExternalSorter {
            codec: RecordCodec::new(width, self.signedness),
            chunk_capacity: self.chunk_capacity,
            tmp_dir: self.tmp_dir,
        });
    }

    /// Sets the record width in bytes.
    pub fn with_record_width(mut self, bytes: usize) -> ExternalSorterBuilder {
        self.width = bytes;
        return self;
    }

    /// Sets the integer interpretation of record bytes.
    pub fn with_signedness(mut self, signedness: Signedness) -> ExternalSorterBuilder {
        self.signedness = signedness;
        return self;
    }

    /// Sets the chunk buffer capacity in bytes.
    pub fn with_chunk_capacity(mut self, capacity: usize) -> ExternalSorterBuilder {
        self.chunk_capacity = capacity;
        return self;
    }

    /// Sets directory to be used to store run files.
    pub fn with_tmp_dir(mut self, path: &Path) -> ExternalSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }
}

impl Default for ExternalSorterBuilder {
    fn default() -> Self {
        ExternalSorterBuilder {
            width: 8,
            signedness: Signedness::Signed,
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            tmp_dir: None,
        }
    }
}

/// External sorter for fixed-width big-endian integer records.
#[derive(Debug)]
pub struct ExternalSorter {
    /// Record codec shared by every stage.
    codec: RecordCodec,
    /// Chunk buffer capacity in bytes.
    chunk_capacity: usize,
    /// Directory to be used to store run files.
    tmp_dir: Option<Box<Path>>,
}

impl ExternalSorter {
    /// Sorts `input` into `output`.
    ///
    /// Records are read from `input` until exhaustion; a trailing tail
    /// shorter than one record is dropped. The sorted records are written
    /// to `output` as the same raw big-endian concatenation and `output`
    /// is flushed before returning. Every run file spilled along the way
    /// is removed before this method returns, whether it succeeds or
    /// fails. Returns the number of records emitted.
    ///
    /// # Arguments
    /// * `input` - Byte stream of concatenated fixed-width records
    /// * `output` - Destination for the sorted concatenation
    pub fn sort<I, O>(&self, input: I, output: &mut O) -> Result<u64, SortError>
    where
        I: Read,
        O: Write,
    {
        let width = self.codec.width();
        let mut store = RunStore::new(self.tmp_dir.as_deref()).map_err(SortError::TempDir)?;
        let mut buffer = ChunkBuffer::new(self.codec, self.chunk_capacity);
        let mut runs = Vec::new();

        let mut records = RecordReader::new(input, width).map_err(SortError::Input)?;
        while let Some(record) = records.current() {
            buffer.append(record);
            if buffer.is_full() {
                log::debug!("sorting chunk {} ({} records)", runs.len(), buffer.len());
                buffer.sort();
                runs.push(store.spill(&mut buffer).map_err(SortError::Run)?);
            }
            records.advance().map_err(SortError::Input)?;
        }

        let emitted = if runs.is_empty() {
            // The whole input fits in one chunk: sort it and merge it to
            // the output straight from memory, skipping the run file
            // round-trip.
            log::debug!("sorting single chunk ({} records)", buffer.len());
            buffer.sort();

            let run = RecordReader::new(io::Cursor::new(buffer.as_bytes()), width)
                .map_err(SortError::Run)?;
            MergeDriver::new(self.codec, vec![run]).merge(output)?
        } else {
            if !buffer.is_empty() {
                log::debug!("sorting chunk {} ({} records)", runs.len(), buffer.len());
                buffer.sort();
                runs.push(store.spill(&mut buffer).map_err(SortError::Run)?);
            }

            log::debug!("merging {} runs", runs.len());
            let mut readers = Vec::with_capacity(runs.len());
            for run in &runs {
                readers.push(RecordReader::open(run, width).map_err(SortError::Run)?);
            }
            MergeDriver::new(self.codec, readers).merge(output)?
        };

        output.flush().map_err(SortError::Output)?;
        log::debug!("external sort done, {} records emitted", emitted);

        // Dropping the store removes every run file; the early returns
        // above reach the same drop.
        drop(store);

        return Ok(emitted);
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io;

    use rand::prelude::*;
    use rstest::*;

    use super::{ExternalSorter, ExternalSorterBuilder, SortError};
    use crate::codec::Signedness;

    fn sort_bytes(sorter: &ExternalSorter, input: &[u8]) -> Vec<u8> {
        let mut output = Vec::new();
        sorter.sort(io::Cursor::new(input.to_vec()), &mut output).unwrap();
        return output;
    }

    #[rstest]
    #[case(Signedness::Unsigned, vec![0x00, 0xFF, 0x7F], vec![0x00, 0x7F, 0xFF])]
    #[case(Signedness::Signed, vec![0x00, 0xFF, 0x7F], vec![0xFF, 0x00, 0x7F])]
    fn test_single_byte_semantics(
        #[case] signedness: Signedness,
        #[case] input: Vec<u8>,
        #[case] expected: Vec<u8>,
    ) {
        let sorter = ExternalSorterBuilder::new()
            .with_record_width(1)
            .with_signedness(signedness)
            .build()
            .unwrap();

        assert_eq!(sort_bytes(&sorter, &input), expected);
    }

    #[test]
    fn test_multi_chunk_matches_in_memory_sort() {
        let mut values: Vec<u64> = (0..1000).map(|_| rand::thread_rng().gen()).collect();
        let input: Vec<u8> = values.iter().flat_map(|value| value.to_be_bytes()).collect();

        // 64 records per chunk forces well over three spilled runs.
        let sorter = ExternalSorterBuilder::new()
            .with_record_width(8)
            .with_signedness(Signedness::Unsigned)
            .with_chunk_capacity(64 * 8)
            .build()
            .unwrap();
        let output = sort_bytes(&sorter, &input);

        values.sort_unstable();
        let expected: Vec<u8> = values.iter().flat_map(|value| value.to_be_bytes()).collect();
        assert_eq!(output, expected);
    }

    #[test]
    fn test_signed_records_across_chunks() {
        let mut values: Vec<i64> = vec![5, -3, i64::MIN, 0, -1, i64::MAX, 7, -200, 200, 1];
        let input: Vec<u8> = values.iter().flat_map(|value| value.to_be_bytes()).collect();

        let sorter = ExternalSorterBuilder::new()
            .with_record_width(8)
            .with_chunk_capacity(4 * 8)
            .build()
            .unwrap();
        let output = sort_bytes(&sorter, &input);

        values.sort_unstable();
        let expected: Vec<u8> = values.iter().flat_map(|value| value.to_be_bytes()).collect();
        assert_eq!(output, expected);
    }

    #[test]
    fn test_multiset_preserved_across_chunks() {
        let mut rng = rand::thread_rng();
        let values: Vec<u16> = (0..400).map(|_| rng.gen_range(0..30)).collect();
        let input: Vec<u8> = values.iter().flat_map(|value| value.to_be_bytes()).collect();

        let sorter = ExternalSorterBuilder::new()
            .with_record_width(2)
            .with_signedness(Signedness::Unsigned)
            .with_chunk_capacity(16 * 2)
            .build()
            .unwrap();
        let output = sort_bytes(&sorter, &input);

        let mut expected = values;
        expected.sort_unstable();
        let actual: Vec<u16> = output
            .chunks_exact(2)
            .map(|record| u16::from_be_bytes([record[0], record[1]]))
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_deterministic_with_ties_across_runs() {
        let mut rng = rand::thread_rng();
        let values: Vec<u16> = (0..256).map(|_| rng.gen_range(0..8)).collect();
        let input: Vec<u8> = values.iter().flat_map(|value| value.to_be_bytes()).collect();

        let sorter = ExternalSorterBuilder::new()
            .with_record_width(2)
            .with_signedness(Signedness::Unsigned)
            .with_chunk_capacity(8 * 2)
            .build()
            .unwrap();

        let first = sort_bytes(&sorter, &input);
        let second = sort_bytes(&sorter, &input);
        assert_eq!(first, second);
    }

    #[test]
    fn test_sorted_input_reproduced_unchanged() {
        let input: Vec<u8> = (0..300u32).flat_map(|value| value.to_be_bytes()).collect();

        let sorter = ExternalSorterBuilder::new()
            .with_record_width(4)
            .with_signedness(Signedness::Unsigned)
            .with_chunk_capacity(32 * 4)
            .build()
            .unwrap();

        assert_eq!(sort_bytes(&sorter, &input), input);
    }

    #[test]
    fn test_trailing_tail_dropped() {
        let mut input = Vec::new();
        input.extend_from_slice(&5u32.to_be_bytes());
        input.extend_from_slice(&2u32.to_be_bytes());
        input.extend_from_slice(&[0xAA, 0xBB]); // incomplete final record

        let sorter = ExternalSorterBuilder::new()
            .with_record_width(4)
            .with_signedness(Signedness::Unsigned)
            .build()
            .unwrap();
        let output = sort_bytes(&sorter, &input);

        let expected: Vec<u8> = [2u32, 5].iter().flat_map(|value| value.to_be_bytes()).collect();
        assert_eq!(output, expected);
    }

    #[rstest]
    fn test_empty_input() {
        let tmp = tempfile::tempdir().unwrap();
        let sorter = ExternalSorterBuilder::new()
            .with_tmp_dir(tmp.path())
            .build()
            .unwrap();

        let mut output = Vec::new();
        let emitted = sorter.sort(io::empty(), &mut output).unwrap();

        assert_eq!(emitted, 0);
        assert!(output.is_empty());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[rstest]
    fn test_run_files_cleaned_up() {
        let tmp = tempfile::tempdir().unwrap();
        let sorter = ExternalSorterBuilder::new()
            .with_record_width(1)
            .with_signedness(Signedness::Unsigned)
            .with_chunk_capacity(2)
            .with_tmp_dir(tmp.path())
            .build()
            .unwrap();

        let mut output = Vec::new();
        let emitted = sorter.sort(io::Cursor::new(vec![9, 3, 7, 1, 8, 2]), &mut output).unwrap();

        assert_eq!(emitted, 6);
        assert_eq!(output, vec![1, 2, 3, 7, 8, 9]);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_rejects_invalid_width() {
        let err = ExternalSorterBuilder::new()
            .with_record_width(3)
            .build()
            .unwrap_err();
        assert!(matches!(err, SortError::InvalidWidth(3)));
    }

    #[rstest]
    #[case(0)]
    #[case(10)]
    fn test_rejects_misaligned_capacity(#[case] capacity: usize) {
        let err = ExternalSorterBuilder::new()
            .with_record_width(8)
            .with_chunk_capacity(capacity)
            .build()
            .unwrap_err();
        assert!(matches!(err, SortError::InvalidCapacity { .. }));
    }
}
