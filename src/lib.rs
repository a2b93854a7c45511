//! `binsort` is an external merge sort for fixed-width binary integer records.
//!
//! The input is a raw concatenation of fixed-width big-endian integers with no
//! delimiters, headers or padding, possibly far larger than available memory.
//! Sorting happens in two passes. During the first pass records stream into a
//! memory-bounded chunk buffer which is sorted in place and spilled to a run
//! file whenever it fills; during the second pass all runs are combined by a
//! k-way merge, emitting records in global ascending order using the same raw
//! byte layout. For more information see
//! [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! * **Fixed widths:**
//!   records are 1, 2, 4 or 8 bytes wide; a trailing tail shorter than one
//!   record is dropped, at the end of the input and of every run alike.
//! * **Signed or unsigned:**
//!   records compare as big-endian two's-complement or big-endian unsigned
//!   integers, selected once for the whole sort.
//! * **Bounded memory:**
//!   only one chunk buffer is ever resident; runs live in a scoped temporary
//!   directory that is removed on every exit path, fatal errors included.
//! * **Single-chunk fast path:**
//!   input that fits in one chunk is merged to the output straight from
//!   memory and never touches disk.
//!
//! # Example
//!
//! ```no_run
//! use std::fs;
//! use std::io;
//!
//! use binsort::{ExternalSorterBuilder, Signedness};
//!
//! fn main() {
//!     let input = io::BufReader::new(fs::File::open("values.bin").unwrap());
//!     let mut output = io::BufWriter::new(fs::File::create("values.bin.sorted").unwrap());
//!
//!     let sorter = ExternalSorterBuilder::new()
//!         .with_record_width(4)
//!         .with_signedness(Signedness::Unsigned)
//!         .with_chunk_capacity(8 * 1024 * 1024)
//!         .build()
//!         .unwrap();
//!
//!     sorter.sort(input, &mut output).unwrap();
//! }
//! ```

pub mod buffer;
pub mod codec;
pub mod merger;
pub mod reader;
pub mod sort;
pub mod spill;

pub use buffer::ChunkBuffer;
pub use codec::{RecordCodec, RecordWidth, Signedness};
pub use merger::{MergeDriver, MergeError};
pub use reader::RecordReader;
pub use sort::{ExternalSorter, ExternalSorterBuilder, SortError};
pub use spill::RunStore;
