//! Chunk buffer and in-memory sort.

use crate::codec::{RecordCodec, RecordWidth};

/// Fixed-capacity byte arena holding a whole number of records.
///
/// The buffer owns the records of one chunk between fill and spill. Bytes
/// used are always a multiple of the record width and records occupy the
/// slots `[0, len)` with no gaps.
pub struct ChunkBuffer {
    codec: RecordCodec,
    capacity: usize,
    data: Vec<u8>,
}

impl ChunkBuffer {
    /// Creates a buffer of `capacity` bytes. The sorter validates that the
    /// capacity is a positive multiple of the record width before any
    /// buffer exists.
    pub fn new(codec: RecordCodec, capacity: usize) -> Self {
        debug_assert!(capacity > 0 && capacity % codec.width().bytes() == 0);

        ChunkBuffer {
            codec,
            capacity,
            data: Vec::with_capacity(capacity),
        }
    }

    /// Copies one record into the next free slot. The caller checks
    /// [`is_full`](ChunkBuffer::is_full) before appending; the buffer
    /// never silently truncates a record.
    pub fn append(&mut self, record: &[u8]) {
        debug_assert_eq!(record.len(), self.codec.width().bytes());
        debug_assert!(self.data.len() + record.len() <= self.capacity);

        self.data.extend_from_slice(record);
    }

    /// Number of complete records currently held.
    pub fn len(&self) -> usize {
        self.data.len() / self.codec.width().bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checks if the buffer reached its capacity.
    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    /// Returns the record at slot `index`.
    pub fn record(&self, index: usize) -> &[u8] {
        let width = self.codec.width().bytes();
        let start = index * width;
        &self.data[start..start + width]
    }

    /// Iterates over the occupied record slots in order.
    pub fn records(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.codec.width().bytes())
    }

    /// Occupied bytes: all records concatenated, no delimiters.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Sorts the records in place by ascending codec key.
    ///
    /// Records are swapped whole, never copied out to a side buffer.
    /// Unstable: equal records are byte-identical, so their relative
    /// order is unobservable.
    pub fn sort(&mut self) {
        match self.codec.width() {
            RecordWidth::W1 => Self::sort_slots::<1>(&mut self.data, &self.codec),
            RecordWidth::W2 => Self::sort_slots::<2>(&mut self.data, &self.codec),
            RecordWidth::W4 => Self::sort_slots::<4>(&mut self.data, &self.codec),
            RecordWidth::W8 => Self::sort_slots::<8>(&mut self.data, &self.codec),
        }
    }

    fn sort_slots<const W: usize>(data: &mut [u8], codec: &RecordCodec) {
        let (records, rest) = data.as_chunks_mut::<W>();
        debug_assert!(rest.is_empty());
        records.sort_unstable_by(|a, b| codec.compare(a, b));
    }

    /// Index of the smallest record; equal records resolve to the last of
    /// the equal group (see [`RecordCodec::min_index`]).
    pub fn minimum(&self) -> Option<usize> {
        self.codec.min_index(self.records())
    }

    /// Logically empties the buffer for the next chunk, keeping the
    /// allocation.
    pub fn reset(&mut self) {
        self.data.clear();
    }
}
