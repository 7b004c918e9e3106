use std::collections::VecDeque;

use super::{CursorError, SampleCursor, SampleSchema, StreamEntry};
use crate::depth::DepthBlock;
use crate::types::{CallPosition, CallRecord, VariantClass};

/// [`SampleCursor`] over any fallible iterator of sorted stream entries.
#[derive(Debug)]
pub struct BufferedCursor<S> {
    schema: SampleSchema,
    source: S,
    peeked: Option<StreamEntry>,
    drained: bool,
    last_start: Option<CallPosition>,
    variants: VecDeque<CallRecord>,
    blocks: VecDeque<DepthBlock>,
}

/// Cursor over entries already held in memory.
pub type MemoryCursor = BufferedCursor<
    std::iter::Map<
        std::vec::IntoIter<StreamEntry>,
        fn(StreamEntry) -> Result<StreamEntry, CursorError>,
    >,
>;

impl MemoryCursor {
    /// Cursor over a vector of entries (must be sorted by start).
    pub fn from_entries(schema: SampleSchema, entries: Vec<StreamEntry>) -> Self {
        let ok: fn(StreamEntry) -> Result<StreamEntry, CursorError> = Ok;
        BufferedCursor::new(schema, entries.into_iter().map(ok))
    }
}

impl<S> BufferedCursor<S>
where
    S: Iterator<Item = Result<StreamEntry, CursorError>>,
{
    /// Wrap `source`.
    pub fn new(schema: SampleSchema, source: S) -> Self {
        Self::with_capacity(schema, source, 0)
    }

    /// Wrap `source`, pre-allocating room for `capacity` buffered entries.
    pub fn with_capacity(schema: SampleSchema, source: S, capacity: usize) -> Self {
        Self {
            schema,
            source,
            peeked: None,
            drained: false,
            last_start: None,
            variants: VecDeque::with_capacity(capacity),
            blocks: VecDeque::with_capacity(capacity),
        }
    }

    /// Number of buffered variant records.
    pub fn buffered_variants(&self) -> usize {
        self.variants.len()
    }

    /// Number of buffered depth blocks.
    pub fn buffered_blocks(&self) -> usize {
        self.blocks.len()
    }

    fn peek_start(&mut self) -> Result<Option<CallPosition>, CursorError> {
        if self.peeked.is_none() && !self.drained {
            match self.source.next() {
                Some(entry) => {
                    let entry = entry?;
                    let start = entry.start();
                    if let Some(previous) = self.last_start {
                        if start < previous {
                            return Err(CursorError::Unsorted {
                                sample: self.schema.name.clone(),
                                previous,
                                found: start,
                            });
                        }
                    }
                    self.last_start = Some(start);
                    self.peeked = Some(entry);
                }
                None => self.drained = true,
            }
        }
        Ok(self.peeked.as_ref().map(StreamEntry::start))
    }
}

impl<S> SampleCursor for BufferedCursor<S>
where
    S: Iterator<Item = Result<StreamEntry, CursorError>>,
{
    fn schema(&self) -> &SampleSchema {
        &self.schema
    }

    fn load(&mut self, contig: u32, end: u32) -> Result<(), CursorError> {
        let bound = CallPosition::new(contig, end);
        while let Some(start) = self.peek_start()? {
            let last_variant = self.variants.back().map(|record| record.position);
            let wanted = start <= bound || last_variant.is_none() || last_variant == Some(start);
            if !wanted {
                break;
            }
            match self.peeked.take() {
                Some(StreamEntry::Variant(record)) => self.variants.push_back(record),
                Some(StreamEntry::Block(block)) => self.blocks.push_back(block),
                None => break,
            }
        }
        Ok(())
    }

    fn front(&self) -> Option<&CallRecord> {
        let first = self.variants.front()?.position;
        self.variants
            .iter()
            .take_while(|record| record.position == first)
            .min_by_key(|record| record.rank())
    }

    fn records_at(&self, position: CallPosition, rank: VariantClass) -> Vec<&CallRecord> {
        self.variants
            .iter()
            .skip_while(|record| record.position < position)
            .take_while(|record| record.position == position)
            .filter(|record| record.rank() == rank)
            .collect()
    }

    fn records_up_to(&self, contig: u32, end: u32) -> Vec<&CallRecord> {
        let bound = CallPosition::new(contig, end);
        self.variants
            .iter()
            .take_while(|record| record.position <= bound)
            .collect()
    }

    fn depth_blocks(&self, contig: u32, start: u32, end: u32) -> Vec<&DepthBlock> {
        self.blocks
            .iter()
            .filter(|block| block.intersect_size_range(contig, start, end) > 0)
            .collect()
    }

    fn flush(&mut self, contig: u32, end: u32) -> usize {
        let bound = CallPosition::new(contig, end);
        let before = self.variants.len();
        self.variants.retain(|record| record.position > bound);
        self.blocks
            .retain(|block| CallPosition::new(block.contig(), block.end()) > bound);
        before - self.variants.len()
    }

    fn is_exhausted(&self) -> bool {
        self.variants.is_empty() && self.peeked.is_none() && self.drained
    }
}
