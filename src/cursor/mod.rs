//! Per-sample input cursors consumed by the merger.

mod buffered;

pub use buffered::{BufferedCursor, MemoryCursor};

use thiserror::Error;

use crate::depth::DepthBlock;
use crate::types::{CallPosition, CallRecord, VariantClass};

/// Errors raised while reading a sample stream.
#[derive(Debug, Error)]
pub enum CursorError {
    /// The stream went backwards.
    #[error("sample {sample}: record at {found} follows {previous}; input must be sorted")]
    Unsorted {
        /// Sample name.
        sample: String,
        /// Last accepted start position.
        previous: CallPosition,
        /// Offending start position.
        found: CallPosition,
    },
    /// Error reported by htslib.
    #[error("htslib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),
    /// A contig name not present in the shared dictionary.
    #[error("contig {name} is not declared in the first input")]
    UnknownContig {
        /// Contig name.
        name: String,
    },
    /// An input that does not hold exactly one sample.
    #[error("{path}: expected exactly one sample, found {found}")]
    SampleCount {
        /// Input path.
        path: String,
        /// Number of samples in the header.
        found: usize,
    },
    /// A record that could not be decoded.
    #[error("cannot decode record at {position}: {message}")]
    Decode {
        /// Record position.
        position: CallPosition,
        /// What went wrong.
        message: String,
    },
}

/// Header facts about one sample stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSchema {
    /// Sample name as found in the input.
    pub name: String,
    /// Whether the stream declares FORMAT/PL.
    pub has_pl: bool,
    /// Whether the stream declares both FORMAT/ADF and FORMAT/ADR.
    pub has_strand_depth: bool,
}

impl SampleSchema {
    /// Construct a schema.
    pub fn new(name: impl Into<String>, has_pl: bool, has_strand_depth: bool) -> Self {
        Self {
            name: name.into(),
            has_pl,
            has_strand_depth,
        }
    }
}

/// One item of a sorted sample stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEntry {
    /// An explicit variant call.
    Variant(CallRecord),
    /// A reference-only coverage block.
    Block(DepthBlock),
}

impl StreamEntry {
    /// Start position; streams are sorted on it.
    pub fn start(&self) -> CallPosition {
        match self {
            StreamEntry::Variant(record) => record.position,
            StreamEntry::Block(block) => CallPosition::new(block.contig(), block.start()),
        }
    }
}

/// A sorted, single-sample source of variant calls and depth blocks.
pub trait SampleCursor {
    /// Header facts for this sample.
    fn schema(&self) -> &SampleSchema;

    /// Buffer every entry starting at or before `(contig, end)`.
    ///
    /// Also buffers at least one variant record, together with every record
    /// sharing its position, if any remain.
    fn load(&mut self, contig: u32, end: u32) -> Result<(), CursorError>;

    /// Lowest-ranked record at the first buffered position.
    fn front(&self) -> Option<&CallRecord>;

    /// Buffered records at exactly `position` with the given rank.
    fn records_at(&self, position: CallPosition, rank: VariantClass) -> Vec<&CallRecord>;

    /// Buffered records starting at or before `(contig, end)`.
    fn records_up_to(&self, contig: u32, end: u32) -> Vec<&CallRecord>;

    /// Buffered depth blocks overlapping `[start, end]` on `contig`.
    fn depth_blocks(&self, contig: u32, start: u32, end: u32) -> Vec<&DepthBlock>;

    /// Drop records starting at or before `(contig, end)` and blocks ending
    /// there. Returns the number of variant records dropped.
    fn flush(&mut self, contig: u32, end: u32) -> usize;

    /// No variant record is buffered and the source is drained.
    fn is_exhausted(&self) -> bool;
}

impl<C: SampleCursor + ?Sized> SampleCursor for Box<C> {
    fn schema(&self) -> &SampleSchema {
        (**self).schema()
    }

    fn load(&mut self, contig: u32, end: u32) -> Result<(), CursorError> {
        (**self).load(contig, end)
    }

    fn front(&self) -> Option<&CallRecord> {
        (**self).front()
    }

    fn records_at(&self, position: CallPosition, rank: VariantClass) -> Vec<&CallRecord> {
        (**self).records_at(position, rank)
    }

    fn records_up_to(&self, contig: u32, end: u32) -> Vec<&CallRecord> {
        (**self).records_up_to(contig, end)
    }

    fn depth_blocks(&self, contig: u32, start: u32, end: u32) -> Vec<&DepthBlock> {
        (**self).depth_blocks(contig, start, end)
    }

    fn flush(&mut self, contig: u32, end: u32) -> usize {
        (**self).flush(contig, end)
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
}
