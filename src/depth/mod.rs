//! Reference-only coverage blocks.
//!
//! A gVCF describes stretches of reference-only calls as blocks carrying a
//! depth summary. When a sample has no explicit call at a merged site, the
//! blocks overlapping the site are intersected with the site span and folded
//! together with [`DepthBlock::add`] into one evidence block.

use crate::types::Value;

/// Reference-depth evidence over the closed interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DepthBlock {
    contig: u32,
    start: u32,
    end: u32,
    dp: Value<i32>,
    dpf: Value<i32>,
    gq: Value<i32>,
    ploidy: u8,
}

impl Default for DepthBlock {
    fn default() -> Self {
        Self {
            contig: 0,
            start: 0,
            end: 0,
            dp: Value::Missing,
            dpf: Value::Missing,
            gq: Value::Missing,
            ploidy: 2,
        }
    }
}

impl DepthBlock {
    /// Block with all quantitative fields present.
    pub fn new(contig: u32, start: u32, end: u32, dp: i32, dpf: i32, gq: i32, ploidy: u8) -> Self {
        Self::with_values(
            contig,
            start,
            end,
            Value::Present(dp),
            Value::Present(dpf),
            Value::Present(gq),
            ploidy,
        )
    }

    /// Block whose fields may individually be missing.
    pub fn with_values(
        contig: u32,
        start: u32,
        end: u32,
        dp: Value<i32>,
        dpf: Value<i32>,
        gq: Value<i32>,
        ploidy: u8,
    ) -> Self {
        assert!(start <= end, "depth block start {start} > end {end}");
        Self {
            contig,
            start,
            end,
            dp,
            dpf,
            gq,
            ploidy,
        }
    }

    /// Block carrying no evidence over `[start, end]`.
    pub fn missing(contig: u32, start: u32, end: u32) -> Self {
        Self {
            contig,
            start,
            end,
            ..Self::default()
        }
    }

    /// Contig id.
    pub fn contig(&self) -> u32 {
        self.contig
    }

    /// First covered position.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Last covered position.
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Read depth.
    pub fn dp(&self) -> Value<i32> {
        self.dp
    }

    /// Filtered read depth.
    pub fn dpf(&self) -> Value<i32> {
        self.dpf
    }

    /// Genotype quality of the reference call.
    pub fn gq(&self) -> Value<i32> {
        self.gq
    }

    /// Ploidy of the reference call.
    pub fn ploidy(&self) -> u8 {
        self.ploidy
    }

    /// `end - start`.
    pub fn size(&self) -> u32 {
        self.end - self.start
    }

    /// Overlap with `other`; depth fields are taken from `self`.
    ///
    /// Disjoint blocks (or blocks on different contigs) produce an empty
    /// interval. Check [`DepthBlock::intersect_size`] before trusting the result.
    pub fn intersect(&self, other: &DepthBlock) -> DepthBlock {
        self.intersect_range(other.contig, other.start, other.end)
    }

    /// Overlap with `[start, end]` on `contig`; depth fields are taken from `self`.
    pub fn intersect_range(&self, contig: u32, start: u32, end: u32) -> DepthBlock {
        let mut out = *self;
        if self.intersect_size_range(contig, start, end) == 0 {
            out.end = out.start;
            return out;
        }
        out.start = self.start.max(start);
        out.end = self.end.min(end);
        out
    }

    /// Number of positions shared with `other` (inclusive bounds).
    pub fn intersect_size(&self, other: &DepthBlock) -> u32 {
        self.intersect_size_range(other.contig, other.start, other.end)
    }

    /// Number of positions shared with `[start, end]` on `contig` (inclusive bounds).
    pub fn intersect_size_range(&self, contig: u32, start: u32, end: u32) -> u32 {
        if contig != self.contig {
            return 0;
        }
        let lo = self.start.max(start);
        let hi = self.end.min(end);
        if lo > hi {
            0
        } else {
            hi - lo + 1
        }
    }

    /// Fold `other` into `self`: union of the bounds, quantitative fields summed.
    ///
    /// The blocks need not be adjacent. Panics if the contigs differ.
    pub fn add(&mut self, other: &DepthBlock) {
        assert_eq!(
            self.contig, other.contig,
            "cannot add depth blocks from different contigs"
        );
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
        self.dp = self.dp.saturating_add(other.dp);
        self.dpf = self.dpf.saturating_add(other.dpf);
        self.gq = self.gq.saturating_add(other.gq);
    }

    /// Mark dp/dpf/gq as missing without touching the interval.
    pub fn set_to_missing(&mut self) {
        self.dp = Value::Missing;
        self.dpf = Value::Missing;
        self.gq = Value::Missing;
    }

    /// Zero dp/dpf/gq without touching the interval.
    pub fn set_to_zero(&mut self) {
        self.dp = Value::Present(0);
        self.dpf = Value::Present(0);
        self.gq = Value::Present(0);
    }
}

/// Intersect every block with `[start, end]` and fold the overlaps together.
///
/// Returns a missing block over the requested span when nothing overlaps.
pub fn fold_evidence<'a, I>(blocks: I, contig: u32, start: u32, end: u32) -> DepthBlock
where
    I: IntoIterator<Item = &'a DepthBlock>,
{
    blocks
        .into_iter()
        .filter(|block| block.intersect_size_range(contig, start, end) > 0)
        .map(|block| block.intersect_range(contig, start, end))
        .reduce(|mut acc, block| {
            acc.add(&block);
            acc
        })
        .unwrap_or_else(|| DepthBlock::missing(contig, start, end))
}
