//! The k-way merge of per-sample streams into multi-sample sites.

mod config;
mod merger;
mod samples;

pub use config::{MergeConfig, Region, DEFAULT_BUFFER_SIZE};
pub use merger::StreamMerger;
pub use samples::build_roster;

use thiserror::Error;

use crate::collapse::CollapseError;
use crate::cursor::CursorError;
use crate::genotype::GenotypeError;
use crate::types::CallPosition;

/// Errors that abort a merge.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A sample's record could not be decoded or re-encoded.
    #[error("genotype error: {0}")]
    Genotype(#[from] GenotypeError),

    /// Records at one site could not be reconciled.
    #[error("allele collapse error: {0}")]
    Collapse(#[from] CollapseError),

    /// An input stream failed.
    #[error("input error: {0}")]
    Cursor(#[from] CursorError),

    /// No cursor had a front record although the merge was not drained.
    #[error("no remaining records in any input")]
    NoRemainingRecords,

    /// A site was about to be emitted at or before the previous one.
    #[error("site {current} emitted after {previous}")]
    OutOfOrder {
        /// Position of the previously emitted site.
        previous: CallPosition,
        /// Position of the offending site.
        current: CallPosition,
    },

    /// Two inputs share a sample name and renaming was not allowed.
    #[error("duplicate sample name {0:?} (use --force-samples to rename)")]
    DuplicateSample(String),

    /// The merger was given no inputs.
    #[error("no inputs to merge")]
    NoInputs,

    /// Configuration invalid (e.g., zero buffer size).
    #[error("invalid merge configuration: {0}")]
    InvalidConfiguration(String),
}
