//! # gVCF stream merging
//!
//! This library merges N sorted single-sample gVCF streams into one
//! multi-sample VCF stream.
//!
//! ## Core Algorithm
//!
//! 1. **Find minimum**: pick the smallest `(position, rank)` over every sample's front record
//! 2. **Collapse alleles**: unify equivalent alternates into one canonical allele list
//! 3. **Genotype each sample**: marginalise explicit calls onto the merged alleles, or
//!    synthesise a hom-ref call from reference-depth blocks
//! 4. **Aggregate**: derive AC/AN, mean MQ and strand-depth sums, then flush past the site
//!
//! ## Usage Example
//!
//! ```ignore
//! use gvcf_merge::{MergeConfig, StreamMerger};
//! use gvcf_merge::io::{open_gvcf, read_contigs};
//!
//! let contigs = read_contigs("a.g.vcf.gz")?;
//! let cursors = vec![
//!     open_gvcf("a.g.vcf.gz", &contigs, None, 1024)?,
//!     open_gvcf("b.g.vcf.gz", &contigs, None, 1024)?,
//! ];
//! let mut merger = StreamMerger::new(cursors, &MergeConfig::default())?;
//! while let Some(site) = merger.next_site()? {
//!     println!("{} {:?}", site.position, site.alleles);
//! }
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod types;      // Positions, tagged values, call records, allele keys
pub mod likelihood; // Phred math and triangular likelihood layout
pub mod depth;      // Reference-depth interval algebra
pub mod genotype;   // Per-sample decode / marginalise / propagate
pub mod collapse;   // Canonical allele list per site
pub mod site;       // Merged site and per-sample buffers
pub mod cursor;     // Sample cursor trait and buffered implementation
pub mod merge;      // k-way merge driver
pub mod io;         // htslib input, VCF text output

// Re-exports for convenience
pub use collapse::{AlleleCollapser, CollapseError};
pub use cursor::{BufferedCursor, CursorError, MemoryCursor, SampleCursor, SampleSchema, StreamEntry};
pub use depth::DepthBlock;
pub use genotype::{Genotype, GenotypeError};
pub use merge::{MergeConfig, MergeError, Region, StreamMerger};
pub use site::{FormatBuffers, MergedSite, SiteInfo};
pub use types::{CallPosition, CallRecord, FieldData, Value, VariantClass};
