//! File-format plumbing: gVCF/BCF input via htslib and VCF text output.

pub mod contigs;
pub mod reader;
pub mod vcf;

pub use contigs::ContigDictionary;
pub use reader::{open_gvcf, read_contigs, GvcfCursor, GvcfSource};
pub use vcf::{render_vcf, OutputLayout, VcfWriter};
