//! The merged multi-sample site and its reusable per-sample field buffers.

use crate::likelihood::num_likelihoods;
use crate::types::{CallPosition, Value};

/// GT slots reserved per sample; haploid calls terminate with `VectorEnd`.
pub const GT_SLOTS: usize = 2;

/// Per-sample FORMAT buffers for one merged site.
///
/// Each field is one contiguous vector indexed by `(sample, allele)`. The
/// buffers are resized and reset to `Missing` by [`FormatBuffers::reset`] at
/// the start of every merge step.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FormatBuffers {
    num_samples: usize,
    num_allele: usize,
    gt: Vec<Value<u32>>,
    gq: Vec<Value<i32>>,
    gqx: Vec<Value<i32>>,
    dp: Vec<Value<i32>>,
    dpf: Vec<Value<i32>>,
    ad: Vec<Value<i32>>,
    adf: Vec<Value<i32>>,
    adr: Vec<Value<i32>>,
    pl: Vec<Value<i32>>,
}

/// Mutable view of one sample's slice of every field.
#[derive(Debug)]
pub struct SampleFields<'a> {
    /// Genotype slots (`GT_SLOTS` entries).
    pub gt: &'a mut [Value<u32>],
    /// Genotype quality.
    pub gq: &'a mut Value<i32>,
    /// Calibrated genotype quality.
    pub gqx: &'a mut Value<i32>,
    /// Read depth.
    pub dp: &'a mut Value<i32>,
    /// Filtered read depth.
    pub dpf: &'a mut Value<i32>,
    /// Allele depths, one per merged allele.
    pub ad: &'a mut [Value<i32>],
    /// Forward-strand allele depths.
    pub adf: &'a mut [Value<i32>],
    /// Reverse-strand allele depths.
    pub adr: &'a mut [Value<i32>],
    /// Diploid-layout genotype likelihoods.
    pub pl: &'a mut [Value<i32>],
}

impl FormatBuffers {
    /// Buffers for `num_samples` samples; sized on the first reset.
    pub fn new(num_samples: usize) -> Self {
        Self {
            num_samples,
            ..Self::default()
        }
    }

    /// Resize for a site with `num_allele` alleles and overwrite everything with `Missing`.
    pub fn reset(&mut self, num_allele: usize) {
        let n = self.num_samples;
        self.num_allele = num_allele;
        let per_sample_pl = self.pl_width();
        fill(&mut self.gt, n * GT_SLOTS);
        fill(&mut self.gq, n);
        fill(&mut self.gqx, n);
        fill(&mut self.dp, n);
        fill(&mut self.dpf, n);
        fill(&mut self.ad, n * num_allele);
        fill(&mut self.adf, n * num_allele);
        fill(&mut self.adr, n * num_allele);
        fill(&mut self.pl, n * per_sample_pl);
    }

    /// Number of samples.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Number of alleles at the current site.
    pub fn num_allele(&self) -> usize {
        self.num_allele
    }

    /// Likelihood cells per sample (diploid layout).
    pub fn pl_width(&self) -> usize {
        num_likelihoods(2, self.num_allele)
    }

    /// Mutable view of one sample.
    pub fn sample_mut(&mut self, sample: usize) -> SampleFields<'_> {
        assert!(sample < self.num_samples, "sample {sample} out of range");
        let a = self.num_allele;
        let w = self.pl_width();
        SampleFields {
            gt: &mut self.gt[sample * GT_SLOTS..(sample + 1) * GT_SLOTS],
            gq: &mut self.gq[sample],
            gqx: &mut self.gqx[sample],
            dp: &mut self.dp[sample],
            dpf: &mut self.dpf[sample],
            ad: &mut self.ad[sample * a..(sample + 1) * a],
            adf: &mut self.adf[sample * a..(sample + 1) * a],
            adr: &mut self.adr[sample * a..(sample + 1) * a],
            pl: &mut self.pl[sample * w..(sample + 1) * w],
        }
    }

    /// GT slots of one sample.
    pub fn gt(&self, sample: usize) -> &[Value<u32>] {
        &self.gt[sample * GT_SLOTS..(sample + 1) * GT_SLOTS]
    }

    /// GQ of one sample.
    pub fn gq(&self, sample: usize) -> Value<i32> {
        self.gq[sample]
    }

    /// GQX of one sample.
    pub fn gqx(&self, sample: usize) -> Value<i32> {
        self.gqx[sample]
    }

    /// DP of one sample.
    pub fn dp(&self, sample: usize) -> Value<i32> {
        self.dp[sample]
    }

    /// DPF of one sample.
    pub fn dpf(&self, sample: usize) -> Value<i32> {
        self.dpf[sample]
    }

    /// AD of one sample.
    pub fn ad(&self, sample: usize) -> &[Value<i32>] {
        self.allele_slice(&self.ad, sample)
    }

    /// ADF of one sample.
    pub fn adf(&self, sample: usize) -> &[Value<i32>] {
        self.allele_slice(&self.adf, sample)
    }

    /// ADR of one sample.
    pub fn adr(&self, sample: usize) -> &[Value<i32>] {
        self.allele_slice(&self.adr, sample)
    }

    /// PL of one sample (diploid width; haploid samples end in `VectorEnd`).
    pub fn pl(&self, sample: usize) -> &[Value<i32>] {
        let w = self.pl_width();
        &self.pl[sample * w..(sample + 1) * w]
    }

    fn allele_slice<'a>(&self, field: &'a [Value<i32>], sample: usize) -> &'a [Value<i32>] {
        let a = self.num_allele;
        &field[sample * a..(sample + 1) * a]
    }
}

fn fill<T>(buffer: &mut Vec<Value<T>>, len: usize) {
    buffer.clear();
    buffer.resize_with(len, || Value::Missing);
}

/// Site-level aggregates derived after every sample is genotyped.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SiteInfo {
    /// Allele count per alternate allele.
    pub ac: Vec<i32>,
    /// Total number of called alleles.
    pub an: i32,
    /// Mean mapping quality over samples that reported one.
    pub mq: Option<i32>,
    /// Forward-strand allele depth summed over samples, one per allele.
    pub adf: Option<Vec<i32>>,
    /// Reverse-strand allele depth summed over samples, one per allele.
    pub adr: Option<Vec<i32>>,
}

/// One emitted multi-sample site.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MergedSite {
    /// Site position.
    pub position: CallPosition,
    /// Reference allele followed by the collapsed alternates.
    pub alleles: Vec<String>,
    /// Sum of QUAL over the explicit calls merged into the site.
    pub qual: f32,
    /// Per-sample FORMAT values.
    pub format: FormatBuffers,
    /// Site aggregates.
    pub info: SiteInfo,
}

impl MergedSite {
    /// Empty site for `num_samples` samples.
    pub fn new(num_samples: usize) -> Self {
        Self {
            format: FormatBuffers::new(num_samples),
            ..Self::default()
        }
    }

    /// Clear everything ahead of a new merge step.
    pub fn clear(&mut self) {
        self.position = CallPosition::default();
        self.alleles.clear();
        self.qual = 0.0;
        self.info = SiteInfo::default();
    }

    /// Number of alleles, reference included.
    pub fn num_alleles(&self) -> usize {
        self.alleles.len()
    }

    /// Reference allele.
    pub fn reference(&self) -> &str {
        self.alleles.first().map(String::as_str).unwrap_or("")
    }

    /// Alternate alleles.
    pub fn alternates(&self) -> &[String] {
        self.alleles.get(1..).unwrap_or(&[])
    }

    /// Compute AC/AN from the GT buffers.
    ///
    /// AN counts every called allele including the reference.
    pub fn count_alleles(&mut self) {
        let n = self.num_alleles();
        let mut counts = vec![0i32; n];
        for sample in 0..self.format.num_samples() {
            for allele in self.format.gt(sample).iter().filter_map(Value::get) {
                if let Some(count) = counts.get_mut(allele as usize) {
                    *count += 1;
                }
            }
        }
        self.info.an = counts.iter().sum();
        self.info.ac = counts.into_iter().skip(1).collect();
    }

    /// Sum ADF/ADR over samples into the site aggregates.
    pub fn sum_strand_depths(&mut self) {
        let n = self.num_alleles();
        let mut adf = vec![0i32; n];
        let mut adr = vec![0i32; n];
        for sample in 0..self.format.num_samples() {
            let pairs = self.format.adf(sample).iter().zip(self.format.adr(sample));
            for (j, (f, r)) in pairs.enumerate() {
                if let (Some(f), Some(r)) = (f.get(), r.get()) {
                    adf[j] += f;
                    adr[j] += r;
                }
            }
        }
        self.info.adf = Some(adf);
        self.info.adr = Some(adr);
    }
}
