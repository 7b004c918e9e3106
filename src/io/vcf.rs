//! VCF text output of merged sites.

use anyhow::{anyhow, Context, Result};
use std::fmt::Write as _;
use std::io::Write;

use super::ContigDictionary;
use crate::site::MergedSite;
use crate::types::Value;

/// Fixed part of the output header; the rest depends on the inputs.
const PREAMBLE: &str = "##fileformat=VCFv4.2\n";

/// What the output header declares.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    /// Contig names, in id order.
    pub contigs: ContigDictionary,
    /// Output sample names.
    pub samples: Vec<String>,
    /// Emit FORMAT/PL.
    pub has_pl: bool,
    /// Emit FORMAT/ADF, FORMAT/ADR and their INFO sums.
    pub has_strand_depth: bool,
}

/// Streaming writer of merged sites as VCF text.
#[derive(Debug)]
pub struct VcfWriter<W: Write> {
    inner: W,
    layout: OutputLayout,
    line: String,
}

impl<W: Write> VcfWriter<W> {
    /// Writer over `inner`; call [`VcfWriter::write_header`] first.
    pub fn new(inner: W, layout: OutputLayout) -> Self {
        Self {
            inner,
            layout,
            line: String::new(),
        }
    }

    /// Write the meta lines and the column header.
    pub fn write_header(&mut self) -> Result<()> {
        let layout = &self.layout;
        let mut header = String::from(PREAMBLE);
        header.push_str(&format!("##source=gvcf-merge {}\n", env!("CARGO_PKG_VERSION")));
        header.push_str("##INFO=<ID=AC,Number=A,Type=Integer,Description=\"Allele count in genotypes\">\n");
        header.push_str("##INFO=<ID=AN,Number=1,Type=Integer,Description=\"Total number of alleles in called genotypes\">\n");
        header.push_str("##INFO=<ID=MQ,Number=1,Type=Integer,Description=\"Mean mapping quality of merged calls\">\n");
        if layout.has_strand_depth {
            header.push_str("##INFO=<ID=ADF,Number=R,Type=Integer,Description=\"Forward-strand allele depths summed over samples\">\n");
            header.push_str("##INFO=<ID=ADR,Number=R,Type=Integer,Description=\"Reverse-strand allele depths summed over samples\">\n");
        }
        header.push_str("##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n");
        header.push_str("##FORMAT=<ID=GQ,Number=1,Type=Integer,Description=\"Genotype quality\">\n");
        header.push_str("##FORMAT=<ID=GQX,Number=1,Type=Integer,Description=\"Empirically calibrated genotype quality\">\n");
        header.push_str("##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Read depth\">\n");
        header.push_str("##FORMAT=<ID=DPF,Number=1,Type=Integer,Description=\"Reads filtered from the depth\">\n");
        header.push_str("##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allele depths\">\n");
        if layout.has_strand_depth {
            header.push_str("##FORMAT=<ID=ADF,Number=R,Type=Integer,Description=\"Forward-strand allele depths\">\n");
            header.push_str("##FORMAT=<ID=ADR,Number=R,Type=Integer,Description=\"Reverse-strand allele depths\">\n");
        }
        if layout.has_pl {
            header.push_str("##FORMAT=<ID=PL,Number=G,Type=Integer,Description=\"Phred-scaled genotype likelihoods\">\n");
        }
        for name in layout.contigs.names() {
            header.push_str(&format!("##contig=<ID={name}>\n"));
        }
        header.push_str("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT");
        for sample in &layout.samples {
            header.push('\t');
            header.push_str(sample);
        }
        header.push('\n');
        self.inner.write_all(header.as_bytes())?;
        Ok(())
    }

    /// Write one site.
    pub fn write_site(&mut self, site: &MergedSite) -> Result<()> {
        let contig = self
            .layout
            .contigs
            .name(site.position.contig)
            .ok_or_else(|| anyhow!("no name for contig id {}", site.position.contig))?;
        let line = &mut self.line;
        line.clear();

        write!(
            line,
            "{contig}\t{pos}\t.\t{reference}\t{alts}\t{qual}\t.\t",
            pos = site.position.pos + 1,
            reference = site.reference(),
            alts = site.alternates().join(","),
            qual = site.qual,
        )?;

        let info = &site.info;
        write!(line, "AC={};AN={}", join(info.ac.iter()), info.an)?;
        if let Some(mq) = info.mq {
            write!(line, ";MQ={mq}")?;
        }
        if self.layout.has_strand_depth {
            if let (Some(adf), Some(adr)) = (&info.adf, &info.adr) {
                write!(line, ";ADF={};ADR={}", join(adf.iter()), join(adr.iter()))?;
            }
        }

        line.push_str("\tGT:GQ:GQX:DP:DPF:AD");
        if self.layout.has_strand_depth {
            line.push_str(":ADF:ADR");
        }
        if self.layout.has_pl {
            line.push_str(":PL");
        }

        let format = &site.format;
        for sample in 0..format.num_samples() {
            write!(
                line,
                "\t{}:{}:{}:{}:{}:{}",
                genotype(format.gt(sample)),
                values(&[format.gq(sample)]),
                values(&[format.gqx(sample)]),
                values(&[format.dp(sample)]),
                values(&[format.dpf(sample)]),
                values(format.ad(sample)),
            )?;
            if self.layout.has_strand_depth {
                write!(line, ":{}:{}", values(format.adf(sample)), values(format.adr(sample)))?;
            }
            if self.layout.has_pl {
                write!(line, ":{}", values(format.pl(sample)))?;
            }
        }
        line.push('\n');
        self.inner
            .write_all(line.as_bytes())
            .with_context(|| format!("writing site {}", site.position))?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

fn join<'a>(values: impl Iterator<Item = &'a i32>) -> String {
    let parts: Vec<String> = values.map(i32::to_string).collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join(",")
    }
}

/// Comma-separated values; `VectorEnd` entries are dropped, an all-missing vector is `.`.
fn values(field: &[Value<i32>]) -> String {
    if field.iter().all(|v| !v.is_present()) {
        return ".".to_string();
    }
    field
        .iter()
        .filter_map(|v| match v {
            Value::Present(x) => Some(x.to_string()),
            Value::Missing => Some(".".to_string()),
            Value::VectorEnd => None,
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn genotype(slots: &[Value<u32>]) -> String {
    let alleles: Vec<String> = slots
        .iter()
        .filter_map(|v| match v {
            Value::Present(a) => Some(a.to_string()),
            Value::Missing => Some(".".to_string()),
            Value::VectorEnd => None,
        })
        .collect();
    if alleles.is_empty() {
        ".".to_string()
    } else {
        alleles.join("/")
    }
}

/// Render a header and sites into a string (useful for tests and snapshots).
pub fn render_vcf<'a, I>(layout: OutputLayout, sites: I) -> Result<String>
where
    I: IntoIterator<Item = &'a MergedSite>,
{
    let mut writer = VcfWriter::new(Vec::new(), layout);
    writer.write_header()?;
    for site in sites {
        writer.write_site(site)?;
    }
    let buffer = writer.finish()?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered VCF is not valid UTF-8"))
}
