//! Single-sample gVCF/BCF input through htslib.

use std::path::Path;

use rust_htslib::bcf::{self, header::HeaderView, Read};
use tracing::info;

use super::ContigDictionary;
use crate::cursor::{BufferedCursor, CursorError, SampleSchema, StreamEntry};
use crate::depth::DepthBlock;
use crate::likelihood::num_likelihoods;
use crate::merge::Region;
use crate::types::{CallPosition, CallRecord, FieldData, Value};

const MISSING_INTEGER: i32 = i32::MIN;
const VECTOR_END_INTEGER: i32 = i32::MIN + 1;
const MISSING_FLOAT_BITS: u32 = 0x7F80_0001;
const VECTOR_END_FLOAT_BITS: u32 = 0x7F80_0002;

/// Cursor over one single-sample gVCF/BCF file.
pub type GvcfCursor = BufferedCursor<GvcfSource>;

/// Open `path` as a sample cursor.
///
/// With a region the file must be indexed and only overlapping records are
/// read. Contig ids are resolved against `contigs`.
pub fn open_gvcf(
    path: impl AsRef<Path>,
    contigs: &ContigDictionary,
    region: Option<&Region>,
    buffer_size: usize,
) -> Result<GvcfCursor, CursorError> {
    let source = GvcfSource::open(path.as_ref(), contigs, region)?;
    let schema = source.schema()?;
    info!(
        path = %path.as_ref().display(),
        sample = %schema.name,
        has_pl = schema.has_pl,
        has_strand_depth = schema.has_strand_depth,
        "opened input"
    );
    Ok(BufferedCursor::with_capacity(schema, source, buffer_size))
}

/// Contig dictionary declared by the header of `path`.
pub fn read_contigs(path: impl AsRef<Path>) -> Result<ContigDictionary, CursorError> {
    let reader = bcf::Reader::from_path(path.as_ref())?;
    ContigDictionary::from_header(reader.header())
}

enum InputReader {
    Stream(bcf::Reader),
    Region(bcf::IndexedReader),
}

impl InputReader {
    fn header(&self) -> &HeaderView {
        match self {
            InputReader::Stream(reader) => reader.header(),
            InputReader::Region(reader) => reader.header(),
        }
    }

    fn empty_record(&self) -> bcf::Record {
        match self {
            InputReader::Stream(reader) => reader.empty_record(),
            InputReader::Region(reader) => reader.empty_record(),
        }
    }

    fn read(&mut self, record: &mut bcf::Record) -> Option<rust_htslib::errors::Result<()>> {
        match self {
            InputReader::Stream(reader) => reader.read(record),
            InputReader::Region(reader) => reader.read(record),
        }
    }
}

/// Decodes htslib records into [`StreamEntry`] values.
///
/// A trailing `<NON_REF>`/`<*>` alternate is removed together with its PL
/// and AD entries. Records left without an alternate are reference blocks.
pub struct GvcfSource {
    path: String,
    reader: InputReader,
    record: bcf::Record,
    contig_ids: Vec<Option<u32>>,
}

impl std::fmt::Debug for GvcfSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GvcfSource").field("path", &self.path).finish()
    }
}

impl GvcfSource {
    /// Open `path`, optionally restricted to `region`.
    pub fn open(
        path: &Path,
        contigs: &ContigDictionary,
        region: Option<&Region>,
    ) -> Result<Self, CursorError> {
        let display = path.display().to_string();
        let reader = match region {
            None => InputReader::Stream(bcf::Reader::from_path(path)?),
            Some(region) => {
                let mut reader = bcf::IndexedReader::from_path(path)?;
                let rid = reader.header().name2rid(region.contig.as_bytes())?;
                reader.fetch(rid, u64::from(region.start), region.end.map(u64::from))?;
                InputReader::Region(reader)
            }
        };

        let header = reader.header();
        let samples = header.sample_count() as usize;
        if samples != 1 {
            return Err(CursorError::SampleCount {
                path: display,
                found: samples,
            });
        }
        let contig_ids = (0..header.contig_count())
            .map(|rid| {
                header
                    .rid2name(rid)
                    .ok()
                    .and_then(|name| contigs.id(&String::from_utf8_lossy(name)))
            })
            .collect();
        let record = reader.empty_record();

        Ok(Self {
            path: display,
            reader,
            record,
            contig_ids,
        })
    }

    /// Sample name and optional-field availability from the header.
    pub fn schema(&self) -> Result<SampleSchema, CursorError> {
        let header = self.reader.header();
        let name = header
            .samples()
            .first()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .ok_or_else(|| CursorError::SampleCount {
                path: self.path.clone(),
                found: 0,
            })?;
        let declared = |tag: &[u8]| header.format_type(tag).is_ok();
        Ok(SampleSchema::new(
            name,
            declared(b"PL"),
            declared(b"ADF") && declared(b"ADR"),
        ))
    }

    fn position(&self) -> Result<CallPosition, CursorError> {
        let rid = self.record.rid().ok_or_else(|| CursorError::Decode {
            position: CallPosition::default(),
            message: format!("{}: record without contig", self.path),
        })?;
        let contig = match self.contig_ids.get(rid as usize).copied().flatten() {
            Some(id) => id,
            None => {
                let name = self.reader.header().rid2name(rid)?;
                return Err(CursorError::UnknownContig {
                    name: String::from_utf8_lossy(name).into_owned(),
                });
            }
        };
        Ok(CallPosition::new(contig, self.record.pos() as u32))
    }

    fn decode(&self) -> Result<StreamEntry, CursorError> {
        let position = self.position()?;
        let alleles = self.record.alleles();
        let Some((reference, alternates)) = alleles.split_first() else {
            return Err(CursorError::Decode {
                position,
                message: "record without alleles".to_string(),
            });
        };
        let reference = String::from_utf8_lossy(reference).into_owned();
        let mut alts: Vec<String> = alternates
            .iter()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .filter(|a| a != ".")
            .collect();
        let stripped = matches!(alts.last().map(String::as_str), Some("<NON_REF>" | "<*>"));
        if stripped {
            alts.pop();
        }

        let genotype = self.genotype();
        if alts.is_empty() {
            return Ok(StreamEntry::Block(self.block(position, &reference, genotype)));
        }

        let num_allele = 1 + alts.len();
        let ploidy = genotype.as_ref().map_or(2, |gt| gt.len());
        let mut call = CallRecord::new(position, reference, alts);
        if let Value::Present(qual) = float_value(self.record.qual()) {
            call.qual = Some(qual);
        }
        call.mapping_quality = self.info_mapping_quality();
        if let Some(gt) = genotype {
            call = call.with_format("GT", FieldData::Genotype(gt));
        }
        for tag in ["AD", "ADF", "ADR", "PL", "DP", "DPF", "GQX"] {
            let Some(mut values) = self.format_integers(tag.as_bytes()) else {
                continue;
            };
            if stripped {
                match tag {
                    "AD" | "ADF" | "ADR" => values.truncate(num_allele),
                    "PL" => values.truncate(num_likelihoods(ploidy, num_allele)),
                    _ => {}
                }
            }
            call = call.with_format(tag, FieldData::Integer(values));
        }
        if let Some(gq) = self.format_integers(b"GQ") {
            call = call.with_format("GQ", FieldData::Integer(gq));
        } else if let Some(gq) = self.format_floats(b"GQ") {
            call = call.with_format("GQ", FieldData::Float(gq));
        }
        Ok(StreamEntry::Variant(call))
    }

    fn block(
        &self,
        position: CallPosition,
        reference: &str,
        genotype: Option<Vec<Value<u32>>>,
    ) -> DepthBlock {
        let span_end = position.pos + reference.len().max(1) as u32 - 1;
        let end = match self.record.info(b"END").integer() {
            Ok(Some(values)) => values
                .first()
                .copied()
                .filter(|&end| end > 0)
                .map_or(span_end, |end| end as u32 - 1),
            _ => span_end,
        };
        let first = |tag: &[u8]| -> Option<Value<i32>> {
            self.format_integers(tag)
                .and_then(|values| values.first().copied())
        };
        let dp = first(b"DP")
            .filter(Value::is_present)
            .or_else(|| first(b"MIN_DP"))
            .unwrap_or_default();
        let ploidy = genotype.map_or(2, |gt| gt.len().clamp(1, 2) as u8);
        DepthBlock::with_values(
            position.contig,
            position.pos,
            end.max(position.pos),
            dp,
            first(b"DPF").unwrap_or_default(),
            first(b"GQ").unwrap_or_default(),
            ploidy,
        )
    }

    fn genotype(&self) -> Option<Vec<Value<u32>>> {
        let genotypes = self.record.genotypes().ok()?;
        let alleles = genotypes
            .get(0)
            .iter()
            .map(|allele| allele.index().into())
            .collect();
        Some(alleles)
    }

    fn format_integers(&self, tag: &[u8]) -> Option<Vec<Value<i32>>> {
        let buffer = self.record.format(tag).integer().ok()?;
        let sample = buffer.first()?;
        Some(sample.iter().copied().map(integer_value).collect())
    }

    fn format_floats(&self, tag: &[u8]) -> Option<Vec<Value<f32>>> {
        let buffer = self.record.format(tag).float().ok()?;
        let sample = buffer.first()?;
        Some(sample.iter().copied().map(float_value).collect())
    }

    fn info_mapping_quality(&self) -> Option<i32> {
        if let Ok(Some(values)) = self.record.info(b"MQ").integer() {
            return values.first().copied().map(integer_value).and_then(|v| v.get());
        }
        if let Ok(Some(values)) = self.record.info(b"MQ").float() {
            return values
                .first()
                .copied()
                .map(float_value)
                .and_then(|v| v.get())
                .map(|mq| mq.round() as i32);
        }
        None
    }
}

impl Iterator for GvcfSource {
    type Item = Result<StreamEntry, CursorError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read(&mut self.record)? {
            Ok(()) => Some(self.decode()),
            Err(err) => Some(Err(err.into())),
        }
    }
}

fn integer_value(raw: i32) -> Value<i32> {
    match raw {
        MISSING_INTEGER => Value::Missing,
        VECTOR_END_INTEGER => Value::VectorEnd,
        v => Value::Present(v),
    }
}

fn float_value(raw: f32) -> Value<f32> {
    match raw.to_bits() {
        MISSING_FLOAT_BITS => Value::Missing,
        VECTOR_END_FLOAT_BITS => Value::VectorEnd,
        _ if raw.is_nan() => Value::Missing,
        _ => Value::Present(raw),
    }
}
