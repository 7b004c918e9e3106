//! Per-sample genotype decoding and re-encoding onto the merged allele basis.
//!
//! A decoded [`Genotype`] mirrors one sample's record. For every alternate
//! the merger marginalises it onto a three-allele basis (reference, target,
//! other) and propagates the result into the site buffers at the target's
//! merged index.

use thiserror::Error;
use tracing::warn;

use crate::cursor::SampleSchema;
use crate::likelihood::{
    combine_phred, likelihood_index, num_likelihoods, phred, unphred, MAX_PHRED,
};
use crate::site::SampleFields;
use crate::types::{CallPosition, CallRecord, FieldData, Value};

/// Errors raised while decoding or re-encoding a genotype.
#[derive(Debug, Error)]
pub enum GenotypeError {
    /// Ploidy outside `0..=2`.
    #[error("invalid ploidy {ploidy} at {position}")]
    InvalidPloidy {
        /// Offending ploidy.
        ploidy: usize,
        /// Record position.
        position: CallPosition,
    },
    /// A required FORMAT field is absent.
    #[error("missing required FORMAT/{tag} at {position}")]
    MissingField {
        /// Field tag.
        tag: &'static str,
        /// Record position.
        position: CallPosition,
    },
    /// A FORMAT field has the wrong number of values.
    #[error("FORMAT/{tag} at {position}: expected {expected} values, found {found}")]
    FieldCount {
        /// Field tag.
        tag: &'static str,
        /// Record position.
        position: CallPosition,
        /// Expected number of values.
        expected: usize,
        /// Number of values found.
        found: usize,
    },
    /// A FORMAT field has an unusable type.
    #[error("FORMAT/{tag} at {position} has an unexpected type")]
    FieldType {
        /// Field tag.
        tag: &'static str,
        /// Record position.
        position: CallPosition,
    },
    /// GT refers to an allele the record does not have.
    #[error("genotype allele {allele} at {position} exceeds {num_allele} alleles")]
    AlleleIndex {
        /// Offending allele index.
        allele: u32,
        /// Number of alleles in the record.
        num_allele: usize,
        /// Record position.
        position: CallPosition,
    },
    /// The record carries no alternate allele.
    #[error("record at {position} has no alternate allele")]
    NoAlternateAllele {
        /// Record position.
        position: CallPosition,
    },
}

/// Decoded genotype of one sample at one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Genotype {
    position: CallPosition,
    ploidy: usize,
    num_allele: usize,
    source_allele_count: usize,
    gt: Vec<Value<u32>>,
    pl: Vec<Value<i32>>,
    gl: Vec<f64>,
    ad: Vec<Value<i32>>,
    adf: Option<Vec<Value<i32>>>,
    adr: Option<Vec<Value<i32>>>,
    depth: Option<(Value<i32>, Value<i32>)>,
    gq: Value<i32>,
    gqx: Value<i32>,
    has_pl: bool,
    qual: Option<f32>,
    mapping_quality: Option<i32>,
}

impl Genotype {
    /// Decode the single sample of `record`.
    pub fn decode(schema: &SampleSchema, record: &CallRecord) -> Result<Self, GenotypeError> {
        let position = record.position;
        let num_allele = record.num_alleles();
        if num_allele < 2 {
            return Err(GenotypeError::NoAlternateAllele { position });
        }

        let gt = match record.field("GT") {
            Some(FieldData::Genotype(values)) => values
                .iter()
                .copied()
                .filter(|v| !matches!(v, Value::VectorEnd))
                .collect::<Vec<_>>(),
            Some(_) => return Err(GenotypeError::FieldType { tag: "GT", position }),
            None => return Err(GenotypeError::MissingField { tag: "GT", position }),
        };
        let ploidy = gt.len();
        if ploidy > 2 {
            return Err(GenotypeError::InvalidPloidy { ploidy, position });
        }
        if let Some(allele) = gt
            .iter()
            .filter_map(Value::get)
            .find(|&a| a as usize >= num_allele)
        {
            return Err(GenotypeError::AlleleIndex {
                allele,
                num_allele,
                position,
            });
        }

        let expected = num_likelihoods(ploidy, num_allele);
        let (pl, has_pl) = match record.field("PL") {
            None => (vec![Value::Missing; expected], false),
            Some(data) if data.is_single_missing() => (vec![Value::Missing; expected], false),
            Some(FieldData::Integer(values)) => {
                let values = without_vector_end(values);
                if values.len() != expected {
                    return Err(GenotypeError::FieldCount {
                        tag: "PL",
                        position,
                        expected,
                        found: values.len(),
                    });
                }
                (values, true)
            }
            Some(_) => return Err(GenotypeError::FieldType { tag: "PL", position }),
        };
        if !has_pl && schema.has_pl {
            warn!(sample = %schema.name, %position, "record without PL; using uniform likelihoods");
        }
        let gl = if has_pl {
            pl.iter()
                .map(|v| v.get().map_or(0.0, unphred))
                .collect()
        } else {
            vec![1.0; expected]
        };

        let ad = match integers(record, "AD", position)? {
            Some(values) if values.len() == num_allele => values,
            Some(values) => {
                return Err(GenotypeError::FieldCount {
                    tag: "AD",
                    position,
                    expected: num_allele,
                    found: values.len(),
                })
            }
            None => return Err(GenotypeError::MissingField { tag: "AD", position }),
        };

        let adf = strand_depth(schema, record, "ADF", num_allele)?;
        let adr = strand_depth(schema, record, "ADR", num_allele)?;

        let depth = match integers(record, "DP", position)? {
            Some(values) => Some((
                values.first().copied().unwrap_or_default(),
                first(integers(record, "DPF", position)?),
            )),
            None => None,
        };

        let gq = match record.field("GQ") {
            Some(FieldData::Integer(values)) => values.first().copied().unwrap_or_default(),
            Some(FieldData::Float(values)) => values
                .first()
                .copied()
                .unwrap_or_default()
                .map(|q| q as i32),
            Some(_) => return Err(GenotypeError::FieldType { tag: "GQ", position }),
            None => {
                warn!(sample = %schema.name, %position, "record without GQ");
                Value::Missing
            }
        };
        let gqx = first(integers(record, "GQX", position)?);

        Ok(Self {
            position,
            ploidy,
            num_allele,
            source_allele_count: num_allele,
            gt,
            pl,
            gl,
            ad,
            adf,
            adr,
            depth,
            gq,
            gqx,
            has_pl,
            qual: record.qual,
            mapping_quality: record.mapping_quality,
        })
    }

    /// Record position.
    pub fn position(&self) -> CallPosition {
        self.position
    }

    /// Number of called allele slots (0, 1 or 2).
    pub fn ploidy(&self) -> usize {
        self.ploidy
    }

    /// Number of alleles, reference included.
    pub fn num_allele(&self) -> usize {
        self.num_allele
    }

    /// Allele count of the record this genotype was derived from.
    pub fn source_allele_count(&self) -> usize {
        self.source_allele_count
    }

    /// Genotype allele indices.
    pub fn gt(&self) -> &[Value<u32>] {
        &self.gt
    }

    /// Phred-scaled likelihoods.
    pub fn pl(&self) -> &[Value<i32>] {
        &self.pl
    }

    /// Linear-domain likelihoods.
    pub fn gl(&self) -> &[f64] {
        &self.gl
    }

    /// Likelihood of genotype `(i, j)` (diploid layout).
    pub fn pl_at(&self, i: usize, j: usize) -> Value<i32> {
        self.pl[likelihood_index(i, j, self.num_allele)]
    }

    /// Allele depths.
    pub fn ad(&self) -> &[Value<i32>] {
        &self.ad
    }

    /// Forward-strand allele depths, when supplied.
    pub fn adf(&self) -> Option<&[Value<i32>]> {
        self.adf.as_deref()
    }

    /// Reverse-strand allele depths, when supplied.
    pub fn adr(&self) -> Option<&[Value<i32>]> {
        self.adr.as_deref()
    }

    /// Read depth; the sum of AD when the record carried no DP.
    pub fn dp(&self) -> Value<i32> {
        self.depth.map_or_else(|| sum_depths(&self.ad), |(dp, _)| dp)
    }

    /// Filtered read depth; `Missing` when the record carried no DP.
    pub fn dpf(&self) -> Value<i32> {
        self.depth.map_or(Value::Missing, |(_, dpf)| dpf)
    }

    /// Genotype quality.
    pub fn gq(&self) -> Value<i32> {
        self.gq
    }

    /// Calibrated genotype quality.
    pub fn gqx(&self) -> Value<i32> {
        self.gqx
    }

    /// Whether the record supplied PL.
    pub fn has_pl(&self) -> bool {
        self.has_pl
    }

    /// Whether the record supplied both ADF and ADR.
    pub fn has_strand_depth(&self) -> bool {
        self.adf.is_some() && self.adr.is_some()
    }

    /// Record QUAL.
    pub fn qual(&self) -> Option<f32> {
        self.qual
    }

    /// Record INFO/MQ.
    pub fn mapping_quality(&self) -> Option<i32> {
        self.mapping_quality
    }

    /// Collapse every alternate except `target` into a single "other" allele.
    ///
    /// The result has alleles `[ref, target, other]`. Likelihoods of
    /// genotypes involving a non-target alternate are summed into the
    /// corresponding "other" cell, which treats the excluded alternates as
    /// mutually exclusive with the target. PL is regenerated from GL.
    ///
    /// Panics unless `0 < target < num_allele`.
    pub fn marginalise(&self, target: usize) -> Genotype {
        assert!(
            target > 0 && target < self.num_allele,
            "cannot marginalise onto allele {target} of {}",
            self.num_allele
        );
        const OTHER: u32 = 2;
        let remap = |allele: usize| -> usize {
            match allele {
                0 => 0,
                a if a == target => 1,
                _ => OTHER as usize,
            }
        };

        let gt = self
            .gt
            .iter()
            .map(|v| v.map(|a| remap(a as usize) as u32))
            .collect();

        let gl = if self.ploidy == 1 {
            let mut gl = vec![0.0; 3];
            for (a, &value) in self.gl.iter().enumerate() {
                gl[remap(a)] += value;
            }
            gl
        } else {
            let mut gl = vec![0.0; num_likelihoods(2, 3)];
            for j in 0..self.num_allele {
                for i in 0..=j {
                    let src = likelihood_index(i, j, self.num_allele);
                    let dst = likelihood_index(remap(i), remap(j), 3);
                    gl[dst] += self.gl[src];
                }
            }
            gl
        };

        let marginal = |depths: &[Value<i32>]| -> Vec<Value<i32>> {
            let mut out = vec![Value::Missing; 3];
            for (a, &depth) in depths.iter().enumerate() {
                let slot = remap(a);
                out[slot] = if slot == OTHER as usize {
                    out[slot].saturating_add(depth)
                } else {
                    depth
                };
            }
            out
        };

        let mut out = Genotype {
            position: self.position,
            ploidy: self.ploidy,
            num_allele: 3,
            source_allele_count: self.num_allele,
            gt,
            pl: Vec::new(),
            gl,
            ad: marginal(&self.ad),
            adf: self.adf.as_deref().map(marginal),
            adr: self.adr.as_deref().map(marginal),
            depth: self.depth,
            gq: self.gq,
            gqx: self.gqx,
            has_pl: self.has_pl,
            qual: self.qual,
            mapping_quality: self.mapping_quality,
        };
        out.pl_from_gl();
        if !out.has_pl {
            out.pl.fill(Value::Missing);
        }
        out
    }

    /// Recompute PL from GL relative to the most likely genotype.
    pub fn pl_from_gl(&mut self) {
        let max = self.gl.iter().copied().fold(0.0_f64, f64::max);
        self.pl = self
            .gl
            .iter()
            .map(|&gl| {
                if gl > 0.0 {
                    Value::Present(phred(gl / max))
                } else {
                    Value::Present(MAX_PHRED)
                }
            })
            .collect();
    }

    /// Write this marginalised genotype into one sample's site buffers.
    ///
    /// `merged_index` is the merged position of allele 1 and `num_allele`
    /// the merged allele count. Cells already holding a likelihood are
    /// combined by multiplying probabilities.
    pub fn propagate_format_fields(
        &self,
        merged_index: usize,
        num_allele: usize,
        out: &mut SampleFields<'_>,
    ) -> Result<(), GenotypeError> {
        assert!(
            merged_index > 0 && merged_index < num_allele,
            "merged allele {merged_index} out of range for {num_allele} alleles"
        );
        if self.ploidy == 0 || self.ploidy > 2 {
            return Err(GenotypeError::InvalidPloidy {
                ploidy: self.ploidy,
                position: self.position,
            });
        }

        *out.gq = self.gq;
        *out.gqx = self.gqx;
        *out.dp = self.dp();
        *out.dpf = self.dpf();

        out.ad[0] = self.ad[0];
        out.ad[merged_index] = self.ad[1];
        if let Some(adf) = &self.adf {
            out.adf[0] = adf[0];
            out.adf[merged_index] = adf[1];
        }
        if let Some(adr) = &self.adr {
            out.adr[0] = adr[0];
            out.adr[merged_index] = adr[1];
        }

        if !self.has_pl {
            return Ok(());
        }
        if self.ploidy == 1 {
            out.pl[0] = self.pl[0];
            out.pl[merged_index] = self.pl[1];
            for cell in out.pl.iter_mut().skip(num_allele) {
                *cell = Value::VectorEnd;
            }
            return Ok(());
        }

        out.pl[likelihood_index(0, 0, num_allele)] = self.pl_at(0, 0);
        for i in 0..num_allele {
            let source = if i == 0 {
                (0, 1)
            } else if i == merged_index {
                (1, 1)
            } else if self.source_allele_count > 2 {
                (1, 2)
            } else {
                continue;
            };
            let Some(value) = self.pl_at(source.0, source.1).get() else {
                continue;
            };
            let cell = &mut out.pl[likelihood_index(i, merged_index, num_allele)];
            *cell = match cell.get() {
                Some(existing) => Value::Present(combine_phred(value, existing)),
                None => Value::Present(value),
            };
        }
        Ok(())
    }

    /// Write a call none of whose alternates belong to the merged site.
    ///
    /// Reference GT alleles are kept and every alternate becomes missing, so
    /// the call never reads as hom-ref. Depth, GQ, GQX and the reference
    /// entries of AD/ADF/ADR are copied; PL is left missing.
    pub fn propagate_unmatched(&self, out: &mut SampleFields<'_>) {
        self.propagate_genotype(&[], out.gt);
        *out.gq = self.gq;
        *out.gqx = self.gqx;
        *out.dp = self.dp();
        *out.dpf = self.dpf();
        out.ad[0] = self.ad[0];
        if let Some(adf) = &self.adf {
            out.adf[0] = adf[0];
        }
        if let Some(adr) = &self.adr {
            out.adr[0] = adr[0];
        }
    }

    /// Write GT into the sample's output slots.
    ///
    /// Source allele `a > 0` maps to `allele_map[a - 1]`. Haploid calls mark
    /// the second slot `VectorEnd`.
    pub fn propagate_genotype(&self, allele_map: &[usize], slots: &mut [Value<u32>]) {
        for (k, slot) in slots.iter_mut().enumerate() {
            *slot = match self.gt.get(k) {
                Some(Value::Present(0)) => Value::Present(0),
                Some(Value::Present(a)) => allele_map
                    .get(*a as usize - 1)
                    .map_or(Value::Missing, |&m| Value::Present(m as u32)),
                Some(_) => Value::Missing,
                None if self.ploidy > 0 => Value::VectorEnd,
                None => Value::Missing,
            };
        }
    }
}

fn without_vector_end(values: &[Value<i32>]) -> Vec<Value<i32>> {
    values
        .iter()
        .copied()
        .filter(|v| !matches!(v, Value::VectorEnd))
        .collect()
}

fn integers(
    record: &CallRecord,
    tag: &'static str,
    position: CallPosition,
) -> Result<Option<Vec<Value<i32>>>, GenotypeError> {
    match record.field(tag) {
        Some(FieldData::Integer(values)) => Ok(Some(without_vector_end(values))),
        Some(_) => Err(GenotypeError::FieldType { tag, position }),
        None => Ok(None),
    }
}

fn first(values: Option<Vec<Value<i32>>>) -> Value<i32> {
    values
        .and_then(|v| v.first().copied())
        .unwrap_or_default()
}

fn sum_depths(values: &[Value<i32>]) -> Value<i32> {
    values
        .iter()
        .fold(Value::Missing, |acc, &v| acc.saturating_add(v))
}

fn strand_depth(
    schema: &SampleSchema,
    record: &CallRecord,
    tag: &'static str,
    num_allele: usize,
) -> Result<Option<Vec<Value<i32>>>, GenotypeError> {
    match integers(record, tag, record.position)? {
        Some(values) if values.len() == num_allele => Ok(Some(values)),
        Some(values) => {
            warn!(
                sample = %schema.name,
                position = %record.position,
                found = values.len(),
                "ignoring FORMAT/{tag} with wrong number of values"
            );
            Ok(None)
        }
        None => {
            if schema.has_strand_depth {
                warn!(sample = %schema.name, position = %record.position, "record without FORMAT/{tag}");
            }
            Ok(None)
        }
    }
}
