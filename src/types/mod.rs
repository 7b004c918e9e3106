//! Core value types shared by every stage of the merge.
//!
//! A [`CallRecord`] is one sample's decoded variant call. Its FORMAT fields
//! are kept loosely typed ([`FieldData`]) so that the genotype decoder can
//! apply the tolerance rules (float GQ, absent PL, ...) in one place.

mod allele;

pub use allele::{is_symbolic, AlleleKey, VariantClass};

use std::collections::HashMap;
use std::fmt;

/// Genomic coordinate used as the merge key.
///
/// Ordered by contig id first, then by 0-based offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CallPosition {
    /// Contig identifier (index into the shared contig dictionary).
    pub contig: u32,
    /// 0-based offset on the contig.
    pub pos: u32,
}

impl CallPosition {
    /// Construct a new position.
    pub fn new(contig: u32, pos: u32) -> Self {
        Self { contig, pos }
    }
}

impl fmt::Display for CallPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.contig, self.pos + 1)
    }
}

/// A single FORMAT/INFO value with the three states VCF distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Value<T> {
    /// A real value.
    Present(T),
    /// Expected but not known (`.` in VCF).
    #[default]
    Missing,
    /// Not applicable, e.g. the second GT slot of a haploid call.
    VectorEnd,
}

impl<T: Copy> Value<T> {
    /// Returns the contained value if present.
    pub fn get(&self) -> Option<T> {
        match self {
            Value::Present(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether a real value is held.
    pub fn is_present(&self) -> bool {
        matches!(self, Value::Present(_))
    }

    /// Whether the value is `Missing`.
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Map the present value, keeping the missing/vector-end state.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Value<U> {
        match self {
            Value::Present(v) => Value::Present(f(v)),
            Value::Missing => Value::Missing,
            Value::VectorEnd => Value::VectorEnd,
        }
    }
}

impl<T> From<Option<T>> for Value<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Value::Present(v),
            None => Value::Missing,
        }
    }
}

impl Value<i32> {
    /// Sum of two counts where a missing operand contributes nothing.
    ///
    /// Two missing operands stay missing.
    pub fn saturating_add(self, other: Value<i32>) -> Value<i32> {
        match (self.get(), other.get()) {
            (Some(a), Some(b)) => Value::Present(a.saturating_add(b)),
            (Some(a), None) | (None, Some(a)) => Value::Present(a),
            (None, None) => Value::Missing,
        }
    }
}

/// Loosely typed FORMAT payload for a single sample.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    /// Integer values (`Type=Integer`).
    Integer(Vec<Value<i32>>),
    /// Floating point values (`Type=Float`).
    Float(Vec<Value<f32>>),
    /// Genotype allele indices (GT).
    Genotype(Vec<Value<u32>>),
}

impl FieldData {
    /// Number of values, including missing entries but excluding vector ends.
    pub fn len(&self) -> usize {
        fn count<T>(values: &[Value<T>]) -> usize {
            values
                .iter()
                .filter(|v| !matches!(v, Value::VectorEnd))
                .count()
        }
        match self {
            FieldData::Integer(v) => count(v),
            FieldData::Float(v) => count(v),
            FieldData::Genotype(v) => count(v),
        }
    }

    /// Whether no values are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the field is a single missing value (how VCF writes an unset vector).
    pub fn is_single_missing(&self) -> bool {
        match self {
            FieldData::Integer(v) => matches!(v.as_slice(), [Value::Missing]),
            FieldData::Float(v) => matches!(v.as_slice(), [Value::Missing]),
            FieldData::Genotype(v) => matches!(v.as_slice(), [Value::Missing]),
        }
    }
}

/// One sample's variant call as yielded by a [`crate::cursor::SampleCursor`].
///
/// Alleles are assumed to be normalised already.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    /// Start of the record (position of the first reference base).
    pub position: CallPosition,
    /// Reference allele.
    pub ref_allele: String,
    /// Alternate alleles, in record order.
    pub alt_alleles: Vec<String>,
    /// Site quality, if reported.
    pub qual: Option<f32>,
    /// INFO/MQ, if reported.
    pub mapping_quality: Option<i32>,
    /// FORMAT fields of the single sample keyed by tag.
    pub format: HashMap<String, FieldData>,
}

impl CallRecord {
    /// Construct a record without any FORMAT fields.
    pub fn new(
        position: CallPosition,
        ref_allele: impl Into<String>,
        alt_alleles: Vec<String>,
    ) -> Self {
        Self {
            position,
            ref_allele: ref_allele.into(),
            alt_alleles,
            qual: None,
            mapping_quality: None,
            format: HashMap::new(),
        }
    }

    /// Attach a FORMAT field (builder style).
    pub fn with_format(mut self, tag: impl Into<String>, data: FieldData) -> Self {
        self.format.insert(tag.into(), data);
        self
    }

    /// Attach integer FORMAT values, all present.
    pub fn with_integers(self, tag: impl Into<String>, values: &[i32]) -> Self {
        let values = values.iter().copied().map(Value::Present).collect();
        self.with_format(tag, FieldData::Integer(values))
    }

    /// Attach an unphased genotype.
    pub fn with_genotype(self, alleles: &[u32]) -> Self {
        let values = alleles.iter().copied().map(Value::Present).collect();
        self.with_format("GT", FieldData::Genotype(values))
    }

    /// Set QUAL.
    pub fn with_qual(mut self, qual: f32) -> Self {
        self.qual = Some(qual);
        self
    }

    /// Set INFO/MQ.
    pub fn with_mapping_quality(mut self, mq: i32) -> Self {
        self.mapping_quality = Some(mq);
        self
    }

    /// Number of alleles, reference included.
    pub fn num_alleles(&self) -> usize {
        1 + self.alt_alleles.len()
    }

    /// Inclusive end of the reference span.
    pub fn end(&self) -> u32 {
        let len = self.ref_allele.len().max(1) as u32;
        self.position.pos + len - 1
    }

    /// FORMAT field lookup.
    pub fn field(&self, tag: &str) -> Option<&FieldData> {
        self.format.get(tag)
    }

    /// Allele identity of the `alt_index`-th alternate (0-based over alternates).
    pub fn allele_key(&self, alt_index: usize) -> AlleleKey {
        AlleleKey::new(
            self.position,
            &self.ref_allele,
            &self.alt_alleles[alt_index],
        )
    }

    /// Rank used to decide which records at one position are merged together.
    ///
    /// A record is ranked by its first alternate allele.
    pub fn rank(&self) -> VariantClass {
        if self.alt_alleles.is_empty() {
            return VariantClass::Complex;
        }
        self.allele_key(0).rank()
    }

    /// Full merge key: position, then rank.
    pub fn merge_key(&self) -> (CallPosition, VariantClass) {
        (self.position, self.rank())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_order_by_contig_then_offset() {
        let a = CallPosition::new(1, 500);
        let b = CallPosition::new(2, 10);
        let c = CallPosition::new(2, 11);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(b.max(c), c);
    }

    #[test]
    fn missing_counts_do_not_poison_sums() {
        assert_eq!(Value::Present(3).saturating_add(Value::Present(4)), Value::Present(7));
        assert_eq!(Value::Present(3).saturating_add(Value::Missing), Value::Present(3));
        assert_eq!(Value::<i32>::Missing.saturating_add(Value::Missing), Value::Missing);
    }

    #[test]
    fn field_length_ignores_vector_end() {
        let gt = FieldData::Genotype(vec![Value::Present(0), Value::VectorEnd]);
        assert_eq!(gt.len(), 1);
        assert!(FieldData::Integer(vec![Value::Missing]).is_single_missing());
    }

    #[test]
    fn record_end_spans_reference() {
        let record = CallRecord::new(CallPosition::new(0, 99), "ACG", vec!["A".into()]);
        assert_eq!(record.end(), 101);
        assert_eq!(record.rank(), VariantClass::Deletion);
    }
}
