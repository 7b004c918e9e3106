//! Canonical allele list for one merged site.
//!
//! The reference is fixed by the first record absorbed at the site and only
//! ever extended when a later record carries a longer reference that starts
//! with it. Alternates are kept expressed against the current reference, so
//! extending the reference pads every known alternate with the new suffix.

use std::collections::HashMap;

use thiserror::Error;

use crate::site::MergedSite;
use crate::types::{is_symbolic, AlleleKey, CallPosition, CallRecord, VariantClass};

/// Errors raised while collapsing alleles.
#[derive(Debug, Error)]
pub enum CollapseError {
    /// Two records at one site disagree on the reference sequence.
    #[error("reference {found} at {position} is incompatible with {expected}")]
    ReferenceMismatch {
        /// Site position.
        position: CallPosition,
        /// Canonical reference so far.
        expected: String,
        /// Reference of the offending record.
        found: String,
    },
    /// `collapse` called before any record was absorbed.
    #[error("no record absorbed at {0}")]
    Empty(CallPosition),
}

/// Builds the canonical reference and alternate list of a merged site.
#[derive(Debug, Default)]
pub struct AlleleCollapser {
    position: CallPosition,
    rank: Option<VariantClass>,
    reference: String,
    alternates: Vec<String>,
    index: HashMap<AlleleKey, usize>,
    max_end: u32,
    absorbed: usize,
}

impl AlleleCollapser {
    /// Empty collapser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh pass at `position` for records of `rank`.
    pub fn set_position(&mut self, position: CallPosition, rank: VariantClass) {
        self.position = position;
        self.rank = Some(rank);
        self.reference.clear();
        self.alternates.clear();
        self.index.clear();
        self.max_end = position.pos;
        self.absorbed = 0;
    }

    /// Current site position.
    pub fn position(&self) -> CallPosition {
        self.position
    }

    /// Rank of the records merged at this site.
    pub fn rank(&self) -> Option<VariantClass> {
        self.rank
    }

    /// Absorb every alternate of `record`.
    ///
    /// Returns, per source alternate, its index in the merged allele list
    /// (1-based; 0 is the reference).
    pub fn allele(&mut self, record: &CallRecord) -> Result<Vec<usize>, CollapseError> {
        debug_assert_eq!(record.position, self.position);
        self.reconcile_reference(&record.ref_allele)?;
        self.max_end = self.max_end.max(record.end());
        self.absorbed += 1;

        let suffix = self.reference[record.ref_allele.len()..].to_string();
        let mut map = Vec::with_capacity(record.alt_alleles.len());
        for (alt_index, alternate) in record.alt_alleles.iter().enumerate() {
            let key = record.allele_key(alt_index);
            let merged = match self.index.get(&key) {
                Some(&merged) => merged,
                None => {
                    let padded = if is_symbolic(alternate) {
                        alternate.clone()
                    } else {
                        format!("{alternate}{suffix}")
                    };
                    self.alternates.push(padded);
                    let merged = self.alternates.len();
                    self.index.insert(key, merged);
                    merged
                }
            };
            map.push(merged);
        }
        Ok(map)
    }

    /// Largest inclusive end among absorbed records.
    pub fn max_end(&self) -> u32 {
        self.max_end
    }

    /// Number of alleles collected so far, reference included.
    pub fn num_alleles(&self) -> usize {
        1 + self.alternates.len()
    }

    /// Write the canonical alleles into `site` and size its buffers.
    pub fn collapse(&self, site: &mut MergedSite) -> Result<(), CollapseError> {
        if self.absorbed == 0 {
            return Err(CollapseError::Empty(self.position));
        }
        site.position = self.position;
        site.alleles.clear();
        site.alleles.push(self.reference.clone());
        site.alleles.extend(self.alternates.iter().cloned());
        site.format.reset(site.alleles.len());
        Ok(())
    }

    fn reconcile_reference(&mut self, reference: &str) -> Result<(), CollapseError> {
        if self.reference.is_empty() {
            self.reference = reference.to_string();
            return Ok(());
        }
        if prefix_of(reference, &self.reference) {
            return Ok(());
        }
        if prefix_of(&self.reference, reference) {
            let suffix = &reference[self.reference.len()..];
            for alternate in self.alternates.iter_mut().filter(|a| !is_symbolic(a)) {
                alternate.push_str(suffix);
            }
            self.reference = reference.to_string();
            return Ok(());
        }
        Err(CollapseError::ReferenceMismatch {
            position: self.position,
            expected: self.reference.clone(),
            found: reference.to_string(),
        })
    }
}

fn prefix_of(short: &str, long: &str) -> bool {
    long.len() >= short.len() && long.as_bytes()[..short.len()].eq_ignore_ascii_case(short.as_bytes())
}
