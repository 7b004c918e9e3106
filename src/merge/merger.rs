use tracing::{debug, info, trace};

use super::{build_roster, MergeConfig, MergeError};
use crate::collapse::AlleleCollapser;
use crate::cursor::SampleCursor;
use crate::depth::{fold_evidence, DepthBlock};
use crate::genotype::Genotype;
use crate::likelihood::{likelihood_index, MAX_PHRED};
use crate::site::{MergedSite, SampleFields, GT_SLOTS};
use crate::types::{CallPosition, Value};

/// Merges N sorted single-sample streams into one multi-sample stream.
///
/// Each call to [`StreamMerger::next_site`] runs one merge step: find the
/// smallest `(position, rank)` over all cursors, collapse the matching
/// records into one allele list, genotype every sample against it, derive
/// the site aggregates, and flush every cursor past the site's span.
#[derive(Debug)]
pub struct StreamMerger<C> {
    cursors: Vec<C>,
    samples: Vec<String>,
    collapser: AlleleCollapser,
    site: MergedSite,
    allele_maps: Vec<Vec<Vec<usize>>>,
    has_pl: bool,
    has_strand_depth: bool,
    last: Option<CallPosition>,
    emitted: usize,
}

impl<C: SampleCursor> StreamMerger<C> {
    /// Set up a merge over `cursors`, one per sample.
    pub fn new(cursors: Vec<C>, config: &MergeConfig) -> Result<Self, MergeError> {
        if cursors.is_empty() {
            return Err(MergeError::NoInputs);
        }
        config.validate()?;
        let samples = build_roster(
            cursors.iter().map(|c| c.schema().name.as_str()),
            config.force_samples,
        )?;
        let has_pl = cursors.iter().all(|c| c.schema().has_pl);
        let has_strand_depth = cursors.iter().all(|c| c.schema().has_strand_depth);
        info!(
            inputs = cursors.len(),
            has_pl, has_strand_depth, "merging sample streams"
        );
        Ok(Self {
            site: MergedSite::new(cursors.len()),
            allele_maps: vec![Vec::new(); cursors.len()],
            cursors,
            samples,
            collapser: AlleleCollapser::new(),
            has_pl,
            has_strand_depth,
            last: None,
            emitted: 0,
        })
    }

    /// Output sample names, duplicates already renamed.
    pub fn sample_names(&self) -> &[String] {
        &self.samples
    }

    /// Whether every input supplies PL.
    pub fn has_pl(&self) -> bool {
        self.has_pl
    }

    /// Whether every input supplies ADF and ADR.
    pub fn has_strand_depth(&self) -> bool {
        self.has_strand_depth
    }

    /// Number of sites emitted so far.
    pub fn sites_emitted(&self) -> usize {
        self.emitted
    }

    /// Run one merge step; `None` once every input is drained.
    ///
    /// The returned site borrows the merger's buffers and is overwritten by
    /// the next call.
    pub fn next_site(&mut self) -> Result<Option<&MergedSite>, MergeError> {
        let resume = self.last.unwrap_or_default();
        for cursor in &mut self.cursors {
            cursor.load(resume.contig, resume.pos)?;
        }
        if self.cursors.iter().all(|c| c.is_exhausted()) {
            info!(sites = self.emitted, "all inputs drained");
            return Ok(None);
        }

        let (position, rank) = self
            .cursors
            .iter()
            .filter_map(|c| c.front())
            .map(|record| record.merge_key())
            .min()
            .ok_or(MergeError::NoRemainingRecords)?;
        for cursor in &mut self.cursors {
            cursor.load(position.contig, position.pos)?;
        }

        self.site.clear();
        self.collapser.set_position(position, rank);
        for (cursor, maps) in self.cursors.iter().zip(&mut self.allele_maps) {
            maps.clear();
            for record in cursor.records_at(position, rank) {
                maps.push(self.collapser.allele(record)?);
            }
        }
        self.collapser.collapse(&mut self.site)?;
        let max_end = self.collapser.max_end();
        for cursor in &mut self.cursors {
            cursor.load(position.contig, max_end)?;
        }

        let num_allele = self.site.num_alleles();
        let mut qual = 0.0f32;
        let mut mq_sum = 0i64;
        let mut mq_count = 0i64;
        for (sample, cursor) in self.cursors.iter().enumerate() {
            let mut fields = self.site.format.sample_mut(sample);
            let overlapping = cursor.records_up_to(position.contig, max_end);
            if overlapping.is_empty() {
                let blocks = cursor.depth_blocks(position.contig, position.pos, max_end);
                let evidence = fold_evidence(blocks, position.contig, position.pos, max_end);
                synthesise_reference(&evidence, num_allele, self.has_pl, &mut fields);
                continue;
            }

            let absorbed: Vec<_> = overlapping
                .iter()
                .copied()
                .filter(|record| record.merge_key() == (position, rank))
                .collect();
            if absorbed.is_empty() {
                let genotype = Genotype::decode(cursor.schema(), overlapping[0])?;
                genotype.propagate_unmatched(&mut fields);
                debug!(
                    sample = %self.samples[sample],
                    %position,
                    call = %genotype.position(),
                    "call overlaps merged site without sharing its alleles"
                );
                continue;
            }
            for (k, (record, map)) in absorbed.iter().zip(&self.allele_maps[sample]).enumerate() {
                let genotype = Genotype::decode(cursor.schema(), record)?;
                if k == 0 {
                    genotype.propagate_genotype(map, fields.gt);
                }
                for (alt, &merged) in map.iter().enumerate() {
                    genotype
                        .marginalise(alt + 1)
                        .propagate_format_fields(merged, num_allele, &mut fields)?;
                }
                if let Some(q) = genotype.qual() {
                    qual += q;
                }
                if let Some(mq) = genotype.mapping_quality() {
                    mq_sum += i64::from(mq);
                    mq_count += 1;
                }
            }
        }

        self.site.qual = qual;
        self.site.count_alleles();
        if self.has_strand_depth {
            self.site.sum_strand_depths();
        }
        self.site.info.mq = (mq_count > 0).then(|| (mq_sum / mq_count) as i32);

        for (sample, cursor) in self.cursors.iter_mut().enumerate() {
            let absorbed = self.allele_maps[sample].len();
            let dropped = cursor.flush(position.contig, max_end);
            if dropped > absorbed {
                debug!(
                    sample = %self.samples[sample],
                    %position,
                    max_end = max_end + 1,
                    discarded = dropped - absorbed,
                    "discarding records overlapped by merged site"
                );
            }
        }

        if let Some(previous) = self.last {
            if position <= previous {
                return Err(MergeError::OutOfOrder {
                    previous,
                    current: position,
                });
            }
        }
        self.last = Some(position);
        self.emitted += 1;
        trace!(%position, alleles = num_allele, "emitting site");
        Ok(Some(&self.site))
    }
}

/// Hom-ref call for a sample without an explicit record at the site.
///
/// GT is called only when the folded evidence has positive depth. The PL
/// placeholder (0 for hom-ref, `MAX_PHRED` elsewhere) is a fixed
/// low-confidence value, not a computed likelihood, and is written whether
/// or not GT is called.
fn synthesise_reference(
    evidence: &DepthBlock,
    num_allele: usize,
    has_pl: bool,
    fields: &mut SampleFields<'_>,
) {
    let called = matches!(evidence.dp(), Value::Present(dp) if dp > 0);
    let ploidy = usize::from(evidence.ploidy()).clamp(1, GT_SLOTS);

    for (k, slot) in fields.gt.iter_mut().enumerate() {
        *slot = match (k < ploidy, called) {
            (true, true) => Value::Present(0),
            (true, false) => Value::Missing,
            (false, _) => Value::VectorEnd,
        };
    }
    *fields.dp = evidence.dp();
    *fields.dpf = evidence.dpf();
    *fields.gq = evidence.gq();
    if let Value::Present(dp) = evidence.dp() {
        fields.ad[0] = Value::Present(dp);
        for depth in fields.ad.iter_mut().skip(1) {
            *depth = Value::Present(0);
        }
    }

    if !has_pl {
        return;
    }
    let cells = if ploidy == 1 { num_allele } else { fields.pl.len() };
    for (k, cell) in fields.pl.iter_mut().enumerate() {
        *cell = if k < cells {
            Value::Present(MAX_PHRED)
        } else {
            Value::VectorEnd
        };
    }
    fields.pl[likelihood_index(0, 0, num_allele)] = Value::Present(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{MemoryCursor, SampleSchema, StreamEntry};
    use crate::types::CallRecord;

    fn schema(name: &str) -> SampleSchema {
        SampleSchema::new(name, true, false)
    }

    fn snv(pos: u32, alt: &str) -> StreamEntry {
        StreamEntry::Variant(
            CallRecord::new(CallPosition::new(0, pos), "A", vec![alt.to_string()])
                .with_genotype(&[0, 1])
                .with_integers("AD", &[5, 5])
                .with_integers("PL", &[40, 0, 40])
                .with_qual(20.0)
                .with_mapping_quality(50),
        )
    }

    fn merger(inputs: Vec<(&str, Vec<StreamEntry>)>) -> StreamMerger<MemoryCursor> {
        let cursors = inputs
            .into_iter()
            .map(|(name, entries)| MemoryCursor::from_entries(schema(name), entries))
            .collect();
        StreamMerger::new(cursors, &MergeConfig::default()).unwrap()
    }

    #[test]
    fn empty_input_list_is_rejected() {
        let err = StreamMerger::<MemoryCursor>::new(Vec::new(), &MergeConfig::default()).unwrap_err();
        assert!(matches!(err, MergeError::NoInputs));
    }

    #[test]
    fn drained_inputs_yield_nothing() {
        let mut m = merger(vec![("a", Vec::new())]);
        assert!(m.next_site().unwrap().is_none());
        assert_eq!(m.sites_emitted(), 0);
    }

    #[test]
    fn quality_and_mapping_quality_aggregate() {
        let mut m = merger(vec![("a", vec![snv(10, "G")]), ("b", vec![snv(10, "G")])]);
        let site = m.next_site().unwrap().unwrap();
        assert_eq!(site.alleles, vec!["A", "G"]);
        assert_eq!(site.qual, 40.0);
        assert_eq!(site.info.mq, Some(50));
        assert_eq!(site.info.ac, vec![2]);
        assert_eq!(site.info.an, 4);
        assert!(m.next_site().unwrap().is_none());
    }

    #[test]
    fn uncovered_sample_stays_missing() {
        let mut m = merger(vec![("a", vec![snv(10, "G")]), ("b", Vec::new())]);
        let site = m.next_site().unwrap().unwrap();
        assert_eq!(site.format.gt(1), &[Value::Missing, Value::Missing]);
        assert_eq!(site.format.dp(1), Value::Missing);
        assert_eq!(
            site.format.pl(1),
            &[Value::Present(0), Value::Present(MAX_PHRED), Value::Present(MAX_PHRED)]
        );
        assert_eq!(site.info.an, 2);
    }

    #[test]
    fn zero_depth_block_still_gets_placeholder_pl() {
        let empty = StreamEntry::Block(DepthBlock::new(0, 0, 20, 0, 0, 0, 2));
        let mut m = merger(vec![("a", vec![snv(10, "G")]), ("b", vec![empty])]);
        let site = m.next_site().unwrap().unwrap();
        assert_eq!(site.format.gt(1), &[Value::Missing, Value::Missing]);
        assert_eq!(site.format.ad(1), &[Value::Present(0), Value::Present(0)]);
        assert_eq!(site.format.pl(1)[0], Value::Present(0));
        assert_eq!(site.format.pl(1)[2], Value::Present(MAX_PHRED));
    }

    #[test]
    fn haploid_block_terminates_genotype_and_likelihoods() {
        let male_x = StreamEntry::Block(DepthBlock::new(0, 0, 20, 9, 0, 25, 1));
        let mut m = merger(vec![("a", vec![snv(10, "G")]), ("b", vec![male_x])]);
        let site = m.next_site().unwrap().unwrap();
        assert_eq!(site.format.gt(1), &[Value::Present(0), Value::VectorEnd]);
        assert_eq!(
            site.format.pl(1),
            &[Value::Present(0), Value::Present(MAX_PHRED), Value::VectorEnd]
        );
        assert_eq!(site.info.an, 3);
    }

    #[test]
    fn sites_advance_strictly() {
        let mut m = merger(vec![
            ("a", vec![snv(10, "G"), snv(30, "T")]),
            ("b", vec![snv(20, "C")]),
        ]);
        let mut positions = Vec::new();
        while let Some(site) = m.next_site().unwrap() {
            positions.push(site.position.pos);
        }
        assert_eq!(positions, vec![10, 20, 30]);
    }

    #[test]
    fn different_rank_call_at_same_position_is_not_hom_ref() {
        let deletion = StreamEntry::Variant(
            CallRecord::new(CallPosition::new(0, 10), "AC", vec!["A".into()])
                .with_genotype(&[0, 1])
                .with_integers("AD", &[3, 3])
                .with_integers("PL", &[30, 0, 30]),
        );
        let mut m = merger(vec![("a", vec![snv(10, "G")]), ("b", vec![deletion])]);
        let site = m.next_site().unwrap().unwrap();
        assert_eq!(site.alleles, vec!["A", "G"]);
        assert_eq!(site.format.gt(1), &[Value::Present(0), Value::Missing]);
        assert_eq!(site.format.ad(1), &[Value::Present(3), Value::Missing]);
        assert_eq!(site.format.dp(1), Value::Present(6));
        assert_eq!(site.info.an, 3);
        assert!(m.next_site().unwrap().is_none());
    }
}
