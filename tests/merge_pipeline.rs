#[path = "common/mod.rs"]
mod common;

use common::{block, call, merger, variant};
use gvcf_merge::io::{render_vcf, ContigDictionary, OutputLayout};
use gvcf_merge::likelihood::likelihood_index;
use gvcf_merge::{
    CallPosition, MemoryCursor, MergeConfig, SampleSchema, StreamEntry, StreamMerger, Value,
};

fn layout_for(m: &StreamMerger<MemoryCursor>) -> OutputLayout {
    OutputLayout {
        contigs: ContigDictionary::new(["chr1"]),
        samples: m.sample_names().to_vec(),
        has_pl: m.has_pl(),
        has_strand_depth: m.has_strand_depth(),
    }
}

fn with_schema(schema: SampleSchema, entries: Vec<StreamEntry>) -> MemoryCursor {
    MemoryCursor::from_entries(schema, entries)
}

#[test]
fn het_call_and_reference_block_merge_into_one_site() {
    let mut m = merger(
        vec![
            (
                "het",
                vec![variant(call(0, 99, "A", &["G"], &[0, 1], &[10, 8], &[50, 0, 60]))],
            ),
            ("homref", vec![block(0, 0, 199, 12, 0, 30)]),
        ],
        &MergeConfig::default(),
    );

    let site = m.next_site().expect("merge step").expect("one site");
    assert_eq!(site.position, CallPosition::new(0, 99));
    assert_eq!(site.alleles, vec!["A", "G"]);

    let f = &site.format;
    assert_eq!(f.gt(0), &[Value::Present(0), Value::Present(1)]);
    assert_eq!(f.ad(0), &[Value::Present(10), Value::Present(8)]);
    assert_eq!(f.pl(0), &[Value::Present(50), Value::Present(0), Value::Present(60)]);

    assert_eq!(f.gt(1), &[Value::Present(0), Value::Present(0)]);
    assert_eq!(f.ad(1), &[Value::Present(12), Value::Present(0)]);
    assert_eq!(f.dp(1), Value::Present(12));
    assert_eq!(f.gq(1), Value::Present(30));
    assert_eq!(f.pl(1)[likelihood_index(0, 0, 2)], Value::Present(0));

    assert_eq!(site.info.ac, vec![1]);
    assert_eq!(site.info.an, 4);

    assert!(m.next_site().expect("merge step").is_none());
}

#[test]
fn extra_alternate_leaves_unrelated_cells_missing() {
    let mut m = merger(
        vec![
            (
                "biallelic",
                vec![variant(call(0, 99, "A", &["G"], &[0, 1], &[10, 8], &[50, 0, 60]))],
            ),
            (
                "triallelic",
                vec![variant(call(
                    0,
                    99,
                    "A",
                    &["G", "T"],
                    &[1, 2],
                    &[2, 9, 7],
                    &[90, 40, 60, 45, 0, 70],
                ))],
            ),
        ],
        &MergeConfig::default(),
    );

    let site = m.next_site().unwrap().unwrap();
    assert_eq!(site.alleles, vec!["A", "G", "T"]);

    let first = site.format.pl(0);
    assert_eq!(first[likelihood_index(0, 0, 3)], Value::Present(50));
    assert_eq!(first[likelihood_index(0, 1, 3)], Value::Present(0));
    assert_eq!(first[likelihood_index(1, 1, 3)], Value::Present(60));
    for (i, j) in [(0, 2), (1, 2), (2, 2)] {
        assert_eq!(first[likelihood_index(i, j, 3)], Value::Missing, "cell ({i},{j})");
    }

    let second = site.format.pl(1);
    let expected = [90, 40, 60, 45, 0, 70].map(Value::Present);
    assert_eq!(second, &expected);
    assert_eq!(site.format.gt(1), &[Value::Present(1), Value::Present(2)]);
    assert_eq!(
        site.format.ad(1),
        &[Value::Present(2), Value::Present(9), Value::Present(7)]
    );
    assert_eq!(site.info.ac, vec![2, 1]);
    assert_eq!(site.info.an, 4);
}

#[test]
fn padded_deletions_collapse_to_one_allele() {
    let mut m = merger(
        vec![
            (
                "short",
                vec![variant(call(0, 10, "AC", &["A"], &[0, 1], &[4, 4], &[30, 0, 30]))],
            ),
            (
                "padded",
                vec![variant(call(0, 10, "ACG", &["AG"], &[1, 1], &[0, 9], &[90, 20, 0]))],
            ),
        ],
        &MergeConfig::default(),
    );
    let site = m.next_site().unwrap().unwrap();
    assert_eq!(site.alleles, vec!["ACG", "AG"]);
    assert_eq!(site.format.gt(1), &[Value::Present(1), Value::Present(1)]);
    assert_eq!(site.info.ac, vec![3]);
}

#[test]
fn sites_are_strictly_ordered_across_contigs() {
    let mut m = merger(
        vec![
            (
                "a",
                vec![
                    variant(call(0, 10, "ACGT", &["A"], &[0, 1], &[5, 5], &[30, 0, 30])),
                    variant(call(0, 40, "C", &["G"], &[0, 1], &[5, 5], &[30, 0, 30])),
                    variant(call(2, 5, "T", &["C"], &[1, 1], &[0, 9], &[90, 20, 0])),
                ],
            ),
            (
                "b",
                vec![
                    variant(call(0, 12, "G", &["T"], &[0, 1], &[5, 5], &[30, 0, 30])),
                    variant(call(0, 40, "C", &["G"], &[1, 1], &[0, 8], &[80, 20, 0])),
                    variant(call(1, 7, "A", &["C"], &[0, 1], &[5, 5], &[30, 0, 30])),
                ],
            ),
        ],
        &MergeConfig::default(),
    );

    let mut positions = Vec::new();
    while let Some(site) = m.next_site().unwrap() {
        positions.push(site.position);
    }
    assert_eq!(
        positions,
        vec![
            CallPosition::new(0, 10),
            CallPosition::new(0, 40),
            CallPosition::new(1, 7),
            CallPosition::new(2, 5),
        ]
    );
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(m.sites_emitted(), 4);
}

#[test]
fn reference_evidence_is_folded_over_the_site_span() {
    let mut m = merger(
        vec![
            (
                "del",
                vec![variant(call(0, 100, "ACG", &["A"], &[0, 1], &[6, 6], &[40, 0, 40]))],
            ),
            (
                "ref",
                vec![block(0, 90, 100, 10, 1, 20), block(0, 101, 150, 14, 2, 30)],
            ),
        ],
        &MergeConfig::default(),
    );
    let site = m.next_site().unwrap().unwrap();
    assert_eq!(site.format.dp(1), Value::Present(24));
    assert_eq!(site.format.dpf(1), Value::Present(3));
    assert_eq!(site.format.gq(1), Value::Present(50));
    assert_eq!(site.format.gt(1), &[Value::Present(0), Value::Present(0)]);
}

#[test]
fn strand_depth_is_summed_when_every_input_has_it() {
    let record = |adf: &[i32], adr: &[i32]| {
        variant(
            call(0, 5, "A", &["G"], &[0, 1], &[6, 6], &[30, 0, 30])
                .with_integers("ADF", adf)
                .with_integers("ADR", adr),
        )
    };
    let cursors = vec![
        MemoryCursor::from_entries(SampleSchema::new("a", true, true), vec![record(&[3, 2], &[3, 4])]),
        MemoryCursor::from_entries(SampleSchema::new("b", true, true), vec![record(&[1, 1], &[5, 5])]),
    ];
    let mut m = StreamMerger::new(cursors, &MergeConfig::default()).unwrap();
    assert!(m.has_strand_depth());
    let site = m.next_site().unwrap().unwrap();
    assert_eq!(site.info.adf, Some(vec![4, 3]));
    assert_eq!(site.info.adr, Some(vec![8, 9]));
}

#[test]
fn snv_inside_another_samples_deletion_is_not_hom_ref() {
    let mut m = merger(
        vec![
            (
                "del",
                vec![variant(call(0, 10, "AC", &["A"], &[0, 1], &[5, 5], &[40, 0, 40]))],
            ),
            (
                "snv",
                vec![
                    block(0, 0, 10, 20, 0, 30),
                    variant(call(0, 11, "C", &["T"], &[0, 1], &[9, 7], &[45, 0, 50])),
                ],
            ),
        ],
        &MergeConfig::default(),
    );

    let site = m.next_site().unwrap().unwrap();
    assert_eq!(site.position, CallPosition::new(0, 10));
    assert_eq!(site.alleles, vec!["AC", "A"]);
    assert_ne!(site.format.gt(1), &[Value::Present(0), Value::Present(0)]);
    assert_eq!(site.format.gt(1), &[Value::Present(0), Value::Missing]);
    assert_eq!(site.format.ad(1), &[Value::Present(9), Value::Missing]);
    assert_eq!(site.format.dp(1), Value::Present(16));
    assert_eq!(site.info.ac, vec![1]);
    assert_eq!(site.info.an, 3);

    // The overlapped call is consumed by the site that covers it.
    assert!(m.next_site().unwrap().is_none());
}

#[test]
fn missing_pl_in_one_input_turns_pl_off() {
    let record = || variant(call(0, 5, "A", &["G"], &[0, 1], &[6, 6], &[30, 0, 30]));
    let cursors = vec![
        with_schema(SampleSchema::new("a", true, false), vec![record()]),
        with_schema(SampleSchema::new("b", false, false), vec![record()]),
    ];
    let mut m = StreamMerger::new(cursors, &MergeConfig::default()).unwrap();
    assert!(!m.has_pl());

    let layout = layout_for(&m);
    let site = m.next_site().unwrap().unwrap();
    let text = render_vcf(layout, [site]).unwrap();
    assert!(!text.contains("##FORMAT=<ID=PL"));
    assert!(!text.contains(":PL"));
    let line = text.lines().last().unwrap();
    assert!(line.ends_with("0/1:.:.:12:.:6,6\t0/1:.:.:12:.:6,6"));
}

#[test]
fn mixed_strand_depth_inputs_drop_strand_fields() {
    let record = || {
        variant(
            call(0, 5, "A", &["G"], &[0, 1], &[6, 6], &[30, 0, 30])
                .with_integers("ADF", &[3, 2])
                .with_integers("ADR", &[3, 4]),
        )
    };
    let cursors = vec![
        with_schema(SampleSchema::new("a", true, true), vec![record()]),
        with_schema(SampleSchema::new("b", true, false), vec![record()]),
    ];
    let mut m = StreamMerger::new(cursors, &MergeConfig::default()).unwrap();
    assert!(!m.has_strand_depth());

    let layout = layout_for(&m);
    let site = m.next_site().unwrap().unwrap();
    assert_eq!(site.info.adf, None);
    assert_eq!(site.info.adr, None);
    let text = render_vcf(layout, [site]).unwrap();
    assert!(!text.contains("ID=ADF"));
    assert!(!text.contains("ID=ADR"));
    assert!(!text.contains(":ADF"));
    assert!(!text.contains("ADF="));
}

#[test]
fn depth_without_dp_reaches_output_as_ad_sum() {
    let mut m = merger(
        vec![(
            "nodp",
            vec![variant(call(0, 42, "G", &["A"], &[0, 1], &[11, 4], &[60, 0, 90]))],
        )],
        &MergeConfig::default(),
    );
    let layout = layout_for(&m);
    let site = m.next_site().unwrap().unwrap();
    assert_eq!(site.format.dp(0), Value::Present(15));
    assert_eq!(site.format.dpf(0), Value::Missing);

    let text = render_vcf(layout, [site]).unwrap();
    let sample = text.lines().last().unwrap().split('\t').last().unwrap();
    assert_eq!(sample, "0/1:.:.:15:.:11,4:60,0,90");
}
