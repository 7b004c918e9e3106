#[path = "common/mod.rs"]
mod common;
use common::{assert_snapshot, merger, two_sample_fixture};
use gvcf_merge::io::{ContigDictionary, OutputLayout, VcfWriter};
use gvcf_merge::MergeConfig;

#[test]
fn merged_vcf_matches_golden() {
    let mut m = merger(two_sample_fixture(), &MergeConfig::default());
    let layout = OutputLayout {
        contigs: ContigDictionary::new(["chr1", "chr2"]),
        samples: m.sample_names().to_vec(),
        has_pl: m.has_pl(),
        has_strand_depth: m.has_strand_depth(),
    };

    let mut writer = VcfWriter::new(Vec::new(), layout);
    writer.write_header().expect("header renders");
    while let Some(site) = m.next_site().expect("merge succeeds") {
        writer.write_site(site).expect("site renders");
    }
    let bytes = writer.finish().expect("flush succeeds");
    let actual = String::from_utf8(bytes).expect("VCF is UTF-8");
    assert_snapshot("merged/two_samples.vcf", &actual);
}
