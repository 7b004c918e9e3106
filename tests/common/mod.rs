#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use gvcf_merge::{
    CallPosition, CallRecord, DepthBlock, MemoryCursor, MergeConfig, SampleSchema, StreamEntry,
    StreamMerger,
};

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("GVCF_MERGE_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set GVCF_MERGE_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Diploid variant call with the FORMAT fields every test input carries.
pub fn call(
    contig: u32,
    pos: u32,
    reference: &str,
    alts: &[&str],
    gt: &[u32],
    ad: &[i32],
    pl: &[i32],
) -> CallRecord {
    CallRecord::new(
        CallPosition::new(contig, pos),
        reference,
        alts.iter().map(|a| a.to_string()).collect(),
    )
    .with_genotype(gt)
    .with_integers("AD", ad)
    .with_integers("PL", pl)
}

pub fn variant(record: CallRecord) -> StreamEntry {
    StreamEntry::Variant(record)
}

pub fn block(contig: u32, start: u32, end: u32, dp: i32, dpf: i32, gq: i32) -> StreamEntry {
    StreamEntry::Block(DepthBlock::new(contig, start, end, dp, dpf, gq, 2))
}

pub fn cursor(name: &str, entries: Vec<StreamEntry>) -> MemoryCursor {
    MemoryCursor::from_entries(SampleSchema::new(name, true, false), entries)
}

pub fn merger(
    inputs: Vec<(&str, Vec<StreamEntry>)>,
    config: &MergeConfig,
) -> StreamMerger<MemoryCursor> {
    let cursors = inputs
        .into_iter()
        .map(|(name, entries)| cursor(name, entries))
        .collect();
    StreamMerger::new(cursors, config).expect("merger initialises")
}

/// Two samples over two contigs: an SNV, a deletion and a hom-alt call,
/// each surrounded by reference blocks.
pub fn two_sample_fixture() -> Vec<(&'static str, Vec<StreamEntry>)> {
    let na1 = vec![
        block(0, 0, 98, 20, 1, 40),
        variant(
            call(0, 99, "A", &["G"], &[0, 1], &[10, 8], &[50, 0, 60])
                .with_integers("GQ", &[48])
                .with_integers("DP", &[18])
                .with_qual(35.5)
                .with_mapping_quality(60),
        ),
        block(0, 100, 499, 25, 0, 50),
        variant(
            call(1, 9, "C", &["T"], &[1, 1], &[0, 14], &[200, 30, 0])
                .with_integers("GQ", &[30])
                .with_integers("DP", &[14])
                .with_qual(80.0)
                .with_mapping_quality(50),
        ),
    ];
    let na2 = vec![
        block(0, 0, 149, 12, 0, 30),
        variant(
            call(0, 150, "ACT", &["A"], &[0, 1], &[7, 6], &[40, 0, 45])
                .with_integers("GQ", &[40])
                .with_qual(20.0)
                .with_mapping_quality(40),
        ),
        block(0, 153, 300, 15, 0, 45),
        block(1, 0, 99, 0, 0, 0),
    ];
    vec![("NA1", na1), ("NA2", na2)]
}
