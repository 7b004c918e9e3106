#[path = "common/mod.rs"]
mod common;

use common::{call, cursor, variant};
use gvcf_merge::{MergeConfig, MergeError, StreamMerger};

fn duplicate_inputs() -> Vec<gvcf_merge::MemoryCursor> {
    let record = || variant(call(0, 5, "A", &["G"], &[0, 1], &[4, 4], &[30, 0, 30]));
    vec![
        cursor("NA12878", vec![record()]),
        cursor("NA12878", vec![record()]),
    ]
}

#[test]
fn duplicate_names_are_refused_by_default() {
    let err = StreamMerger::new(duplicate_inputs(), &MergeConfig::default()).unwrap_err();
    assert!(matches!(err, MergeError::DuplicateSample(name) if name == "NA12878"));
}

#[test]
fn duplicate_names_are_disambiguated_when_forced() {
    let config = MergeConfig::new().with_force_samples(true);
    let mut merger = StreamMerger::new(duplicate_inputs(), &config).expect("forced merge");

    let names = merger.sample_names();
    assert_eq!(names.len(), 2);
    assert_ne!(names[0], names[1]);
    assert_eq!(names[0], "NA12878");
    assert!(names[1].starts_with("NA12878"));
    assert_eq!(&names[1]["NA12878".len()..], ":R0");

    let site = merger.next_site().unwrap().expect("site");
    assert_eq!(site.info.an, 4);
}

#[test]
fn invalid_configuration_is_reported_before_merging() {
    let config = MergeConfig::new().with_buffer_size(0);
    let err = StreamMerger::new(duplicate_inputs(), &config).unwrap_err();
    assert!(matches!(err, MergeError::InvalidConfiguration(_)));
}
