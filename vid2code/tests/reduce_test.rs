mod common;

use common::{code_frame, dir_entries, noise_frame, title_card, write_gray, write_rgb};
use vid2code::{
    classify::{config::DetectionConfig, rule_based::RuleBasedFilter},
    dedup::{features::FeatureEngine, remove_duplicates, DedupArgs},
    frames::FrameSequence,
    reduce::reduce_frames,
};

#[test]
fn identical_copies_collapse_to_the_first_and_last_distinct_frames() {
    let tmp = tempfile::tempdir().unwrap();
    let first = noise_frame(200, 200, 7);
    let last = noise_frame(200, 200, 4242);

    // frames 2-4 are byte-identical copies of frame 1, frame 5 differs
    write_gray(tmp.path(), "frame1.png", &first);
    for name in ["frame2.png", "frame3.png", "frame4.png"] {
        std::fs::copy(tmp.path().join("frame1.png"), tmp.path().join(name)).unwrap();
    }
    write_gray(tmp.path(), "frame5.png", &last);

    let mut seq = FrameSequence::from_dir(tmp.path()).unwrap();
    remove_duplicates(
        &mut seq,
        &FeatureEngine::new(),
        &DedupArgs::default().threshold(0.8),
    );

    assert_eq!(vec!["frame1.png", "frame5.png"], seq.names());

    let mut on_disk = dir_entries(tmp.path());
    on_disk.sort();
    assert_eq!(vec!["frame1.png", "frame5.png"], on_disk);
}

#[test]
fn deduplication_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    write_gray(tmp.path(), "frame1.png", &noise_frame(200, 200, 7));
    for name in ["frame2.png", "frame3.png"] {
        std::fs::copy(tmp.path().join("frame1.png"), tmp.path().join(name)).unwrap();
    }
    write_gray(tmp.path(), "frame4.png", &noise_frame(200, 200, 77));

    let engine = FeatureEngine::new();
    let args = DedupArgs::default();

    let mut seq = FrameSequence::from_dir(tmp.path()).unwrap();
    remove_duplicates(&mut seq, &engine, &args);
    let first_pass = seq.names().to_vec();

    // a second pass over its own output removes nothing further
    let mut seq = FrameSequence::from_dir(tmp.path()).unwrap();
    remove_duplicates(&mut seq, &engine, &args);
    assert_eq!(first_pass, seq.names());
}

#[test]
fn the_reference_absorbs_a_run_then_advances() {
    let tmp = tempfile::tempdir().unwrap();
    let reference = noise_frame(200, 200, 1);
    let distinct = noise_frame(200, 200, 2);

    write_gray(tmp.path(), "frame1.png", &reference);
    write_gray(tmp.path(), "frame2.png", &reference);
    write_gray(tmp.path(), "frame3.png", &distinct);

    let mut seq = FrameSequence::from_dir(tmp.path()).unwrap();
    remove_duplicates(&mut seq, &FeatureEngine::new(), &DedupArgs::default());

    // frame2 folds into frame1, which is then compared against frame3
    assert_eq!(vec!["frame1.png", "frame3.png"], seq.names());
}

#[test]
fn a_featureless_frame_does_not_crash_the_filter() {
    let tmp = tempfile::tempdir().unwrap();
    let solid = image::GrayImage::from_pixel(200, 200, image::Luma([0]));
    write_gray(tmp.path(), "frame1.png", &solid);
    write_gray(tmp.path(), "frame2.png", &noise_frame(200, 200, 7));

    let mut seq = FrameSequence::from_dir(tmp.path()).unwrap();
    remove_duplicates(&mut seq, &FeatureEngine::new(), &DedupArgs::default());

    // the pair is skipped, both frames survive
    assert_eq!(vec!["frame1.png", "frame2.png"], seq.names());
}

#[test]
fn the_pipeline_dedups_then_classifies() {
    let tmp = tempfile::tempdir().unwrap();

    // three copies of a code frame, then a title card
    write_rgb(tmp.path(), "frame1.png", &code_frame());
    for name in ["frame2.png", "frame3.png"] {
        std::fs::copy(tmp.path().join("frame1.png"), tmp.path().join(name)).unwrap();
    }
    write_rgb(tmp.path(), "frame4.png", &title_card());

    let engine = FeatureEngine::new();
    let filter = RuleBasedFilter::new(DetectionConfig::default());
    let seq = reduce_frames(
        tmp.path(),
        &engine,
        &DedupArgs::default(),
        &filter,
    )
    .unwrap();

    // the duplicate copies fall to dedup, the title card to the classifier
    assert_eq!(vec!["frame1.png"], seq.names());
    assert_eq!(vec!["frame1.png"], dir_entries(tmp.path()));
}

#[test]
fn an_interrupted_run_restarts_from_the_directory_alone() {
    let tmp = tempfile::tempdir().unwrap();
    write_rgb(tmp.path(), "frame1.png", &code_frame());
    std::fs::copy(tmp.path().join("frame1.png"), tmp.path().join("frame2.png")).unwrap();
    write_rgb(tmp.path(), "frame3.png", &title_card());

    let engine = FeatureEngine::new();
    let args = DedupArgs::default();

    // first run gets as far as deduplication before "crashing"
    let mut seq = FrameSequence::from_dir(tmp.path()).unwrap();
    remove_duplicates(&mut seq, &engine, &args);
    drop(seq);

    // a fresh run re-derives its state from the directory and finishes
    let filter = RuleBasedFilter::new(DetectionConfig::default());
    let seq = reduce_frames(tmp.path(), &engine, &args, &filter).unwrap();

    assert_eq!(vec!["frame1.png"], seq.names());
}
