use std::path::PathBuf;

use crate::frames::{FrameLoadError, FrameSequence};

pub mod features;

use features::{ratio_test_matches, FeatureEngine, MatchStats};

pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.8;

#[derive(Debug, thiserror::Error)]
#[error("no usable descriptors in frame {path}: {detail}")]
pub struct DescriptorError {
    pub path: PathBuf,
    pub detail: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum PairError {
    #[error(transparent)]
    Load(#[from] FrameLoadError),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

#[derive(clap::Args, Debug)]
pub struct DedupCli {
    /// A feature match only counts when the nearest descriptor is closer
    /// than this fraction of the second nearest
    #[arg(long, default_value_t = DEFAULT_DUPLICATE_THRESHOLD)]
    ratio_test_cutoff: f64,

    /// A frame is a duplicate when more than this fraction of its
    /// predecessor's features match it
    #[arg(long, default_value_t = DEFAULT_DUPLICATE_THRESHOLD)]
    duplicate_cutoff: f64,
}

impl DedupCli {
    pub fn to_args(&self) -> DedupArgs {
        DedupArgs::default()
            .ratio_test_cutoff(self.ratio_test_cutoff)
            .duplicate_cutoff(self.duplicate_cutoff)
    }
}

/// The two dedup cutoffs are conceptually different knobs, but the observed
/// system tuned them as one value, so they default to the same number. Use
/// [`DedupArgs::threshold`] to move both at once.
#[derive(Debug, Clone, Copy)]
pub struct DedupArgs {
    ratio_test_cutoff: f64,
    duplicate_cutoff: f64,
}

impl Default for DedupArgs {
    fn default() -> Self {
        Self {
            ratio_test_cutoff: DEFAULT_DUPLICATE_THRESHOLD,
            duplicate_cutoff: DEFAULT_DUPLICATE_THRESHOLD,
        }
    }
}

impl DedupArgs {
    pub fn ratio_test_cutoff(mut self, cutoff: f64) -> Self {
        self.ratio_test_cutoff = cutoff;
        self
    }

    pub fn duplicate_cutoff(mut self, cutoff: f64) -> Self {
        self.duplicate_cutoff = cutoff;
        self
    }

    /// Sets both cutoffs to the same value
    pub fn threshold(self, threshold: f64) -> Self {
        self.ratio_test_cutoff(threshold).duplicate_cutoff(threshold)
    }

    pub fn is_duplicate(&self, matches: MatchStats) -> bool {
        matches.good_fraction() > self.duplicate_cutoff
    }
}

/// Collapses runs of visually identical adjacent frames down to their first
/// frame, deleting the rest from disk.
///
/// The reference frame only advances when the next frame is kept, so one
/// reference absorbs an arbitrarily long run of near-duplicates. Because each
/// comparison is against the surviving reference, the result depends on the
/// sequence order; running the filter again on its own output removes
/// nothing further. Frames that cannot be loaded or that have no features
/// are skipped in their pair and processing continues.
pub fn remove_duplicates(seq: &mut FrameSequence, engine: &FeatureEngine, args: &DedupArgs) {
    let mut removed = 0usize;
    let mut reference = 0usize;

    while reference + 1 < seq.len() {
        match compare_pair(seq, reference, engine, args) {
            Ok(stats) if args.is_duplicate(stats) => {
                log::debug!(
                    "{} duplicates {} ({}/{} good matches)",
                    seq.name(reference + 1),
                    seq.name(reference),
                    stats.good,
                    stats.total,
                );
                match seq.remove(reference + 1) {
                    Ok(_) => removed += 1,
                    Err(e) => {
                        log::error!(
                            "could not delete duplicate frame {}: {e}",
                            seq.name(reference + 1)
                        );
                        reference += 1;
                    }
                }
            }
            Ok(_) => reference += 1,
            Err(e) => {
                log::warn!(
                    "skipping pair {} / {}: {e}",
                    seq.name(reference),
                    seq.name(reference + 1)
                );
                reference += 1;
            }
        }
    }

    log::info!(
        "removed {removed} duplicate frames, {} remain in {}",
        seq.len(),
        seq.dir().display()
    );
}

fn compare_pair(
    seq: &FrameSequence,
    reference: usize,
    engine: &FeatureEngine,
    args: &DedupArgs,
) -> Result<MatchStats, PairError> {
    let reference_img = seq.load_gray(reference)?;
    let candidate_img = seq.load_gray(reference + 1)?;

    let reference_descriptors = engine.descriptors(&reference_img);
    if reference_descriptors.is_empty() {
        return Err(DescriptorError {
            path: seq.path(reference),
            detail: "no keypoints found",
        }
        .into());
    }

    let candidate_descriptors = engine.descriptors(&candidate_img);
    if candidate_descriptors.len() < 2 {
        return Err(DescriptorError {
            path: seq.path(reference + 1),
            detail: "fewer than two keypoints, ratio test impossible",
        }
        .into());
    }

    Ok(ratio_test_matches(
        &reference_descriptors,
        &candidate_descriptors,
        args.ratio_test_cutoff,
    ))
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use super::features::noise_image;
    use super::*;

    fn write_frame(dir: &Path, name: &str, img: &image::GrayImage) {
        img.save(dir.join(name)).unwrap();
    }

    fn sequence(dir: &Path) -> FrameSequence {
        FrameSequence::from_dir(dir).unwrap()
    }

    #[test]
    fn equal_fraction_is_not_a_duplicate() {
        let args = DedupArgs::default().duplicate_cutoff(0.8);
        assert!(!args.is_duplicate(MatchStats { good: 4, total: 5 }));
        assert!(args.is_duplicate(MatchStats { good: 5, total: 5 }));

        let lower = DedupArgs::default().duplicate_cutoff(0.7999);
        assert!(lower.is_duplicate(MatchStats { good: 4, total: 5 }));
    }

    #[test]
    fn identical_run_collapses_to_first_frame() {
        let tmp = tempfile::tempdir().unwrap();
        let img = noise_image(200, 200, 7);
        for name in ["frame1.png", "frame2.png", "frame3.png"] {
            write_frame(tmp.path(), name, &img);
        }

        let mut seq = sequence(tmp.path());
        remove_duplicates(&mut seq, &FeatureEngine::new(), &DedupArgs::default());

        assert_eq!(vec!["frame1.png"], seq.names());
        assert!(tmp.path().join("frame1.png").exists());
        assert!(!tmp.path().join("frame2.png").exists());
        assert!(!tmp.path().join("frame3.png").exists());
    }

    #[test]
    fn different_frames_all_survive() {
        let tmp = tempfile::tempdir().unwrap();
        write_frame(tmp.path(), "frame1.png", &noise_image(200, 200, 7));
        write_frame(tmp.path(), "frame2.png", &noise_image(200, 200, 999));

        let mut seq = sequence(tmp.path());
        remove_duplicates(&mut seq, &FeatureEngine::new(), &DedupArgs::default());

        assert_eq!(vec!["frame1.png", "frame2.png"], seq.names());
    }

    #[test]
    fn featureless_frame_is_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let solid = image::GrayImage::from_pixel(200, 200, image::Luma([0]));
        write_frame(tmp.path(), "frame1.png", &solid);
        write_frame(tmp.path(), "frame2.png", &noise_image(200, 200, 7));

        let mut seq = sequence(tmp.path());
        remove_duplicates(&mut seq, &FeatureEngine::new(), &DedupArgs::default());

        // the pair cannot be compared, both frames stay
        assert_eq!(vec!["frame1.png", "frame2.png"], seq.names());
    }

    #[test]
    fn unreadable_frame_is_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let img = noise_image(200, 200, 7);
        write_frame(tmp.path(), "frame1.png", &img);
        std::fs::write(tmp.path().join("frame2.png"), b"not a png").unwrap();
        write_frame(tmp.path(), "frame3.png", &img);

        let mut seq = sequence(tmp.path());
        remove_duplicates(&mut seq, &FeatureEngine::new(), &DedupArgs::default());

        // pair (1,2) fails to load, pair (2,3) too; nothing is removed
        assert_eq!(3, seq.len());
    }
}
