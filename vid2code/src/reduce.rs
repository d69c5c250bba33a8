use std::path::{Path, PathBuf};

use crate::classify::FrameFilter;
use crate::dedup::{self, features::FeatureEngine, DedupArgs};
use crate::frames::{FrameSequence, SequenceError};

#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error("no frames to reduce in {0}")]
    NoFrames(PathBuf),
}

/// Shrinks a directory of video frames down to the distinct code frames:
/// first drops adjacent near-duplicates, then runs the chosen code frame
/// filter over the survivors. The directory is mutated in place and is the
/// only state, so an interrupted run can simply be started again.
///
/// Only a missing or empty frame directory is fatal; everything that goes
/// wrong at single frames is logged and skipped.
pub fn reduce_frames(
    dir: &Path,
    engine: &FeatureEngine,
    dedup_args: &DedupArgs,
    filter: &dyn FrameFilter,
) -> Result<FrameSequence, ReduceError> {
    let mut seq = FrameSequence::from_dir(dir)?;
    if seq.is_empty() {
        return Err(ReduceError::NoFrames(dir.to_owned()));
    }

    log::info!("reducing {} frames in {}", seq.len(), dir.display());
    dedup::remove_duplicates(&mut seq, engine, dedup_args);
    let seq = filter.reduce(seq);
    log::info!("{} frames survived reduction", seq.len());

    Ok(seq)
}
