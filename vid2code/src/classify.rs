use crate::frames::FrameSequence;

pub mod config;
pub mod detectors;
pub mod model_based;
pub mod rule_based;

/// A strategy for throwing away frames that do not show code. Both
/// implementations delete the backing files of dropped frames and keep going
/// past single bad frames; which one runs is an explicit choice of the
/// caller, never guessed from the input.
pub trait FrameFilter {
    fn reduce(&self, seq: FrameSequence) -> FrameSequence;
}
