use crate::frames::FrameSequence;

use super::config::DetectionConfig;
use super::detectors::classify_frame;
use super::FrameFilter;

/// Streams the heuristic classifier over the sequence, deleting every frame
/// that does not score as code, one frame at a time.
pub struct RuleBasedFilter {
    config: DetectionConfig,
}

impl RuleBasedFilter {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }
}

impl FrameFilter for RuleBasedFilter {
    fn reduce(&self, mut seq: FrameSequence) -> FrameSequence {
        let mut removed = 0usize;
        let mut index = 0usize;

        while index < seq.len() {
            if classify_frame(&seq.path(index), &self.config) {
                index += 1;
                continue;
            }

            match seq.remove(index) {
                Ok(name) => {
                    removed += 1;
                    log::debug!("removed non-code frame {name}");
                }
                Err(e) => {
                    log::error!(
                        "could not delete non-code frame {}: {e}",
                        seq.name(index)
                    );
                    index += 1;
                }
            }
        }

        log::info!(
            "rule based filter removed {removed} frames, {} remain",
            seq.len()
        );
        seq
    }
}
