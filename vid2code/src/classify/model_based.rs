use std::collections::HashSet;

use image::{imageops, RgbImage};

use crate::frames::FrameSequence;

use super::FrameFilter;

pub const MODEL_IMAGE_TARGET_SIZE: (u32, u32) = (300, 300);
pub const DEFAULT_MODEL_CUTOFF: f32 = 0.5;

#[derive(Debug, thiserror::Error)]
#[error("model inference failed: {0}")]
pub struct ModelError(pub String);

/// An externally trained image classifier. The crate ships no inference
/// runtime; whoever owns the trained model implements this and hands it to
/// [`ModelBasedFilter`]. Scores are per input image, higher meaning more
/// code-like.
pub trait CodeModel {
    fn predict(&self, batch: &[RgbImage]) -> Result<Vec<f32>, ModelError>;
}

/// Classifies all frames in one batch inference pass and keeps frames
/// scoring above the cutoff. Known to be the weaker strategy compared to the
/// rule based filter; it exists as an alternative, not the default.
pub struct ModelBasedFilter<M> {
    model: M,
    target_size: (u32, u32),
    cutoff: f32,
}

impl<M: CodeModel> ModelBasedFilter<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            target_size: MODEL_IMAGE_TARGET_SIZE,
            cutoff: DEFAULT_MODEL_CUTOFF,
        }
    }

    pub fn target_size(mut self, size: (u32, u32)) -> Self {
        self.target_size = size;
        self
    }

    pub fn cutoff(mut self, cutoff: f32) -> Self {
        self.cutoff = cutoff;
        self
    }
}

impl<M: CodeModel> FrameFilter for ModelBasedFilter<M> {
    fn reduce(&self, mut seq: FrameSequence) -> FrameSequence {
        let (width, height) = self.target_size;
        let mut batch = Vec::with_capacity(seq.len());
        let mut batched_indices = Vec::with_capacity(seq.len());

        for index in 0..seq.len() {
            match seq.load_rgb(index) {
                Ok(img) => {
                    batch.push(imageops::resize(
                        &img,
                        width,
                        height,
                        imageops::FilterType::Triangle,
                    ));
                    batched_indices.push(index);
                }
                // stays out of the batch and scores as not code below
                Err(e) => log::warn!("cannot batch frame: {e}"),
            }
        }

        let scores = match self.model.predict(&batch) {
            Ok(scores) if scores.len() == batch.len() => scores,
            Ok(scores) => {
                log::error!(
                    "model returned {} scores for {} frames, keeping the sequence as is",
                    scores.len(),
                    batch.len()
                );
                return seq;
            }
            Err(e) => {
                log::error!("{e}, keeping the sequence as is");
                return seq;
            }
        };

        let keep: HashSet<usize> = batched_indices
            .into_iter()
            .zip(&scores)
            .filter(|&(_, &score)| score > self.cutoff)
            .map(|(index, _)| index)
            .collect();

        // walk backwards so pending indices stay valid while removing
        let mut removed = 0usize;
        for index in (0..seq.len()).rev() {
            if keep.contains(&index) {
                continue;
            }
            match seq.remove(index) {
                Ok(name) => {
                    removed += 1;
                    log::debug!("model rejected frame {name}");
                }
                Err(e) => {
                    log::error!("could not delete rejected frame {}: {e}", seq.name(index))
                }
            }
        }

        log::info!(
            "model filter removed {removed} frames, {} remain",
            seq.len()
        );
        seq
    }
}
