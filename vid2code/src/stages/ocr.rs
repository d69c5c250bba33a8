use std::{collections::BTreeMap, io, process::Command};

use crate::frames::FrameSequence;

pub const DEFAULT_TESSERACT_BIN: &str = "tesseract";

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("failed to run {bin}: {source}")]
    Spawn { bin: String, source: io::Error },
}

/// Reads text off frames with the tesseract executable, one invocation per
/// frame.
pub struct Ocr {
    bin: String,
}

impl Default for Ocr {
    fn default() -> Self {
        Self::new()
    }
}

impl Ocr {
    pub fn new() -> Self {
        Self {
            bin: DEFAULT_TESSERACT_BIN.to_string(),
        }
    }

    pub fn bin(mut self, bin: impl Into<String>) -> Self {
        self.bin = bin.into();
        self
    }

    /// Extracted text per frame number, in frame order. A frame that cannot
    /// be OCRed or whose name carries no number is logged and yields nothing;
    /// only a tool that cannot be started at all fails the stage.
    pub fn extract(&self, seq: &FrameSequence) -> Result<BTreeMap<u32, String>, OcrError> {
        let mut texts = BTreeMap::new();

        for index in 0..seq.len() {
            let name = seq.name(index);
            let Some(number) = frame_number(name) else {
                log::warn!("frame {name} has no frame number, skipping OCR");
                continue;
            };

            let output = Command::new(&self.bin)
                .arg(seq.path(index))
                .arg("stdout")
                .output()
                .map_err(|source| OcrError::Spawn {
                    bin: self.bin.clone(),
                    source,
                })?;

            if output.status.success() {
                texts.insert(
                    number,
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                );
            } else {
                log::warn!(
                    "OCR failed on {name}: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                texts.insert(number, String::new());
            }
        }

        log::info!("extracted text from {} frames", texts.len());
        Ok(texts)
    }
}

/// The number embedded in a frame file name, "frame12.png" giving 12.
fn frame_number(name: &str) -> Option<u32> {
    let stem = name.split('.').next().unwrap_or(name);
    stem.strip_prefix("frame")?.parse().ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn frame_numbers_parse_from_names() {
        assert_eq!(Some(12), frame_number("frame12.png"));
        assert_eq!(Some(1), frame_number("frame1.jpg"));
        assert_eq!(None, frame_number("cover.png"));
        assert_eq!(None, frame_number("frame.png"));
        assert_eq!(None, frame_number("framex1.png"));
    }

    #[test]
    fn missing_tool_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("frame1.png"), b"img").unwrap();
        let seq = FrameSequence::from_dir(tmp.path()).unwrap();

        let ocr = Ocr::new().bin("definitely-not-a-real-binary");
        assert!(matches!(ocr.extract(&seq), Err(OcrError::Spawn { .. })));
    }
}
