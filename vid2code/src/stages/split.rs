use std::{
    io,
    path::{Path, PathBuf},
    process::Command,
};

use vid2code_common::utils::fsutils::clear_dir;

pub const DEFAULT_FFMPEG_BIN: &str = "ffmpeg";

/// Frames are numbered from one so that natural sort equals capture order.
pub const FRAME_FILE_PATTERN: &str = "frame%d.png";

#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("cannot prepare frame directory {dir}: {source}")]
    PrepareDir { dir: PathBuf, source: io::Error },
    #[error("failed to run {bin}: {source}")]
    Spawn { bin: String, source: io::Error },
    #[error("{bin} failed on {video}: {stderr}")]
    Failed {
        bin: String,
        video: PathBuf,
        stderr: String,
    },
}

/// Splits a video into numbered frame images at a fixed sampling rate by
/// invoking the ffmpeg executable.
pub struct FrameSplitter {
    bin: String,
    fps: u32,
}

impl FrameSplitter {
    pub fn new(fps: u32) -> Self {
        Self {
            bin: DEFAULT_FFMPEG_BIN.to_string(),
            fps: fps.max(1),
        }
    }

    pub fn bin(mut self, bin: impl Into<String>) -> Self {
        self.bin = bin.into();
        self
    }

    /// Fills `frames_dir` with `frame1.png`, `frame2.png`, ... sampled at
    /// the configured rate. The directory is created, or emptied if it
    /// already exists from an earlier aborted run.
    pub fn split(&self, video: &Path, frames_dir: &Path) -> Result<(), SplitError> {
        clear_dir(frames_dir).map_err(|source| SplitError::PrepareDir {
            dir: frames_dir.to_owned(),
            source,
        })?;

        log::info!(
            "splitting {} at {} fps into {}",
            video.display(),
            self.fps,
            frames_dir.display()
        );
        let output = Command::new(&self.bin)
            .arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-vf")
            .arg(format!("fps={}", self.fps))
            .arg("-start_number")
            .arg("1")
            .arg(frames_dir.join(FRAME_FILE_PATTERN))
            .output()
            .map_err(|source| SplitError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SplitError::Failed {
                bin: self.bin.clone(),
                video: video.to_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        log::info!("split {} into frames", video.display());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_tool_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let splitter = FrameSplitter::new(1).bin("definitely-not-a-real-binary");
        let result = splitter.split(Path::new("video.mp4"), &tmp.path().join("frames"));
        assert!(matches!(result, Err(SplitError::Spawn { .. })));
    }

    #[test]
    fn frame_directory_is_emptied_first() {
        let tmp = tempfile::tempdir().unwrap();
        let frames_dir = tmp.path().join("frames");
        std::fs::create_dir(&frames_dir).unwrap();
        std::fs::write(frames_dir.join("frame1.png"), b"stale").unwrap();

        let splitter = FrameSplitter::new(1).bin("definitely-not-a-real-binary");
        let _ = splitter.split(Path::new("video.mp4"), &frames_dir);

        // the stale frame is gone even though ffmpeg itself never ran
        assert!(!frames_dir.join("frame1.png").exists());
    }
}
