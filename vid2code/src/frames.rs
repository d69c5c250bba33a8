use std::{
    fs, io,
    path::{Path, PathBuf},
};

use image::{GrayImage, RgbImage};
use vid2code_common::utils::fsutils::natural_cmp;

#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("frame directory does not exist: {0}")]
    Missing(PathBuf),
    #[error("frame path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("failed to list frame directory {dir}: {source}")]
    List { dir: PathBuf, source: io::Error },
}

#[derive(Debug, thiserror::Error)]
#[error("cannot load frame {path}: {source}")]
pub struct FrameLoadError {
    pub path: PathBuf,
    #[source]
    pub source: image::ImageError,
}

pub fn load_gray(path: &Path) -> Result<GrayImage, FrameLoadError> {
    image::open(path)
        .map(|img| img.to_luma8())
        .map_err(|source| FrameLoadError {
            path: path.to_owned(),
            source,
        })
}

pub fn load_rgb(path: &Path) -> Result<RgbImage, FrameLoadError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| FrameLoadError {
            path: path.to_owned(),
            source,
        })
}

/// The frames of one video, in capture order.
///
/// The sequence mirrors a directory of frame files whose names natural-sort
/// into capture order. Removing a frame also deletes its backing file, so the
/// directory can always be re-read into an equal sequence.
#[derive(Debug)]
pub struct FrameSequence {
    dir: PathBuf,
    names: Vec<String>,
}

impl FrameSequence {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Result<Self, SequenceError> {
        let dir = dir.into();
        match fs::metadata(&dir) {
            Ok(meta) if !meta.is_dir() => return Err(SequenceError::NotADirectory(dir)),
            Ok(_) => (),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SequenceError::Missing(dir))
            }
            Err(source) => return Err(SequenceError::List { dir, source }),
        }

        let entries = fs::read_dir(&dir).map_err(|source| SequenceError::List {
            dir: dir.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SequenceError::List {
                dir: dir.clone(),
                source,
            })?;
            match entry.file_type() {
                Ok(ft) if ft.is_file() => {
                    names.push(entry.file_name().to_string_lossy().into_owned())
                }
                _ => (),
            }
        }
        names.sort_by(|a, b| natural_cmp(a, b));

        Ok(Self { dir, names })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub fn path(&self, index: usize) -> PathBuf {
        self.dir.join(&self.names[index])
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }

    pub fn load_gray(&self, index: usize) -> Result<GrayImage, FrameLoadError> {
        load_gray(&self.path(index))
    }

    pub fn load_rgb(&self, index: usize) -> Result<RgbImage, FrameLoadError> {
        load_rgb(&self.path(index))
    }

    /// Removes the frame at `index` and deletes its backing file. If the file
    /// cannot be deleted the frame stays in the sequence and the error is
    /// returned, so sequence and directory never disagree. A file that is
    /// already gone from disk counts as deleted.
    pub fn remove(&mut self, index: usize) -> io::Result<String> {
        match fs::remove_file(self.path(index)) {
            Ok(()) => (),
            Err(e) if e.kind() == io::ErrorKind::NotFound => (),
            Err(e) => return Err(e),
        }
        Ok(self.names.remove(index))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"data").unwrap();
    }

    #[test]
    fn frames_come_back_in_capture_order() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["frame10.png", "frame2.png", "frame1.png", "frame21.png"] {
            touch(tmp.path(), name);
        }

        let seq = FrameSequence::from_dir(tmp.path()).unwrap();
        assert_eq!(
            vec!["frame1.png", "frame2.png", "frame10.png", "frame21.png"],
            seq.names()
        );
    }

    #[test]
    fn subdirectories_are_not_frames() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "frame1.png");
        fs::create_dir(tmp.path().join("nested")).unwrap();

        let seq = FrameSequence::from_dir(tmp.path()).unwrap();
        assert_eq!(vec!["frame1.png"], seq.names());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        assert!(matches!(
            FrameSequence::from_dir(&missing),
            Err(SequenceError::Missing(_))
        ));
    }

    #[test]
    fn remove_deletes_the_backing_file() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "frame1.png");
        touch(tmp.path(), "frame2.png");

        let mut seq = FrameSequence::from_dir(tmp.path()).unwrap();
        let removed = seq.remove(0).unwrap();

        assert_eq!("frame1.png", removed);
        assert_eq!(vec!["frame2.png"], seq.names());
        assert!(!tmp.path().join("frame1.png").exists());
        assert!(tmp.path().join("frame2.png").exists());
    }

    #[test]
    fn remove_tolerates_an_already_deleted_file() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "frame1.png");

        let mut seq = FrameSequence::from_dir(tmp.path()).unwrap();
        fs::remove_file(tmp.path().join("frame1.png")).unwrap();

        assert!(seq.remove(0).is_ok());
        assert!(seq.is_empty());
    }
}
