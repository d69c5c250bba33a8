use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};

pub const DEFAULT_YTDLP_BIN: &str = "yt-dlp";

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("cannot create download directory {dir}: {source}")]
    CreateDir { dir: PathBuf, source: io::Error },
    #[error("failed to run {bin}: {source}")]
    Spawn { bin: String, source: io::Error },
    #[error("{bin} failed for {url}: {stderr}")]
    Failed {
        bin: String,
        url: String,
        stderr: String,
    },
    #[error("{bin} did not report a downloaded file for {url}")]
    NoOutput { bin: String, url: String },
}

/// Fetches videos with the yt-dlp executable into one directory.
pub struct Downloader {
    bin: String,
    dest_dir: PathBuf,
}

impl Downloader {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin: DEFAULT_YTDLP_BIN.to_string(),
            dest_dir: dest_dir.into(),
        }
    }

    pub fn bin(mut self, bin: impl Into<String>) -> Self {
        self.bin = bin.into();
        self
    }

    /// Downloads one video and returns the path of the resulting file, as
    /// reported by the tool itself.
    pub fn download(&self, url: &str) -> Result<PathBuf, DownloadError> {
        fs::create_dir_all(&self.dest_dir).map_err(|source| DownloadError::CreateDir {
            dir: self.dest_dir.clone(),
            source,
        })?;

        log::info!("downloading {url}");
        let output = Command::new(&self.bin)
            .arg("--no-playlist")
            .arg("--no-simulate")
            .arg("--print")
            .arg("after_move:filepath")
            .arg("-o")
            .arg(self.dest_dir.join("%(title)s.%(ext)s"))
            .arg(url)
            .output()
            .map_err(|source| DownloadError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DownloadError::Failed {
                bin: self.bin.clone(),
                url: url.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| DownloadError::NoOutput {
                bin: self.bin.clone(),
                url: url.to_string(),
            })?;

        log::info!("downloaded {url} to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_tool_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(tmp.path()).bin("definitely-not-a-real-binary");
        assert!(matches!(
            downloader.download("https://example.com/v"),
            Err(DownloadError::Spawn { .. })
        ));
    }
}
