use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

/// Which direction of a session a capture file records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    /// Microphone audio sent by the client
    Original,
    /// Synthesized audio returned by the engine
    Translated,
}

impl CaptureKind {
    /// Raw capture file name for a section
    pub fn file_name(&self, section_id: &str) -> String {
        match self {
            CaptureKind::Original => format!("{}.raw", section_id),
            CaptureKind::Translated => format!("{}_translated.raw", section_id),
        }
    }
}

/// Summary of a closed capture
#[derive(Debug, Clone)]
pub struct CaptureSummary {
    pub kind: CaptureKind,
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Append-only writer for one raw PCM capture
///
/// The owning session is the only writer of `path` until `finish` is called.
pub struct CaptureFile {
    writer: Option<BufWriter<File>>,
    kind: CaptureKind,
    path: PathBuf,
    bytes_written: u64,
}

impl CaptureFile {
    /// Create (truncating) the capture for `section_id` inside `dir`
    pub fn create(dir: &Path, section_id: &str, kind: CaptureKind) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(kind.file_name(section_id));
        let file = File::create(&path)?;

        info!("Opened {:?} capture: {}", kind, path.display());

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            kind,
            path,
            bytes_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> CaptureKind {
        self.kind
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Append one chunk
    pub fn write(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        match &mut self.writer {
            Some(writer) => {
                writer.write_all(chunk)?;
                self.bytes_written += chunk.len() as u64;
                Ok(())
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "capture already finished",
            )),
        }
    }

    /// Flush, sync and close the file
    pub fn finish(mut self) -> std::io::Result<CaptureSummary> {
        if let Some(writer) = self.writer.take() {
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }

        info!(
            "Closed {:?} capture: {} ({} bytes)",
            self.kind,
            self.path.display(),
            self.bytes_written
        );

        Ok(CaptureSummary {
            kind: self.kind,
            path: self.path.clone(),
            bytes_written: self.bytes_written,
        })
    }
}

impl Drop for CaptureFile {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                warn!("Failed to flush capture {} on drop: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_capture_file_names() {
        assert_eq!(CaptureKind::Original.file_name("abc"), "abc.raw");
        assert_eq!(CaptureKind::Translated.file_name("abc"), "abc_translated.raw");
    }

    #[test]
    fn test_capture_counts_bytes() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let mut capture = CaptureFile::create(dir.path(), "s1", CaptureKind::Original)?;

        capture.write(&[1, 2, 3, 4])?;
        capture.write(&[5, 6])?;
        let summary = capture.finish()?;

        assert_eq!(summary.bytes_written, 6);
        assert_eq!(fs::read(&summary.path)?, vec![1, 2, 3, 4, 5, 6]);
        Ok(())
    }

    #[test]
    fn test_capture_creates_missing_directory() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let nested = dir.path().join("recordings").join("nested");
        let capture = CaptureFile::create(&nested, "s2", CaptureKind::Translated)?;

        assert!(capture.path().exists());
        assert_eq!(capture.kind(), CaptureKind::Translated);
        Ok(())
    }
}
