//! Scratch copy of an upload for the duration of one analysis.

use crate::upload::UploadFormat;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const SCRATCH_PREFIX: &str = "medical_image_";

/// A uniquely named temporary file holding the uploaded bytes.
///
/// The file is deleted when the value is dropped, whichever way the analysis
/// ends.
#[derive(Debug)]
pub struct ScratchImage {
    file: NamedTempFile,
}

impl ScratchImage {
    /// Writes `bytes` to a new file in the system temp directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write(bytes: &[u8], format: UploadFormat) -> io::Result<Self> {
        Self::write_in(&std::env::temp_dir(), bytes, format)
    }

    /// Writes `bytes` to a new file inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write_in(dir: &Path, bytes: &[u8], format: UploadFormat) -> io::Result<Self> {
        let suffix = format!(".{}", format.extension());
        let mut file = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(&suffix)
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        tracing::debug!("Staged {} bytes at {}", bytes.len(), file.path().display());
        Ok(Self { file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    #[must_use]
    pub fn path_buf(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    /// Deletes the file now and reports failures, instead of on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if the file could not be removed.
    pub fn close(self) -> io::Result<()> {
        let path = self.path_buf();
        self.file.close()?;
        tracing::debug!("Removed {}", path.display());
        Ok(())
    }
}
