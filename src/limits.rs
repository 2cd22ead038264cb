use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Limits and storage configuration for incoming uploads.
///
/// Read-only once a session is constructed; one `Limits` value is typically
/// shared by every session the engine creates.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Limits {
    /// Directory where uploaded files are staged
    pub upload_dir: PathBuf,
    /// Max size of a single uploaded file, in bytes
    pub file_size: u64,
    /// Max size of a single form-field value
    pub field_size: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            upload_dir: env::temp_dir(),
            file_size: Self::DEFAULT_FILE_SIZE,
            field_size: Some(Self::DEFAULT_FIELD_SIZE),
        }
    }
}

impl Limits {
    /// Max file size, defaults to 10MB.
    pub const DEFAULT_FILE_SIZE: u64 = 10 * 1024 * 1024;

    /// Max field value size, defaults to 100KB.
    pub const DEFAULT_FIELD_SIZE: usize = 100 * 1024;

    /// Sets the upload staging directory.
    #[must_use]
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    /// Max file size
    #[must_use]
    pub fn file_size(mut self, max: u64) -> Self {
        self.file_size = max;
        self
    }

    /// Max field value size
    #[must_use]
    pub fn field_size(mut self, max: usize) -> Self {
        self.field_size.replace(max);
        self
    }

    /// Check file size
    #[must_use]
    pub fn checked_file_size(&self, rhs: u64) -> Option<u64> {
        (rhs > self.file_size).then_some(self.file_size)
    }

    /// Check field value size
    #[must_use]
    pub fn checked_field_size(&self, rhs: usize) -> Option<usize> {
        self.field_size.filter(|max| rhs > *max)
    }
}
