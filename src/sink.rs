use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tracing::{debug, trace};

use crate::{Error, Limits, Result};

/// A completed file part.
///
/// `stored_path` is always generated locally under the configured upload
/// directory; the client-declared filename never influences it. `size` is
/// counted from bytes actually written, never taken from the wire.
#[derive(Debug)]
pub struct UploadedFile {
    /// Where the uploaded bytes were staged
    pub stored_path: PathBuf,
    /// The filename declared by the remote party, untrusted
    pub client_filename: String,
    /// The content type declared by the remote party, untrusted
    pub content_type: Option<mime::Mime>,
    /// Bytes written to `stored_path`
    pub size: u64,
}

/// Write target for one file part.
///
/// The backing file is delete-on-drop until [`finish`](FileSink::finish)
/// persists it, so dropping an unfinished sink is the abort path.
pub(crate) struct FileSink {
    file: NamedTempFile,
    written: u64,
    limits: Limits,
}

impl FileSink {
    /// Allocates a fresh, unpredictable temp file in the upload directory.
    pub(crate) fn open(limits: &Limits) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("upload")
            .tempfile_in(&limits.upload_dir)?;

        trace!("staging upload at {}", file.path().display());

        Ok(Self {
            file,
            written: 0,
            limits: limits.clone(),
        })
    }

    /// Appends a chunk, enforcing the size cap before touching the disk.
    pub(crate) fn write(&mut self, chunk: &[u8]) -> Result<()> {
        if let Some(max) = self
            .limits
            .checked_file_size(self.written + chunk.len() as u64)
        {
            return Err(Error::SizeExceeded(max));
        }
        if !chunk.is_empty() {
            self.file.write_all(chunk)?;
            self.written += chunk.len() as u64;
            trace!("wrote {} bytes, {} total", chunk.len(), self.written);
        }
        Ok(())
    }

    /// Closes the sink and persists the staged file.
    pub(crate) fn finish(
        mut self,
        client_filename: String,
        content_type: Option<mime::Mime>,
    ) -> Result<UploadedFile> {
        self.file.flush()?;
        let (_, stored_path) = self.file.keep().map_err(|e| Error::Storage(e.error))?;

        debug!(
            "upload of {:?} stored as {} ({} bytes)",
            client_filename,
            stored_path.display(),
            self.written
        );

        Ok(UploadedFile {
            stored_path,
            client_filename,
            content_type,
            size: self.written,
        })
    }
}

impl fmt::Debug for FileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSink")
            .field("path", &self.file.path())
            .field("written", &self.written)
            .field("max", &self.limits.file_size)
            .finish()
    }
}
