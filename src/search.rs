use memchr::memmem;

use crate::utils::CRLF;

/// Locates boundary tokens inside a byte window.
///
/// The needle is the full on-wire token including the leading dashes
/// (`--boundary`). The finder is built once per session.
pub(crate) struct BoundarySearcher {
    finder: memmem::Finder<'static>,
    len: usize,
}

impl BoundarySearcher {
    pub(crate) fn new(boundary: &[u8]) -> Self {
        Self {
            finder: memmem::Finder::new(boundary).into_owned(),
            len: boundary.len(),
        }
    }

    /// Offset of the first byte-exact occurrence of the boundary, if any.
    pub(crate) fn find(&self, window: &[u8]) -> Option<usize> {
        self.finder.find(window)
    }

    /// Bytes that must stay buffered while streaming a file part: a future
    /// fragment may complete a boundary straddling the window edge, and the
    /// CRLF immediately before it belongs to the wire framing, not the file.
    pub(crate) fn reserve(&self) -> usize {
        CRLF.len() + self.len - 1
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}
