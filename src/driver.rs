use bytes::{Buf, BytesMut};
use memchr::memchr;
use tracing::trace;

use crate::session::{DataProgress, UploadState};
use crate::utils::{CRLF, DEFAULT_BUF_SIZE};
use crate::{Error, Result, Upload, UploadSession};

/// What a `feed` call accomplished.
#[derive(Debug, PartialEq)]
pub enum Progress {
    /// More body bytes are needed; not an error.
    Incomplete,
    /// The final boundary was consumed; the session is terminal.
    Finished,
}

/// Feeds connection-buffer fragments through an [`UploadSession`].
///
/// Owns the unconsumed tail of the body: fragments are appended to an
/// internal buffer and consumed one logical unit at a time — a line in the
/// boundary and header states, a payload window otherwise. The driver never
/// blocks waiting for input; when the buffer runs dry it returns
/// [`Progress::Incomplete`] so the engine can keep multiplexing.
pub struct StreamDriver {
    buffer: BytesMut,
    session: UploadSession,
}

impl StreamDriver {
    /// Wraps a session with an empty connection buffer.
    #[must_use]
    pub fn new(session: UploadSession) -> Self {
        Self {
            buffer: BytesMut::with_capacity(DEFAULT_BUF_SIZE),
            session,
        }
    }

    /// Appends one body fragment and decodes as far as it allows.
    ///
    /// Fragments may be arbitrarily small, down to a single byte; dividers
    /// split across fragments are handled by buffering.
    ///
    /// # Errors
    ///
    /// Any fatal decoding error; the session is aborted (open sink closed,
    /// staged files deleted) before the error is surfaced.
    pub fn feed(&mut self, fragment: &[u8]) -> Result<Progress> {
        self.buffer.extend_from_slice(fragment);
        self.drive().map_err(|e| self.fail(e))
    }

    fn drive(&mut self) -> Result<Progress> {
        loop {
            match self.session.state() {
                UploadState::AwaitingBoundary | UploadState::AwaitingPartHeader => {
                    let Some(line) = take_line(&mut self.buffer) else {
                        trace!("incomplete line, waiting for more body bytes");
                        return Ok(Progress::Incomplete);
                    };
                    self.session.on_line(&line)?;
                }
                UploadState::ReceivingPartData => {
                    match self.session.on_data(&mut self.buffer)? {
                        DataProgress::Boundary => {}
                        DataProgress::NeedMore => return Ok(Progress::Incomplete),
                    }
                }
                UploadState::Finished => {
                    // nothing but line framing may follow the final divider
                    if self.buffer.len() >= CRLF.len() && self.buffer[..CRLF.len()] == CRLF {
                        self.buffer.advance(CRLF.len());
                    }
                    if self.buffer.len() == 1 && self.buffer[0] == b'\r' {
                        // half of a trailing CRLF; the rest may still arrive
                        return Ok(Progress::Incomplete);
                    }
                    if !self.buffer.is_empty() {
                        return Err(Error::TrailingData);
                    }
                    return Ok(Progress::Finished);
                }
            }
        }
    }

    /// Whether the final divider has been consumed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.session.is_finished()
    }

    /// Declares end-of-body and yields the decoded result.
    ///
    /// A final divider that arrived without a trailing line terminator is
    /// consumed here.
    ///
    /// # Errors
    ///
    /// `BadBoundary` if the body ended mid-part; the session is aborted
    /// first, like any other fatal error.
    pub fn finish(mut self) -> Result<Upload> {
        // a body may end with `--boundary--` and no newline
        if self.session.state() == UploadState::AwaitingBoundary && !self.buffer.is_empty() {
            let mut line = self.buffer.split_to(self.buffer.len());
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            self.session.on_line(&line).map_err(|e| self.fail(e))?;
        }

        if !self.session.is_finished() || !self.buffer.is_empty() {
            return Err(self.fail(Error::BadBoundary));
        }

        Ok(self.session.into_upload())
    }

    /// Cancels the session, deleting everything it staged. Idempotent;
    /// invoked by the engine on disconnect or timeout.
    pub fn abort(&mut self) {
        self.session.abort();
        self.buffer.clear();
    }

    fn fail(&mut self, e: Error) -> Error {
        self.abort();
        e
    }
}

/// Extracts one LF-terminated line, CR and LF stripped.
fn take_line(buf: &mut BytesMut) -> Option<BytesMut> {
    let n = memchr(b'\n', buf)?;
    let mut line = buf.split_to(n + 1);
    line.truncate(n);
    if line.last() == Some(&b'\r') {
        line.truncate(n - 1);
    }
    Some(line)
}
