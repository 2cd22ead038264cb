use std::collections::HashMap;
use std::fs;

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::header::{parse_header_line, PartHeader};
use crate::search::BoundarySearcher;
use crate::sink::{FileSink, UploadedFile};
use crate::utils::{boundary_from_content_type, CRLF, DASHES};
use crate::{Error, Limits, Result};

/// Session states, in wire order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum UploadState {
    /// Expecting a `--boundary` divider line
    AwaitingBoundary,
    /// Expecting part-header lines, terminated by a blank line
    AwaitingPartHeader,
    /// Consuming part payload up to the next boundary
    ReceivingPartData,
    /// Saw the final `--boundary--` divider
    Finished,
}

/// The decoded result of one multipart body.
///
/// Returned to the request engine, which merges it into its own variable
/// namespace; the decoder never writes a shared store itself.
#[derive(Debug, Default)]
pub struct Upload {
    /// Form-field values by field name, last write wins
    pub fields: HashMap<String, String>,
    /// Completed file parts by field name
    pub files: HashMap<String, UploadedFile>,
}

impl Upload {
    /// Flattens the result into key/value bindings for the engine's
    /// variable store: each field as `name => value`, and four derived
    /// entries per file describing its client filename, declared content
    /// type, stored path and size.
    #[must_use]
    pub fn vars(&self) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        for (id, file) in &self.files {
            vars.push((
                format!("FILE_CLIENT_FILENAME_{id}"),
                file.client_filename.clone(),
            ));
            vars.push((
                format!("FILE_CONTENT_TYPE_{id}"),
                file.content_type
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            ));
            vars.push((
                format!("FILE_FILENAME_{id}"),
                file.stored_path.display().to_string(),
            ));
            vars.push((format!("FILE_SIZE_{id}"), file.size.to_string()));
        }

        vars
    }
}

/// Outcome of one data-chunk pass.
#[derive(Debug, PartialEq)]
pub(crate) enum DataProgress {
    /// A boundary terminated the part; the divider line is still buffered.
    Boundary,
    /// No boundary in the window yet, more input is needed.
    NeedMore,
}

/// Per-request multipart decoding state machine.
///
/// Driven one logical unit at a time by [`StreamDriver`](crate::StreamDriver):
/// a line in the boundary/header states, a data window otherwise.
pub struct UploadSession {
    state: UploadState,
    /// On-wire token, `--` prefix included; immutable for the session.
    boundary: Bytes,
    searcher: BoundarySearcher,
    field_id: Option<String>,
    client_filename: Option<String>,
    content_type: Option<mime::Mime>,
    sink: Option<FileSink>,
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
    limits: Limits,
}

impl UploadSession {
    /// Creates a session for a bare boundary token (no leading dashes).
    ///
    /// # Errors
    ///
    /// `BadBoundary` if the token is empty.
    pub fn new(boundary: &str, limits: Limits) -> Result<Self> {
        if boundary.is_empty() {
            return Err(Error::BadBoundary);
        }

        // `--boundary`
        let mut token = BytesMut::with_capacity(2 + boundary.len());
        token.extend_from_slice(&DASHES);
        token.extend_from_slice(boundary.as_bytes());
        let token = token.freeze();

        Ok(Self {
            state: UploadState::AwaitingBoundary,
            searcher: BoundarySearcher::new(&token),
            boundary: token,
            field_id: None,
            client_filename: None,
            content_type: None,
            sink: None,
            fields: HashMap::new(),
            files: HashMap::new(),
            limits,
        })
    }

    /// Creates a session from a request's `Content-Type` header value,
    /// extracting the `boundary=` parameter.
    ///
    /// # Errors
    ///
    /// `BadBoundary` if the value is not multipart or names no boundary.
    pub fn from_content_type(content_type: &str, limits: Limits) -> Result<Self> {
        let boundary = boundary_from_content_type(content_type)?;
        Self::new(&boundary, limits)
    }

    /// The on-wire boundary token, leading dashes included.
    #[must_use]
    pub fn boundary(&self) -> &[u8] {
        &self.boundary
    }

    pub(crate) fn state(&self) -> UploadState {
        self.state
    }

    /// Consumes one line in a line-oriented state.
    pub(crate) fn on_line(&mut self, line: &[u8]) -> Result<()> {
        match self.state {
            UploadState::AwaitingBoundary => self.on_boundary_line(line),
            UploadState::AwaitingPartHeader => self.on_header_line(line),
            // the driver never hands lines to the other states
            UploadState::ReceivingPartData | UploadState::Finished => Err(Error::TrailingData),
        }
    }

    /// Expects a divider line: the boundary token alone opens the next
    /// part, the token followed by `--` ends the body.
    fn on_boundary_line(&mut self, line: &[u8]) -> Result<()> {
        if line == &self.boundary[..] {
            trace!("part divider");
            self.reset_part();
            self.state = UploadState::AwaitingPartHeader;
            Ok(())
        } else if line.len() == self.boundary.len() + DASHES.len()
            && line[..self.boundary.len()] == self.boundary[..]
            && line[self.boundary.len()..] == DASHES
        {
            trace!("final divider");
            self.reset_part();
            self.state = UploadState::Finished;
            Ok(())
        } else {
            Err(Error::BadBoundary)
        }
    }

    /// Consumes one part-header line; a blank line ends the headers.
    fn on_header_line(&mut self, line: &[u8]) -> Result<()> {
        if line.is_empty() {
            self.state = UploadState::ReceivingPartData;
            return Ok(());
        }

        let text = std::str::from_utf8(line).map_err(|_| Error::InvalidHeader)?;
        trace!("header line: {}", text);

        match parse_header_line(text)? {
            PartHeader::Disposition { name, filename } => {
                // a repeated disposition restarts the part identity
                self.field_id = name;
                self.client_filename = None;
                self.content_type = None;
                self.sink = None;

                if let Some(filename) = filename {
                    self.client_filename = Some(filename);
                    self.sink = Some(FileSink::open(&self.limits)?);
                }
            }
            PartHeader::ContentType(ct) => {
                // only recorded for file parts, as declared metadata
                if self.client_filename.is_some() {
                    self.content_type = ct;
                }
            }
            PartHeader::Other => {}
        }

        Ok(())
    }

    /// One pass per buffer refill over the part payload window.
    ///
    /// Consumes the part's data bytes from `buf`; a terminating divider
    /// line is left in place for the boundary state to read.
    pub(crate) fn on_data(&mut self, buf: &mut BytesMut) -> Result<DataProgress> {
        if buf.len() < self.searcher.len() {
            // not even a full token could fit yet
            return Ok(DataProgress::NeedMore);
        }

        if let Some(k) = self.searcher.find(buf) {
            let mut data = buf.split_to(k);
            // the CRLF before the divider is wire framing, not payload
            if data.len() >= CRLF.len() && data[data.len() - CRLF.len()..] == CRLF {
                data.truncate(data.len() - CRLF.len());
            }
            self.finish_part(&data)?;
            self.state = UploadState::AwaitingBoundary;
            return Ok(DataProgress::Boundary);
        }

        if self.sink.is_some() {
            // Stream everything except a trailing reserve that might hold
            // a split divider (its framing CRLF included).
            let reserve = self.searcher.reserve();
            if buf.len() > reserve {
                let chunk = buf.split_to(buf.len() - reserve);
                if let Some(sink) = self.sink.as_mut() {
                    sink.write(&chunk)?;
                }
            }
        } else {
            // Form-field values are never delivered in pieces; the whole
            // value waits in the buffer, so the cap applies while it
            // accumulates. Bytes past the reserve are value bytes for sure.
            let buffered = buf.len().saturating_sub(self.searcher.reserve());
            if let Some(max) = self.limits.checked_field_size(buffered) {
                return Err(Error::FieldTooLarge(max));
            }
        }

        Ok(DataProgress::NeedMore)
    }

    /// Publishes the finished part: a file part closes its sink and lands
    /// in `files`, a form part decodes its value into `fields`.
    fn finish_part(&mut self, data: &[u8]) -> Result<()> {
        let id = self.field_id.take().unwrap_or_default();

        if let Some(mut sink) = self.sink.take() {
            sink.write(data)?;
            let file = sink.finish(
                self.client_filename.take().unwrap_or_default(),
                self.content_type.take(),
            )?;
            self.files.insert(id, file);
        } else {
            if let Some(max) = self.limits.checked_field_size(data.len()) {
                return Err(Error::FieldTooLarge(max));
            }
            let value = String::from_utf8_lossy(data).into_owned();
            debug!("form[{}] = {:?}", id, value);
            self.fields.insert(id, value);
        }

        self.reset_part();
        Ok(())
    }

    fn reset_part(&mut self) {
        self.field_id = None;
        self.client_filename = None;
        self.content_type = None;
    }

    /// Whether the session is terminal: the final divider was seen, or the
    /// session was aborted.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == UploadState::Finished
    }

    /// Discards the session's side effects: closes and deletes any open
    /// sink, and removes every file it already staged. Idempotent; the
    /// session is spent afterwards and rejects further input.
    pub fn abort(&mut self) {
        if self.sink.take().is_some() {
            debug!("aborting open upload sink");
        }
        for (id, file) in self.files.drain() {
            debug!(
                "removing staged upload {} for {:?}",
                file.stored_path.display(),
                id
            );
            let _ = fs::remove_file(&file.stored_path);
        }
        self.fields.clear();
        self.reset_part();
        self.state = UploadState::Finished;
    }

    /// Yields the decoded result.
    #[must_use]
    pub fn into_upload(self) -> Upload {
        Upload {
            fields: self.fields,
            files: self.files,
        }
    }
}
