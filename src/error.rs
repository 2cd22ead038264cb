use http::StatusCode;
use thiserror::Error;

/// Upload decoding error
#[derive(Debug, Error)]
pub enum Error {
    /// The request declared no usable boundary, or a boundary divider line
    /// did not match the expected token.
    #[error("bad boundary")]
    BadBoundary,

    /// Invalid part header line
    #[error("invalid part header")]
    InvalidHeader,

    /// A `filename` attribute appeared before any `name` attribute.
    #[error("missing name attribute before filename")]
    MissingName,

    /// Field value is too large
    #[error("field is too large, limit to `{0}`")]
    FieldTooLarge(usize),

    /// Uploaded file is too large
    #[error("uploaded file is too large, limit to `{0}`")]
    SizeExceeded(u64),

    /// Temporary storage failure
    #[error("upload storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Data arrived after the final boundary.
    #[error("unexpected data after final boundary")]
    TrailingData,
}

impl Error {
    /// The response status the surrounding engine should answer with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadBoundary | Error::InvalidHeader | Error::MissingName | Error::TrailingData => {
                StatusCode::BAD_REQUEST
            }
            Error::FieldTooLarge(_) | Error::SizeExceeded(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
