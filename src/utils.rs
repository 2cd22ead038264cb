use crate::{Error, Result};

pub(crate) const DEFAULT_BUF_SIZE: usize = 8 * 1024;
pub(crate) const CRLF: [u8; 2] = [b'\r', b'\n']; // `\r\n`
pub(crate) const DASHES: [u8; 2] = [b'-', b'-']; // `--`

/// Extracts the `boundary=` parameter from a `Content-Type` header value.
///
/// The value must parse as a `multipart/*` mime type carrying a non-empty
/// boundary parameter, otherwise the request is rejected before any body
/// bytes are looked at.
pub(crate) fn boundary_from_content_type(content_type: &str) -> Result<String> {
    let m: mime::Mime = content_type.parse().map_err(|_| Error::BadBoundary)?;

    if m.type_() != mime::MULTIPART {
        return Err(Error::BadBoundary);
    }

    m.get_param(mime::BOUNDARY)
        .map(|b| b.as_str().to_owned())
        .filter(|b| !b.is_empty())
        .ok_or(Error::BadBoundary)
}

/// Trims one pair of surrounding double quotes, if present.
pub(crate) fn trim_quotes(value: &str) -> &str {
    let v = value.trim();
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        &v[1..v.len() - 1]
    } else {
        v
    }
}
