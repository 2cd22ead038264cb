use crate::utils::trim_quotes;
use crate::{Error, Result};

/// One parsed part-header line.
#[derive(Debug, PartialEq)]
pub(crate) enum PartHeader {
    /// `Content-Disposition: form-data; name="..."[; filename="..."]`
    Disposition {
        name: Option<String>,
        filename: Option<String>,
    },
    /// `Content-Type: <mime>`; an unparseable value yields `None` and is
    /// ignored, the declared type is untrusted metadata anyway.
    ContentType(Option<mime::Mime>),
    /// Any other header, accepted and skipped.
    Other,
}

/// Parses a single part-header line, already stripped of its terminator.
///
/// Header names are matched case-insensitively. Unknown headers are not an
/// error. A line without a `:` separator is malformed.
pub(crate) fn parse_header_line(line: &str) -> Result<PartHeader> {
    let (name, value) = line.split_once(':').ok_or(Error::InvalidHeader)?;
    let name = name.trim();
    let value = value.trim();

    if name.eq_ignore_ascii_case("content-disposition") {
        parse_disposition(value)
    } else if name.eq_ignore_ascii_case("content-type") {
        Ok(PartHeader::ContentType(value.parse().ok()))
    } else {
        Ok(PartHeader::Other)
    }
}

/// Decomposes a `Content-Disposition` value into its attributes.
///
/// Attributes are `;`-separated `key=value` pairs; values may be quoted.
/// `form-data` carries no value and is skipped. A `filename` attribute is
/// only meaningful after a `name` attribute in the same header.
fn parse_disposition(value: &str) -> Result<PartHeader> {
    let mut name = None;
    let mut filename = None;

    for attr in value.split(';') {
        let attr = attr.trim();
        if attr.is_empty() {
            continue;
        }

        let (key, val) = match attr.split_once('=') {
            Some((k, v)) => (k.trim(), trim_quotes(v)),
            None => (attr, ""),
        };

        if key.eq_ignore_ascii_case("form-data") {
            // marker attribute, nothing to do
        } else if key.eq_ignore_ascii_case("name") {
            name = Some(val.to_owned());
        } else if key.eq_ignore_ascii_case("filename") {
            if name.is_none() {
                return Err(Error::MissingName);
            }
            filename = Some(val.to_owned());
        }
    }

    Ok(PartHeader::Disposition { name, filename })
}
