//! Incremental `multipart/form-data` upload decoding.
//!
//! A request engine creates one [`UploadSession`] per multipart request and
//! drives it through a [`StreamDriver`], feeding raw body bytes exactly as
//! they arrive on the connection — in one piece or split into arbitrarily
//! small fragments, boundary tokens included. Form fields are decoded into
//! string values; file parts stream to unpredictable temp paths under a
//! configured directory, capped by [`Limits`]. The decoded [`Upload`] is
//! handed back to the engine, which merges it into its own variable space.
//!
//! On any fatal error (bad boundary, malformed header, storage failure,
//! oversized upload) the session aborts: the open sink is closed and every
//! file staged during the session is deleted before the error surfaces.
//!
//! # Example
//!
//! ```rust
//! use form_upload::{Limits, StreamDriver, UploadSession};
//!
//! fn main() -> anyhow::Result<()> {
//!     let dir = tempfile::tempdir()?;
//!
//!     let body: &[u8] = b"--XYZ\r\n\
//!         Content-Disposition: form-data; name=\"greeting\"\r\n\
//!         \r\n\
//!         hello\r\n\
//!         --XYZ\r\n\
//!         Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\
//!         Content-Type: text/plain\r\n\
//!         \r\n\
//!         abc\r\n\
//!         --XYZ--\r\n";
//!
//!     let limits = Limits::default().upload_dir(dir.path());
//!     let session = UploadSession::from_content_type(
//!         "multipart/form-data; boundary=XYZ",
//!         limits,
//!     )?;
//!
//!     let mut driver = StreamDriver::new(session);
//!     // the engine may call `feed` once per network fragment
//!     for chunk in body.chunks(7) {
//!         driver.feed(chunk)?;
//!     }
//!     assert!(driver.is_finished());
//!
//!     let upload = driver.finish()?;
//!     assert_eq!(upload.fields["greeting"], "hello");
//!     assert_eq!(upload.files["doc"].size, 3);
//!     assert_eq!(upload.files["doc"].client_filename, "a.txt");
//!
//!     // stored files now belong to the caller
//!     for file in upload.files.values() {
//!         std::fs::remove_file(&file.stored_path)?;
//!     }
//!     dir.close()?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]

mod driver;
mod error;
mod header;
mod limits;
mod search;
mod session;
mod sink;
mod utils;

pub use driver::{Progress, StreamDriver};

pub use session::{Upload, UploadSession};

pub use sink::UploadedFile;

pub use limits::Limits;

pub use error::Error;

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
