use std::io::{self, Read};
use std::path::Path;

use crate::config::UploadConfig;
use crate::error::UploadError;

use super::sniff::{detect_content_type, SNIFF_LEN};

#[derive(Debug, Clone)]
pub struct FileValidator {
    config: UploadConfig,
}

impl FileValidator {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn allow_all() -> Self {
        Self::new(&UploadConfig::default())
    }

    /// Sniffs the leading bytes of `reader` and checks the detected type
    /// against the allow list. Consumes at most [`SNIFF_LEN`] bytes. An empty
    /// stream has no header and fails with `UnexpectedEof`.
    pub fn validate_stream<R: Read>(&self, reader: &mut R) -> Result<&'static str, UploadError> {
        let mut header = Vec::with_capacity(SNIFF_LEN);
        reader
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut header)
            .map_err(UploadError::StreamRead)?;

        if header.is_empty() {
            return Err(UploadError::StreamRead(io::ErrorKind::UnexpectedEof.into()));
        }

        let content_type = detect_content_type(&header);
        self.validate_content_type(content_type)?;

        Ok(content_type)
    }

    pub fn validate_content_type(&self, content_type: &str) -> Result<(), UploadError> {
        if self.config.is_type_allowed(content_type) {
            return Ok(());
        }

        Err(UploadError::FiletypeNotPermitted {
            content_type: content_type.to_string(),
        })
    }
}

/// Final path component of a client-declared filename, split by the host's
/// path rules. A bare `.` or a name ending in `..` has no final component and
/// comes back empty.
pub fn base_file_name(declared: &str) -> &str {
    Path::new(declared)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("")
}

/// Extension including the leading dot, or an empty string.
pub fn file_extension(file_name: &str) -> &str {
    file_name.rfind('.').map_or("", |idx| &file_name[idx..])
}

/// Names that cannot address a regular file inside the upload directory.
pub fn is_unusable_file_name(file_name: &str) -> bool {
    matches!(file_name, "" | "." | "..")
}
