//! Error types for random string generation and upload ingestion

use std::path::PathBuf;
use thiserror::Error;

use crate::files::UploadedFile;

pub type Result<T> = std::result::Result<T, UploadError>;

pub type UploadResult = std::result::Result<Vec<UploadedFile>, UploadFailure>;

#[derive(Error, Debug)]
pub enum RandomError {
    #[error("secure random source unavailable: {0}")]
    SourceUnavailable(String),
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("upload directory {} does not exist", .path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("the uploaded file is too big")]
    UploadTooLarge { limit: u64 },

    #[error("malformed multipart form: {0}")]
    MalformedForm(String),

    #[error("the uploaded filetype is not permitted: {content_type}")]
    FiletypeNotPermitted { content_type: String },

    #[error("error buffering uploaded file: {0}")]
    Spool(#[source] std::io::Error),

    #[error("error opening uploaded file: {0}")]
    StreamOpen(#[source] std::io::Error),

    #[error("error reading file header: {0}")]
    StreamRead(#[source] std::io::Error),

    #[error("error resetting file pointer: {0}")]
    StreamSeek(#[source] std::io::Error),

    #[error("error creating destination file {}: {source}", .path.display())]
    DestinationCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error copying file contents: {0}")]
    Copy(#[source] std::io::Error),

    #[error("error generating file name: {0}")]
    RandomSource(#[from] RandomError),

    #[error("upload processing was interrupted: {0}")]
    Interrupted(String),
}

impl UploadError {
    /// True when the failure was caused by what the client sent rather than
    /// by the host environment.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            UploadError::UploadTooLarge { .. }
                | UploadError::MalformedForm(_)
                | UploadError::FiletypeNotPermitted { .. }
        )
    }
}

/// A failed upload call together with the files stored before the failure.
///
/// Uploads are not transactional: every entry in `stored` exists on disk.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct UploadFailure {
    #[source]
    error: UploadError,
    stored: Vec<UploadedFile>,
}

impl UploadFailure {
    pub fn new(error: UploadError, stored: Vec<UploadedFile>) -> Self {
        Self { error, stored }
    }

    pub fn error(&self) -> &UploadError {
        &self.error
    }

    pub fn stored(&self) -> &[UploadedFile] {
        &self.stored
    }

    pub fn into_parts(self) -> (UploadError, Vec<UploadedFile>) {
        (self.error, self.stored)
    }
}

impl From<UploadError> for UploadFailure {
    fn from(error: UploadError) -> Self {
        Self::new(error, Vec::new())
    }
}
