//! Helpers for HTTP handlers: secure random strings and multipart file uploads.
//!
//! ```no_run
//! use toolkit::{UploadConfig, UploadIngestor, DEFAULT_RENAME};
//!
//! async fn handle(request: axum::extract::Request) -> Result<(), toolkit::UploadFailure> {
//!     let ingestor = UploadIngestor::new(UploadConfig {
//!         max_file_size: 10 * 1024 * 1024,
//!         allowed_file_types: vec!["image/png".to_string(), "image/jpeg".to_string()],
//!         ..Default::default()
//!     });
//!
//!     let files = ingestor.upload_files(request, "./uploads", DEFAULT_RENAME).await?;
//!     for file in files {
//!         println!("{} -> {} ({} bytes)", file.original_file_name, file.new_file_name, file.file_size);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod files;
pub mod random;

pub use config::UploadConfig;
pub use error::{RandomError, Result, UploadError, UploadFailure, UploadResult};
pub use files::{
    detect_content_type, parse_form, FilePart, FileValidator, UploadIngestor, UploadedFile,
    DEFAULT_RENAME,
};
pub use random::{OsRandom, RandomStringGenerator, SecureRandom};
