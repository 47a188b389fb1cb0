pub mod form;
pub mod ingestor;
pub mod models;
pub mod sniff;
pub mod validation;

pub use form::parse_form;
pub use ingestor::{UploadIngestor, DEFAULT_RENAME, RANDOM_NAME_LEN};
pub use models::{FilePart, UploadedFile};
pub use sniff::detect_content_type;
pub use validation::FileValidator;
