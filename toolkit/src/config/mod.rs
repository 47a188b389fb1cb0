pub mod settings;

pub use settings::{UploadConfig, DEFAULT_MAX_FILE_SIZE, DEFAULT_MEMORY_LIMIT};
