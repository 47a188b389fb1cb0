use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;
pub const DEFAULT_MEMORY_LIMIT: usize = 32 * 1024 * 1024;

const CONFIG_FILE: &str = "toolkit";
const ENV_PREFIX: &str = "TOOLKIT";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Ceiling for the whole multipart body. Zero means 1 GiB.
    pub max_file_size: u64,
    /// Permitted sniffed MIME types. Empty allows everything.
    pub allowed_file_types: Vec<String>,
    /// Bytes of file content held in memory across the whole form while it is
    /// parsed. Parts beyond it are spooled to a temporary file.
    pub memory_limit: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 0,
            allowed_file_types: Vec::new(),
            memory_limit: DEFAULT_MEMORY_LIMIT,
        }
    }
}

impl UploadConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&UploadConfig::default())?);

        if Path::new(&format!("{}.toml", CONFIG_FILE)).exists() {
            builder = builder.add_source(File::with_name(CONFIG_FILE));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("allowed_file_types"),
        );

        let upload_config: UploadConfig = builder.build()?.try_deserialize()?;
        upload_config.validate()?;

        Ok(upload_config)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let upload_config: UploadConfig = Config::builder()
            .add_source(Config::try_from(&UploadConfig::default())?)
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;

        upload_config.validate()?;

        Ok(upload_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for file_type in &self.allowed_file_types {
            if file_type.parse::<mime::Mime>().is_err() {
                return Err(ConfigError::Message(format!(
                    "Allowed file type is not a valid MIME type: {}",
                    file_type
                )));
            }
        }

        if self.max_file_size == 0 {
            tracing::debug!(
                default_bytes = DEFAULT_MAX_FILE_SIZE,
                "max_file_size unset, using default"
            );
        }

        Ok(())
    }

    pub fn effective_max_file_size(&self) -> u64 {
        if self.max_file_size == 0 {
            DEFAULT_MAX_FILE_SIZE
        } else {
            self.max_file_size
        }
    }

    pub fn effective_memory_limit(&self) -> usize {
        if self.memory_limit == 0 {
            DEFAULT_MEMORY_LIMIT
        } else {
            self.memory_limit
        }
    }

    pub fn is_type_allowed(&self, content_type: &str) -> bool {
        self.allowed_file_types.is_empty()
            || self
                .allowed_file_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(content_type))
    }
}
