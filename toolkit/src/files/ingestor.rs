use axum::extract::Request;
use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::config::UploadConfig;
use crate::error::{Result, UploadError, UploadFailure, UploadResult};
use crate::random::RandomStringGenerator;

use super::form::parse_form;
use super::models::{FilePart, UploadedFile};
use super::validation::{base_file_name, file_extension, is_unusable_file_name, FileValidator};

/// Rename behaviour callers should use when they have no preference.
pub const DEFAULT_RENAME: bool = true;

/// Length of generated file names, extension excluded.
pub const RANDOM_NAME_LEN: usize = 25;

#[derive(Clone, Debug)]
pub struct UploadIngestor {
    config: UploadConfig,
    generator: RandomStringGenerator,
}

impl UploadIngestor {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            config,
            generator: RandomStringGenerator::default(),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(UploadConfig::default())
    }

    pub fn with_generator(mut self, generator: RandomStringGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut UploadConfig {
        &mut self.config
    }

    pub fn generator(&self) -> &RandomStringGenerator {
        &self.generator
    }

    /// Parses a multipart request and stores every file part in `upload_dir`.
    ///
    /// Parts are stored in the order they appear in the form. With `rename`
    /// each file gets a random 25 character name keeping its extension,
    /// otherwise the client's filename is used as is. Processing stops at the
    /// first failing part; files stored before it stay on disk and are
    /// returned in the [`UploadFailure`].
    pub async fn upload_files(
        &self,
        request: Request,
        upload_dir: impl AsRef<Path>,
        rename: bool,
    ) -> UploadResult {
        let upload_dir = upload_dir.as_ref().to_path_buf();

        match tokio::fs::metadata(&upload_dir).await {
            Ok(metadata) if metadata.is_dir() => {}
            _ => {
                warn!(dir = %upload_dir.display(), "upload directory does not exist");
                return Err(UploadError::DirectoryNotFound { path: upload_dir }.into());
            }
        }

        let max_size = self.config.effective_max_file_size();
        let parts = match parse_form(request, max_size, self.config.effective_memory_limit()).await {
            Ok(parts) => parts,
            Err(e) => {
                warn!(error = %e, max_size, "rejected multipart upload");
                return Err(e.into());
            }
        };

        let ingestor = self.clone();
        let task = tokio::task::spawn_blocking(move || ingestor.store_parts(parts, &upload_dir, rename));

        match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(UploadError::Interrupted(e.to_string()).into()),
        }
    }

    /// Validates and writes already parsed parts, one at a time.
    pub fn store_parts(&self, parts: Vec<FilePart>, upload_dir: &Path, rename: bool) -> UploadResult {
        if !upload_dir.is_dir() {
            warn!(dir = %upload_dir.display(), "upload directory does not exist");
            return Err(UploadError::DirectoryNotFound {
                path: upload_dir.to_path_buf(),
            }
            .into());
        }

        let validator = FileValidator::new(&self.config);
        let mut uploaded_files = Vec::with_capacity(parts.len());

        for part in parts {
            match self.store_part(&validator, part, upload_dir, rename) {
                Ok(uploaded_file) => uploaded_files.push(uploaded_file),
                Err(e) => {
                    if e.is_client_error() {
                        warn!(error = %e, stored = uploaded_files.len(), "upload rejected");
                    } else {
                        error!(error = %e, stored = uploaded_files.len(), "upload failed");
                    }
                    return Err(UploadFailure::new(e, uploaded_files));
                }
            }
        }

        info!(
            count = uploaded_files.len(),
            dir = %upload_dir.display(),
            "stored uploaded files"
        );

        Ok(uploaded_files)
    }

    fn store_part(
        &self,
        validator: &FileValidator,
        mut part: FilePart,
        upload_dir: &Path,
        rename: bool,
    ) -> Result<UploadedFile> {
        let original_file_name = base_file_name(part.file_name()).to_string();

        let content = part.open().map_err(UploadError::StreamOpen)?;
        let content_type = validator.validate_stream(content)?;
        content
            .seek(SeekFrom::Start(0))
            .map_err(UploadError::StreamSeek)?;

        let new_file_name = if rename {
            format!(
                "{}{}",
                self.generator.random_string(RANDOM_NAME_LEN)?,
                file_extension(&original_file_name)
            )
        } else {
            original_file_name.clone()
        };

        let destination = upload_dir.join(&new_file_name);
        if is_unusable_file_name(&new_file_name) {
            return Err(UploadError::DestinationCreate {
                path: destination,
                source: io::Error::new(io::ErrorKind::InvalidInput, "file name does not name a file"),
            });
        }

        let mut outfile = File::create(&destination).map_err(|source| UploadError::DestinationCreate {
            path: destination.clone(),
            source,
        })?;

        let file_size = io::copy(content, &mut outfile).map_err(UploadError::Copy)?;
        outfile.sync_all().map_err(UploadError::Copy)?;

        debug!(
            original = %original_file_name,
            stored_as = %new_file_name,
            size = file_size,
            content_type,
            "stored uploaded file"
        );

        Ok(UploadedFile {
            original_file_name,
            new_file_name,
            file_size,
            content_type: content_type.to_string(),
        })
    }
}

impl Default for UploadIngestor {
    fn default() -> Self {
        Self::with_default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RandomError;
    use crate::random::SecureRandom;
    use tempfile::TempDir;

    struct ZeroSource;

    impl SecureRandom for ZeroSource {
        fn fill(&self, dest: &mut [u8]) -> std::result::Result<(), RandomError> {
            dest.fill(0);
            Ok(())
        }
    }

    struct BrokenSource;

    impl SecureRandom for BrokenSource {
        fn fill(&self, _dest: &mut [u8]) -> std::result::Result<(), RandomError> {
            Err(RandomError::SourceUnavailable("no entropy".to_string()))
        }
    }

    fn part(file_name: &str, data: &[u8]) -> FilePart {
        FilePart::from_bytes("file", file_name, data).unwrap()
    }

    #[test]
    fn test_store_parts_keeps_original_names() {
        let dir = TempDir::new().unwrap();
        let ingestor = UploadIngestor::with_default_config();

        let files = ingestor
            .store_parts(vec![part("a.txt", b"alpha"), part("b.txt", b"bravo!")], dir.path(), false)
            .unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].new_file_name, "a.txt");
        assert_eq!(files[1].file_size, 6);
        assert_eq!(std::fs::read(dir.path().join("b.txt")).unwrap(), b"bravo!");
    }

    #[test]
    fn test_store_parts_renames_with_injected_source() {
        let dir = TempDir::new().unwrap();
        let ingestor = UploadIngestor::with_default_config()
            .with_generator(RandomStringGenerator::new(ZeroSource));

        let files = ingestor
            .store_parts(vec![part("photo.final.jpg", b"data")], dir.path(), true)
            .unwrap();

        let expected = format!("{}.jpg", "a".repeat(RANDOM_NAME_LEN));
        assert_eq!(files[0].new_file_name, expected);
        assert_eq!(files[0].original_file_name, "photo.final.jpg");
        assert!(dir.path().join(&expected).exists());
    }

    #[test]
    fn test_store_parts_copies_full_content_after_sniffing() {
        let dir = TempDir::new().unwrap();
        let ingestor = UploadIngestor::with_default_config();
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();

        let files = ingestor
            .store_parts(vec![part("blob.bin", &data)], dir.path(), false)
            .unwrap();

        assert_eq!(files[0].file_size, 4096);
        assert_eq!(files[0].content_type, "application/octet-stream");
        assert_eq!(std::fs::read(dir.path().join("blob.bin")).unwrap(), data);
    }

    #[test]
    fn test_store_parts_strips_client_directories() {
        let dir = TempDir::new().unwrap();
        let ingestor = UploadIngestor::with_default_config();

        let files = ingestor
            .store_parts(vec![part("../../escape.txt", b"contained")], dir.path(), false)
            .unwrap();

        assert_eq!(files[0].original_file_name, "escape.txt");
        assert!(dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_store_parts_rejects_unusable_name() {
        let dir = TempDir::new().unwrap();
        let ingestor = UploadIngestor::with_default_config();

        let failure = ingestor
            .store_parts(vec![part("uploads/..", b"x")], dir.path(), false)
            .unwrap_err();

        assert!(matches!(failure.error(), UploadError::DestinationCreate { .. }));
    }

    #[test]
    fn test_store_parts_stops_at_disallowed_type() {
        let dir = TempDir::new().unwrap();
        let config = UploadConfig {
            allowed_file_types: vec!["text/plain; charset=utf-8".to_string()],
            ..Default::default()
        };
        let ingestor = UploadIngestor::new(config);

        let parts = vec![
            part("ok.txt", b"plain text"),
            part("image.png", b"\x89PNG\x0D\x0A\x1A\x0A\x00\x00"),
            part("never.txt", b"not reached"),
        ];
        let failure = ingestor.store_parts(parts, dir.path(), false).unwrap_err();

        assert!(matches!(
            failure.error(),
            UploadError::FiletypeNotPermitted { content_type } if content_type == "image/png"
        ));
        assert_eq!(failure.stored().len(), 1);
        assert!(dir.path().join("ok.txt").exists());
        assert!(!dir.path().join("image.png").exists());
        assert!(!dir.path().join("never.txt").exists());
    }

    #[test]
    fn test_store_parts_stops_at_empty_part() {
        let dir = TempDir::new().unwrap();
        let ingestor = UploadIngestor::with_default_config();

        let parts = vec![
            part("first.txt", b"has content"),
            part("empty.txt", b""),
            part("after.txt", b"not reached"),
        ];
        let failure = ingestor.store_parts(parts, dir.path(), false).unwrap_err();

        match failure.error() {
            UploadError::StreamRead(source) => assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(failure.stored().len(), 1);
        assert_eq!(failure.stored()[0].new_file_name, "first.txt");
        assert!(dir.path().join("first.txt").exists());
        assert!(!dir.path().join("empty.txt").exists());
        assert!(!dir.path().join("after.txt").exists());
    }

    #[test]
    fn test_store_parts_reports_random_source_failure() {
        let dir = TempDir::new().unwrap();
        let ingestor = UploadIngestor::with_default_config()
            .with_generator(RandomStringGenerator::new(BrokenSource));

        let failure = ingestor
            .store_parts(vec![part("a.txt", b"alpha")], dir.path(), true)
            .unwrap_err();

        assert!(matches!(failure.error(), UploadError::RandomSource(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_store_parts_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let ingestor = UploadIngestor::with_default_config();

        let failure = ingestor
            .store_parts(vec![part("a.txt", b"alpha")], &missing, false)
            .unwrap_err();

        assert!(matches!(failure.error(), UploadError::DirectoryNotFound { .. }));
        assert!(!missing.exists());
    }

    #[test]
    fn test_config_changes_apply_to_next_call() {
        let dir = TempDir::new().unwrap();
        let mut ingestor = UploadIngestor::with_default_config();

        assert!(ingestor
            .store_parts(vec![part("one.txt", b"one")], dir.path(), false)
            .is_ok());

        ingestor.config_mut().allowed_file_types = vec!["image/png".to_string()];
        assert!(ingestor
            .store_parts(vec![part("two.txt", b"two")], dir.path(), false)
            .is_err());
    }
}
