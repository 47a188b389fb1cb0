use serde::{Deserialize, Serialize};
use std::io::{Seek, SeekFrom, Write};
use tempfile::SpooledTempFile;

/// Metadata for one file written by an upload call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub original_file_name: String,
    pub new_file_name: String,
    pub file_size: u64,
    pub content_type: String,
}

/// One file part of a parsed multipart form.
///
/// Content is held in memory up to the spool threshold and in an anonymous
/// temporary file beyond it. Dropping the part releases both.
#[derive(Debug)]
pub struct FilePart {
    field_name: String,
    file_name: String,
    content: SpooledTempFile,
    len: u64,
}

impl FilePart {
    pub fn new(field_name: impl Into<String>, file_name: impl Into<String>, memory_limit: usize) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: file_name.into(),
            content: SpooledTempFile::new(memory_limit),
            len: 0,
        }
    }

    pub fn from_bytes(
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        data: &[u8],
    ) -> std::io::Result<Self> {
        let mut part = Self::new(field_name, file_name, data.len().max(1));
        part.append(data)?;
        Ok(part)
    }

    pub(crate) fn append(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.content.write_all(chunk)?;
        self.len += chunk.len() as u64;
        Ok(())
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// The filename as declared by the client.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_spooled_to_disk(&self) -> bool {
        self.content.is_rolled()
    }

    /// Positions the content at its first byte and hands out a reader.
    pub(crate) fn open(&mut self) -> std::io::Result<&mut SpooledTempFile> {
        self.content.seek(SeekFrom::Start(0))?;
        Ok(&mut self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_part_spools_past_limit() {
        let mut part = FilePart::new("file", "big.bin", 8);
        part.append(b"0123").unwrap();
        assert!(!part.is_spooled_to_disk());

        part.append(b"456789abcdef").unwrap();
        assert!(part.is_spooled_to_disk());
        assert_eq!(part.len(), 16);

        let mut contents = Vec::new();
        part.open().unwrap().read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"0123456789abcdef");
    }

    #[test]
    fn test_part_from_bytes() {
        let mut part = FilePart::from_bytes("upload", "notes.txt", b"hello").unwrap();
        assert_eq!(part.field_name(), "upload");
        assert_eq!(part.file_name(), "notes.txt");
        assert!(!part.is_empty());

        let mut contents = String::new();
        part.open().unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "hello");
    }

    #[test]
    fn test_uploaded_file_serializes() {
        let file = UploadedFile {
            original_file_name: "report.pdf".to_string(),
            new_file_name: "AbCdEfGhIjKlMnOpQrStUvWxY.pdf".to_string(),
            file_size: 1024,
            content_type: "application/pdf".to_string(),
        };

        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["original_file_name"], "report.pdf");
        assert_eq!(json["file_size"], 1024);
    }
}
