use axum::extract::Request;
use http::header::CONTENT_TYPE;
use multer::{Constraints, Multipart, SizeLimit};

use crate::error::{Result, UploadError};

use super::models::FilePart;

/// Reads a `multipart/form-data` body into spooled file parts.
///
/// The whole body is bounded by `max_size` and is fully consumed before this
/// returns, so an oversized form is rejected before anything is stored.
/// `memory_limit` is shared by all parts: a part that does not fit in what is
/// left of it is spooled to a temporary file. Fields without a filename are
/// skipped.
pub async fn parse_form(request: Request, max_size: u64, memory_limit: usize) -> Result<Vec<FilePart>> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| UploadError::MalformedForm("missing multipart content type".to_string()))?;

    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| UploadError::MalformedForm(e.to_string()))?;

    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(max_size));
    let body_stream = request.into_body().into_data_stream();
    let mut multipart = Multipart::with_constraints(body_stream, boundary, constraints);

    let mut parts = Vec::new();
    let mut memory_left = memory_limit;

    while let Some(mut field) = multipart.next_field().await.map_err(form_error)? {
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let field_name = field.name().unwrap_or_default().to_string();

        let mut part = FilePart::new(field_name, file_name, memory_left);
        while let Some(chunk) = field.chunk().await.map_err(form_error)? {
            part.append(&chunk).map_err(UploadError::Spool)?;
        }

        if !part.is_spooled_to_disk() {
            memory_left = memory_left.saturating_sub(part.len() as usize);
        }

        tracing::debug!(
            field = %part.field_name(),
            file_name = %part.file_name(),
            size = part.len(),
            on_disk = part.is_spooled_to_disk(),
            "buffered multipart file part"
        );
        parts.push(part);
    }

    Ok(parts)
}

fn form_error(err: multer::Error) -> UploadError {
    match err {
        multer::Error::StreamSizeExceeded { limit } => UploadError::UploadTooLarge { limit },
        other => UploadError::MalformedForm(other.to_string()),
    }
}
