use crate::config::Config;
use crate::error::AppError;

/// Map a MIME type to the format name used in `supported_formats`.
pub fn mime_to_format(content_type: &str) -> Option<&'static str> {
    match content_type.to_lowercase().as_str() {
        "audio/mpeg" => Some("mp3"),
        "audio/wav" | "audio/wave" | "audio/x-wav" => Some("wav"),
        "audio/ogg" => Some("ogg"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/mp4" => Some("m4a"),
        "audio/aac" | "audio/x-aac" => Some("aac"),
        _ => None,
    }
}

/// Upload-time validation: format and byte size only. Duration limits are
/// checked during background decode, not here.
pub fn validate_upload(
    config: &Config,
    content_type: &str,
    size: usize,
) -> Result<&'static str, AppError> {
    let format = mime_to_format(content_type)
        .filter(|f| config.supported_formats.contains(*f))
        .ok_or_else(|| {
            let mut supported: Vec<&str> =
                config.supported_formats.iter().map(String::as_str).collect();
            supported.sort_unstable();
            AppError::UnsupportedFormat(format!(
                "Unsupported file type: {}. Supported formats: {}",
                content_type,
                supported.join(", ")
            ))
        })?;

    if size > config.max_upload_size {
        let size_mb = size as f64 / (1024.0 * 1024.0);
        let max_mb = config.max_upload_size as f64 / (1024.0 * 1024.0);
        return Err(AppError::FileTooLarge(format!(
            "File size ({:.2}MB) exceeds maximum allowed size ({:.0}MB)",
            size_mb, max_mb
        )));
    }

    Ok(format)
}
