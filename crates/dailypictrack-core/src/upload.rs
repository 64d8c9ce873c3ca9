//! Building and validating image uploads.
//!
//! An upload comes either from a file on disk or from a captured frame
//! encoded as a `data:` URL. Either way it ends up as an `UploadRequest`
//! that is checked locally before any bytes go over the wire.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::multipart::{Form, Part};
use thiserror::Error;

use crate::api::ApiError;

/// Largest accepted upload: 10 MiB
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// File name given to captured frames
pub const CAPTURE_FILE_NAME: &str = "capture.jpg";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Please select at least one file")]
    Empty,

    #[error("File size must be less than 10MB ({size} bytes)")]
    TooLarge { size: usize },

    #[error("Please select a valid image file (got {content_type})")]
    NotAnImage { content_type: String },

    #[error("Invalid captured image data: {0}")]
    InvalidDataUrl(String),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Content type implied by a file extension
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(content_type)
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub documentation: Option<String>,
    pub tags: Vec<String>,
}

impl UploadRequest {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
            documentation: None,
            tags: Vec::new(),
        }
    }

    /// Read an image from disk, inferring its content type from the extension.
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let bytes = std::fs::read(path).map_err(|source| UploadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let content_type = content_type_for_path(path).unwrap_or(FALLBACK_CONTENT_TYPE);
        Ok(Self::new(file_name, content_type, bytes))
    }

    /// Decode a captured frame of the form `data:<mime>;base64,<payload>`.
    pub fn from_data_url(data_url: &str, file_name: &str) -> Result<Self, UploadError> {
        let rest = data_url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| UploadError::InvalidDataUrl("missing data: prefix".into()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| UploadError::InvalidDataUrl("missing payload".into()))?;
        let content_type = meta
            .strip_suffix(";base64")
            .ok_or_else(|| UploadError::InvalidDataUrl("payload is not base64".into()))?;
        if content_type.is_empty() {
            return Err(UploadError::InvalidDataUrl("missing content type".into()));
        }
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| UploadError::InvalidDataUrl(e.to_string()))?;
        Ok(Self::new(file_name, content_type, bytes))
    }

    /// Attach documentation; surrounding whitespace is dropped and blank
    /// text means none.
    pub fn with_documentation(mut self, documentation: &str) -> Self {
        let trimmed = documentation.trim();
        self.documentation = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Attach tags, trimmed, without blanks or duplicates, in the given order
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() && !self.tags.iter().any(|t| t == tag) {
                self.tags.push(tag.to_string());
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), UploadError> {
        if self.bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge {
                size: self.bytes.len(),
            });
        }
        if !self.content_type.starts_with("image/") {
            return Err(UploadError::NotAnImage {
                content_type: self.content_type.clone(),
            });
        }
        Ok(())
    }

    /// Tags as the JSON array string the upload endpoint expects
    pub fn tags_json(&self) -> Option<String> {
        if self.tags.is_empty() {
            None
        } else {
            serde_json::to_string(&self.tags).ok()
        }
    }

    /// Multipart body: `image`, plus `documentation` and `tags` when set
    pub(crate) fn into_form(self) -> Result<Form, ApiError> {
        let tags = self.tags_json();
        let part = Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)
            .map_err(|e| ApiError::InvalidRequest(format!("Bad content type: {}", e)))?;

        let mut form = Form::new().part("image", part);
        if let Some(documentation) = self.documentation {
            form = form.text("documentation", documentation);
        }
        if let Some(tags) = tags {
            form = form.text("tags", tags);
        }
        Ok(form)
    }
}

/// User-facing text for a failed upload
pub fn upload_failure_message(err: &ApiError) -> String {
    if let Some(message) = err.server_message() {
        return message.to_string();
    }
    if err.is_timeout() {
        "Upload timeout. Please try with a smaller file or check your connection.".to_string()
    } else if err.is_network() {
        "Network error. Please check your internet connection.".to_string()
    } else {
        "Image upload failed. Please try again.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(content_type_for_path(Path::new("a.JPG")), Some("image/jpeg"));
        assert_eq!(content_type_for_path(Path::new("dir/b.png")), Some("image/png"));
        assert_eq!(content_type_for_path(Path::new("notes.txt")), None);
        assert_eq!(content_type_for_path(Path::new("no_extension")), None);
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sunrise.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let request = UploadRequest::from_path(&path).unwrap();
        assert_eq!(request.file_name, "sunrise.png");
        assert_eq!(request.content_type, "image/png");
        assert_eq!(request.bytes.len(), 4);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = UploadRequest::from_path(Path::new("/definitely/not/here.jpg")).unwrap_err();
        assert!(matches!(err, UploadError::Io { .. }));
    }

    #[test]
    fn test_non_image_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let err = UploadRequest::from_path(&path).unwrap().validate().unwrap_err();
        assert!(matches!(err, UploadError::NotAnImage { .. }));
    }

    #[test]
    fn test_size_limit() {
        let at_limit = UploadRequest::new("a.jpg", "image/jpeg", vec![0; MAX_UPLOAD_BYTES]);
        assert!(at_limit.validate().is_ok());

        let over = UploadRequest::new("a.jpg", "image/jpeg", vec![0; MAX_UPLOAD_BYTES + 1]);
        assert!(matches!(over.validate(), Err(UploadError::TooLarge { .. })));

        let empty = UploadRequest::new("a.jpg", "image/jpeg", Vec::new());
        assert!(matches!(empty.validate(), Err(UploadError::Empty)));
    }

    #[test]
    fn test_from_data_url() {
        let url = format!("data:image/jpeg;base64,{}", STANDARD.encode([1u8, 2, 3]));
        let request = UploadRequest::from_data_url(&url, CAPTURE_FILE_NAME).unwrap();
        assert_eq!(request.file_name, "capture.jpg");
        assert_eq!(request.content_type, "image/jpeg");
        assert_eq!(request.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_from_data_url_rejects_malformed() {
        for bad in [
            "image/jpeg;base64,AQID",
            "data:image/jpeg;base64",
            "data:image/jpeg,AQID",
            "data:;base64,AQID",
            "data:image/jpeg;base64,***",
        ] {
            assert!(
                matches!(
                    UploadRequest::from_data_url(bad, CAPTURE_FILE_NAME),
                    Err(UploadError::InvalidDataUrl(_))
                ),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn test_documentation_and_tags_normalised() {
        let request = UploadRequest::new("a.jpg", "image/jpeg", vec![1])
            .with_documentation("  walked 5k  ")
            .with_tags([" fitness ", "", "outdoor", "fitness"]);
        assert_eq!(request.documentation.as_deref(), Some("walked 5k"));
        assert_eq!(request.tags, vec!["fitness", "outdoor"]);
        assert_eq!(request.tags_json().as_deref(), Some(r#"["fitness","outdoor"]"#));

        let bare = UploadRequest::new("a.jpg", "image/jpeg", vec![1]).with_documentation("   ");
        assert_eq!(bare.documentation, None);
        assert_eq!(bare.tags_json(), None);
    }

    #[test]
    fn test_failure_message_prefers_server_text() {
        let err = ApiError::from_status(
            reqwest::StatusCode::PAYLOAD_TOO_LARGE,
            r#"{"message":"File too large"}"#,
        );
        assert_eq!(upload_failure_message(&err), "File too large");
        assert_eq!(
            upload_failure_message(&ApiError::MissingToken),
            "Image upload failed. Please try again."
        );
    }
}
