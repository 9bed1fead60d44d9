//! Email attachments.

use crate::{MailError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const OCTET_STREAM: &str = "application/octet-stream";

/// Content disposition for attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentDisposition {
    /// Attachment (for downloads).
    #[default]
    Attachment,
    /// Inline (for embedding in HTML).
    Inline,
}

/// Email attachment, usually added by a mailer's `before` hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// File content.
    pub data: Vec<u8>,
    /// Content disposition.
    pub disposition: ContentDisposition,
    /// Content ID (for inline attachments).
    pub content_id: Option<String>,
}

impl Attachment {
    /// Create a new attachment from bytes.
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
            disposition: ContentDisposition::Attachment,
            content_id: None,
        }
    }

    /// Create an attachment from a file path, guessing the MIME type.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MailError::Attachment(format!("Invalid file name: {}", path.display())))?
            .to_string();

        let data = std::fs::read(path)
            .map_err(|e| MailError::Attachment(format!("{}: {}", path.display(), e)))?;

        Ok(Self::from_bytes(filename, data))
    }

    /// Create an attachment from bytes, guessing the MIME type from the name.
    pub fn from_bytes(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let filename = filename.into();
        let content_type = mime_guess::from_path(&filename)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| OCTET_STREAM.to_string());

        Self::new(filename, content_type, data)
    }

    /// Make this an inline attachment (for embedding in HTML).
    pub fn inline(mut self) -> Self {
        self.disposition = ContentDisposition::Inline;
        self
    }

    /// Set the content ID (for inline references like `<img src="cid:xxx">`).
    pub fn content_id(mut self, id: impl Into<String>) -> Self {
        self.content_id = Some(id.into());
        self.disposition = ContentDisposition::Inline;
        self
    }

    /// Generate a unique content ID.
    pub fn with_generated_content_id(self) -> Self {
        let id = format!("{}@herald", uuid::Uuid::new_v4());
        self.content_id(id)
    }

    /// Check if this is an inline attachment.
    pub fn is_inline(&self) -> bool {
        self.disposition == ContentDisposition::Inline
    }

    /// Get the size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Build the lettre part for this attachment.
    pub(crate) fn to_lettre(&self) -> lettre::message::SinglePart {
        let content_type = lettre::message::header::ContentType::parse(&self.content_type)
            .unwrap_or_else(|_| {
                lettre::message::header::ContentType::parse(OCTET_STREAM)
                    .unwrap_or(lettre::message::header::ContentType::TEXT_PLAIN)
            });

        match (&self.disposition, &self.content_id) {
            (ContentDisposition::Inline, Some(id)) => {
                lettre::message::Attachment::new_inline(id.clone()).body(self.data.clone(), content_type)
            }
            _ => lettre::message::Attachment::new(self.filename.clone())
                .body(self.data.clone(), content_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_is_guessed() {
        let pdf = Attachment::from_bytes("invoice.pdf", b"%PDF".to_vec());
        assert_eq!(pdf.content_type, "application/pdf");
        assert!(!pdf.is_inline());

        let unknown = Attachment::from_bytes("blob.zzzz", vec![0u8]);
        assert_eq!(unknown.content_type, OCTET_STREAM);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("invitation-7.ics");
        std::fs::write(&path, "BEGIN:VCALENDAR").unwrap();

        let attachment = Attachment::from_file(&path).unwrap();
        assert_eq!(attachment.filename, "invitation-7.ics");
        assert_eq!(attachment.content_type, "text/calendar");
        assert_eq!(attachment.size(), 15);
    }

    #[test]
    fn test_from_missing_file() {
        let result = Attachment::from_file("/path/to/nowhere/invoice.pdf");
        assert!(matches!(result, Err(MailError::Attachment(_))));
    }

    #[test]
    fn test_generated_content_id_is_inline() {
        let logo = Attachment::from_bytes("logo.png", vec![1, 2, 3]).with_generated_content_id();
        assert!(logo.is_inline());
        assert!(logo.content_id.unwrap().ends_with("@herald"));
    }
}
