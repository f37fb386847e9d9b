//! Input capture for file attachments: data-URL encoding and file reading.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatError, Result};

// ---------------------------------------------------------------------------
// Data URLs
// ---------------------------------------------------------------------------

/// A parsed `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime_type: String,
    encoded: String,
}

impl DataUrl {
    /// Encode raw bytes under the given MIME type.
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        DataUrl {
            mime_type: mime_type.to_string(),
            encoded: STANDARD.encode(bytes),
        }
    }

    /// Parse a base64 data URL. Only the header is validated here; the payload
    /// is checked when [`DataUrl::decode`] runs.
    pub fn parse(s: &str) -> Result<Self> {
        let rest = s.strip_prefix("data:").ok_or_else(|| ChatError::InvalidDataUrl {
            reason: "missing 'data:' scheme".into(),
        })?;
        let (header, encoded) = rest.split_once(',').ok_or_else(|| ChatError::InvalidDataUrl {
            reason: "missing ',' separator".into(),
        })?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| ChatError::InvalidDataUrl {
                reason: "payload is not base64".into(),
            })?;
        // Parameters such as `;charset=` may precede the base64 marker.
        let mime_type = mime_type.split(';').next().unwrap_or("");
        Ok(DataUrl {
            mime_type: mime_type.to_string(),
            encoded: encoded.to_string(),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(self.encoded.as_bytes())?)
    }
}

impl std::fmt::Display for DataUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.encoded)
    }
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

/// How an attachment is rendered and which default prompt it gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Document,
    Other,
}

impl AttachmentKind {
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            AttachmentKind::Image
        } else if mime_type.starts_with("application/pdf") {
            AttachmentKind::Document
        } else {
            AttachmentKind::Other
        }
    }
}

/// The single file staged by the user but not yet sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAttachment {
    /// Data URL carrying the MIME type inline.
    pub payload: String,
    pub filename: String,
    pub mime_type: String,
}

impl PendingAttachment {
    pub fn from_bytes(filename: &str, mime_type: &str, bytes: &[u8]) -> Self {
        PendingAttachment {
            payload: DataUrl::encode(mime_type, bytes).to_string(),
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
        }
    }

    pub fn kind(&self) -> AttachmentKind {
        AttachmentKind::from_mime(&self.mime_type)
    }
}

/// Guess a MIME type from the file extension. Unknown extensions are
/// `application/octet-stream`.
pub fn mime_from_path(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Whether `mime_type` satisfies a file-input accept filter such as
/// `image/*` or `application/pdf,image/png`. An empty filter accepts anything.
pub fn accepts(filter: &str, mime_type: &str) -> bool {
    let mut patterns = filter.split(',').map(str::trim).filter(|p| !p.is_empty()).peekable();
    if patterns.peek().is_none() {
        return true;
    }
    patterns.any(|pattern| match pattern.strip_suffix("/*") {
        Some("*") => true,
        Some(major) => mime_type
            .split_once('/')
            .is_some_and(|(m, _)| m.eq_ignore_ascii_case(major)),
        None => pattern == "*" || pattern.eq_ignore_ascii_case(mime_type),
    })
}

/// Read the selected file fully and encode it as a pending attachment.
///
/// `None` selection yields `Ok(None)`: nothing was picked, nothing changes.
pub async fn capture_file(selection: Option<&Path>) -> Result<Option<PendingAttachment>> {
    let Some(path) = selection else {
        return Ok(None);
    };
    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime_type = mime_from_path(path);
    debug!(file = %filename, mime = %mime_type, size = bytes.len(), "file captured");
    Ok(Some(PendingAttachment::from_bytes(&filename, &mime_type, &bytes)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    #[test]
    fn test_data_url_display_format() {
        let url = DataUrl::encode("image/png", b"abc");
        assert_eq!(url.to_string(), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_data_url_parse_extracts_mime() {
        let url = DataUrl::parse("data:application/pdf;base64,JVBERi0=").unwrap();
        assert_eq!(url.mime_type(), "application/pdf");
        assert_eq!(url.decode().unwrap(), b"%PDF-".to_vec());
    }

    #[test]
    fn test_data_url_parse_skips_parameters() {
        let url = DataUrl::parse("data:text/plain;charset=utf-8;base64,aGk=").unwrap();
        assert_eq!(url.mime_type(), "text/plain");
        assert_eq!(url.decode().unwrap(), b"hi".to_vec());
    }

    #[test]
    fn test_data_url_parse_rejects_missing_scheme() {
        assert!(matches!(
            DataUrl::parse("image/png;base64,AA=="),
            Err(ChatError::InvalidDataUrl { .. })
        ));
    }

    #[test]
    fn test_data_url_parse_rejects_non_base64() {
        assert!(DataUrl::parse("data:text/plain,hello").is_err());
    }

    #[test]
    fn test_data_url_decode_rejects_garbage() {
        let url = DataUrl::parse("data:application/pdf;base64,@@@").unwrap();
        assert!(matches!(url.decode(), Err(ChatError::Base64(_))));
    }

    #[test]
    fn test_attachment_kind_from_mime() {
        assert_eq!(AttachmentKind::from_mime("image/png"), AttachmentKind::Image);
        assert_eq!(
            AttachmentKind::from_mime("application/pdf"),
            AttachmentKind::Document
        );
        assert_eq!(AttachmentKind::from_mime("text/plain"), AttachmentKind::Other);
    }

    #[test]
    fn test_mime_from_path_is_case_insensitive() {
        assert_eq!(mime_from_path(Path::new("photo.PNG")), "image/png");
        assert_eq!(mime_from_path(Path::new("a.JpEg")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("doc.pdf")), "application/pdf");
        assert_eq!(
            mime_from_path(Path::new("noext")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_mime_from_path_covers_less_common_images() {
        assert_eq!(mime_from_path(Path::new("scan.tif")), "image/tiff");
        assert_eq!(
            AttachmentKind::from_mime(&mime_from_path(Path::new("scan.tiff"))),
            AttachmentKind::Image
        );
    }

    #[test]
    fn test_accepts_wildcard_and_exact_filters() {
        assert!(accepts("image/*", "image/png"));
        assert!(!accepts("image/*", "application/pdf"));
        assert!(accepts("application/pdf", "application/pdf"));
        assert!(!accepts("application/pdf", "image/jpeg"));
        assert!(accepts("application/pdf, image/*", "image/gif"));
        assert!(accepts("", "application/octet-stream"));
        assert!(accepts("*/*", "text/plain"));
    }

    #[tokio::test]
    async fn test_capture_file_none_selection_is_silent() {
        assert_eq!(capture_file(None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_capture_file_reads_and_encodes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&[0x89, b'P', b'N', b'G']).unwrap();
        drop(f);

        let att = capture_file(Some(path.as_path())).await.unwrap().unwrap();
        assert_eq!(att.filename, "pixel.png");
        assert_eq!(att.mime_type, "image/png");
        assert_eq!(att.kind(), AttachmentKind::Image);
        let decoded = DataUrl::parse(&att.payload).unwrap().decode().unwrap();
        assert_eq!(decoded, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_capture_file_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = capture_file(Some(dir.path().join("nope.pdf").as_path())).await;
        assert!(matches!(result, Err(ChatError::Io(_))));
    }

    proptest! {
        #[test]
        fn prop_pending_payload_decodes_to_original(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let att = PendingAttachment::from_bytes("blob.bin", "application/pdf", &bytes);
            let url = DataUrl::parse(&att.payload).unwrap();
            prop_assert_eq!(url.mime_type(), "application/pdf");
            prop_assert_eq!(url.decode().unwrap(), bytes);
        }
    }
}
