//! Content-Type lookup for uploads.
//!
//! NextCloud stores whatever Content-Type it is given, and the direct links
//! are served with it, so the table only lists formats an image host is
//! expected to hand out. Everything else is sent as an opaque binary.

/// Fallback for extensions missing from the table
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

static MIME_TYPES: &[(&str, &str)] = &[
    ("gif", "image/gif"),
    ("ico", "image/x-icon"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("tiff", "image/tiff"),
];

/// Maps an extension (`.png`, `png`, `.PNG`) to its Content-Type.
pub fn content_type_for(extname: &str) -> &'static str {
    let extension = extname.trim().trim_start_matches('.');

    MIME_TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(extension))
        .map(|(_, mime_type)| *mime_type)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(content_type_for(".png"), "image/png");
        assert_eq!(content_type_for(".jpg"), "image/jpeg");
        assert_eq!(content_type_for(".jpeg"), "image/jpeg");
        assert_eq!(content_type_for(".gif"), "image/gif");
        assert_eq!(content_type_for(".ico"), "image/x-icon");
        assert_eq!(content_type_for(".pdf"), "application/pdf");
        assert_eq!(content_type_for(".svg"), "image/svg+xml");
        assert_eq!(content_type_for(".tiff"), "image/tiff");
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        assert_eq!(content_type_for(".xyz"), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for(".webp"), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for(""), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_extension_spelling_is_normalized() {
        assert_eq!(content_type_for("png"), "image/png");
        assert_eq!(content_type_for(".PNG"), "image/png");
        assert_eq!(content_type_for(" .Jpg "), "image/jpeg");
    }
}
