//! Data-URL encoding and image sniffing.

use base64::Engine;

/// Encode bytes as a `data:` URL with a base64 payload.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Decode a base64 `data:` URL into its mime type and payload.
///
/// Only base64 payloads are supported; percent-encoded text payloads
/// return `None`. The mime part may be empty.
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;

    let mut parts = header.split(';');
    let mime = parts.next().unwrap_or("").to_string();
    if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
        return None;
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .ok()?;
    Some((mime, bytes))
}

/// Detect an image mime type from magic bytes.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(b"\xff\xd8\xff") {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Whether a mime type names an image.
pub fn is_image_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("image/")
}

/// File extension for a known image mime type.
pub(crate) fn extension_for_mime(mime: &str) -> &'static str {
    match mime.trim().to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\nrest";

    #[test]
    fn test_encode_decode_roundtrip() {
        let url = encode_data_url("image/png", PNG_MAGIC);
        assert!(url.starts_with("data:image/png;base64,"));

        let (mime, bytes) = decode_data_url(&url).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, PNG_MAGIC);
    }

    #[test]
    fn test_decode_rejects_non_base64_payloads() {
        assert!(decode_data_url("data:text/plain,hello%20world").is_none());
        assert!(decode_data_url("data:image/png;base64,%%%").is_none());
        assert!(decode_data_url("blob:https://host/uuid").is_none());
    }

    #[test]
    fn test_decode_empty_mime() {
        let (mime, bytes) = decode_data_url("data:;base64,aGk=").unwrap();
        assert_eq!(mime, "");
        assert_eq!(bytes, b"hi");
    }

    #[test]
    fn test_sniff_image_mime() {
        assert_eq!(sniff_image_mime(PNG_MAGIC), Some("image/png"));
        assert_eq!(sniff_image_mime(b"\xff\xd8\xff\xe0"), Some("image/jpeg"));
        assert_eq!(sniff_image_mime(b"GIF89a..."), Some("image/gif"));
        assert_eq!(sniff_image_mime(b"RIFF\x00\x00\x00\x00WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image_mime(b"plain text"), None);
    }

    #[test]
    fn test_is_image_mime() {
        assert!(is_image_mime("image/png"));
        assert!(is_image_mime(" IMAGE/JPEG "));
        assert!(!is_image_mime("application/pdf"));
    }
}
