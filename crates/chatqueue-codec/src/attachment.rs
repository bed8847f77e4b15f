//! Attachment construction and materialization.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use chatqueue_protocols::Attachment;

use crate::data_url::{
    decode_data_url, encode_data_url, extension_for_mime, is_image_mime, sniff_image_mime,
};

/// Normalize a loosely-typed attachment object.
///
/// Requires a resolvable `dataUrl`; fills missing `id`/`name`/`mime` with
/// generated defaults. Returns `None` when no usable data is present.
/// Idempotent: normalizing its own output yields an identical attachment.
pub fn normalize_attachment(input: &Value) -> Option<Attachment> {
    let data_url = non_empty_str(input, "dataUrl")?;
    let (header_mime, bytes) = decode_data_url(data_url)?;

    let mime = non_empty_str(input, "mime")
        .map(str::to_string)
        .or_else(|| (!header_mime.is_empty()).then_some(header_mime))
        .or_else(|| sniff_image_mime(&bytes).map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let id = non_empty_str(input, "id")
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let name = non_empty_str(input, "name")
        .map(str::to_string)
        .unwrap_or_else(|| format!("image.{}", extension_for_mime(&mime)));

    Some(Attachment {
        id,
        name,
        mime,
        data_url: data_url.to_string(),
    })
}

/// Build an attachment from in-memory bytes.
pub fn attachment_from_bytes(name: impl Into<String>, mime: impl Into<String>, bytes: &[u8]) -> Attachment {
    let mime = mime.into();
    Attachment {
        id: Uuid::new_v4().to_string(),
        name: name.into(),
        mime: mime.clone(),
        data_url: encode_data_url(&mime, bytes),
    }
}

/// Read a file fully into memory and encode it as an attachment.
///
/// Resolves `None` on read failure; callers continue their batch.
pub async fn attachment_from_file(path: &Path) -> Option<Attachment> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read attachment file {:?}: {}", path, e);
            return None;
        }
    };

    let mime = sniff_image_mime(&bytes)
        .map(str::to_string)
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();

    Some(attachment_from_bytes(name, mime, &bytes))
}

/// Filter a clipboard/drop payload down to image attachments.
///
/// Best-effort per item: unreadable or non-image entries are skipped,
/// never fatal.
pub async fn collect_image_attachments(paths: &[PathBuf]) -> Vec<Attachment> {
    let mut attachments = Vec::new();
    for path in paths {
        let Some(attachment) = attachment_from_file(path).await else {
            continue;
        };
        if !is_image_mime(&attachment.mime) {
            continue;
        }
        attachments.push(attachment);
    }
    attachments
}

/// Materialize an attachment as a real file under `dir`.
///
/// The inverse of [`attachment_from_file`], used to repopulate the host's
/// native file input before submission. `None` on decode or write failure.
pub async fn attachment_to_file(attachment: &Attachment, dir: &Path) -> Option<PathBuf> {
    let (_, bytes) = decode_data_url(&attachment.data_url)?;

    let path = dir.join(format!(
        "{}_{}",
        attachment.id,
        sanitize_file_name(&attachment.name)
    ));
    if let Err(e) = tokio::fs::write(&path, &bytes).await {
        warn!("Failed to materialize attachment {:?}: {}", path, e);
        return None;
    }
    Some(path)
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\nrest";

    #[test]
    fn test_normalize_fills_defaults() {
        let input = json!({ "dataUrl": encode_data_url("", PNG_MAGIC) });
        let attachment = normalize_attachment(&input).unwrap();

        assert!(!attachment.id.is_empty());
        assert_eq!(attachment.mime, "image/png");
        assert_eq!(attachment.name, "image.png");
    }

    #[test]
    fn test_normalize_rejects_missing_or_transient_data() {
        assert!(normalize_attachment(&json!({})).is_none());
        assert!(normalize_attachment(&json!({ "dataUrl": "" })).is_none());
        assert!(normalize_attachment(&json!({ "name": "cat.png" })).is_none());
        assert!(normalize_attachment(&json!({ "dataUrl": "blob:https://host/x" })).is_none());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let input = json!({
            "id": "a1",
            "name": "cat.png",
            "mime": "image/png",
            "dataUrl": encode_data_url("image/png", PNG_MAGIC),
        });
        let first = normalize_attachment(&input).unwrap();
        let second = normalize_attachment(&serde_json::to_value(&first).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_file_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("cat.png");
        tokio::fs::write(&source, PNG_MAGIC).await.unwrap();

        let attachment = attachment_from_file(&source).await.unwrap();
        assert_eq!(attachment.mime, "image/png");
        assert_eq!(attachment.name, "cat.png");

        let restored = attachment_to_file(&attachment, dir.path()).await.unwrap();
        let bytes = tokio::fs::read(&restored).await.unwrap();
        assert_eq!(bytes, PNG_MAGIC);
    }

    #[tokio::test]
    async fn test_collect_skips_unreadable_and_non_image() {
        let dir = tempfile::TempDir::new().unwrap();
        let image = dir.path().join("a.png");
        let text = dir.path().join("b.txt");
        tokio::fs::write(&image, PNG_MAGIC).await.unwrap();
        tokio::fs::write(&text, b"notes").await.unwrap();

        let paths = vec![image, text, dir.path().join("missing.png")];
        let attachments = collect_image_attachments(&paths).await;

        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].name, "a.png");
    }

    #[tokio::test]
    async fn test_attachment_to_file_rejects_undecodable() {
        let dir = tempfile::TempDir::new().unwrap();
        let attachment = Attachment {
            id: "x".into(),
            name: "x.png".into(),
            mime: "image/png".into(),
            data_url: "blob:https://host/uuid".into(),
        };
        assert!(attachment_to_file(&attachment, dir.path()).await.is_none());
    }
}
