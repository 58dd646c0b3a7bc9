//! Media uploads for tours and pages.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::error::{ServiceError, ServiceResult};
use crate::clients::ObjectStorage;

/// Content types accepted for upload, with the extension stored objects get.
pub const ALLOWED_CONTENT_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("image/avif", "avif"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
];

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub path: String,
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    ALLOWED_CONTENT_TYPES
        .iter()
        .find(|(ct, _)| *ct == content_type)
        .map(|(_, ext)| *ext)
}

/// Lowercase the name, keep `[a-z0-9._-]`, collapse everything else to `-`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let mut out = String::with_capacity(base.len());
    for c in base.chars().flat_map(char::to_lowercase) {
        let c = if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
            c
        } else {
            '-'
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        if c == '.' && out.ends_with('-') {
            out.pop();
        }
        out.push(c);
    }
    let trimmed = out.trim_matches(|c| c == '-' || c == '.');
    let mut name: String = trimmed.chars().take(100).collect();
    if name.is_empty() {
        name.push_str("file");
    }
    name
}

fn sanitize_folder(folder: &str) -> ServiceResult<String> {
    let segments: Vec<&str> = folder
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        return Ok("uploads".to_string());
    }
    for segment in &segments {
        let valid = *segment != ".."
            && segment
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !valid {
            return Err(ServiceError::validation(format!(
                "Invalid folder '{}'",
                folder
            )));
        }
    }
    Ok(segments.join("/"))
}

/// Storage path for an upload: `{folder}/{uuid}-{name}` with the extension
/// matching `content_type`.
pub fn object_path(folder: &str, file_name: &str, content_type: &str) -> ServiceResult<String> {
    let ext = extension_for(content_type).ok_or_else(|| {
        ServiceError::validation(format!("Unsupported content type '{}'", content_type))
    })?;
    let folder = sanitize_folder(folder)?;
    let mut name = sanitize_file_name(file_name);
    let has_ext = name
        .rsplit_once('.')
        .is_some_and(|(_, e)| e == ext || (ext == "jpg" && e == "jpeg"));
    if !has_ext {
        name = format!("{}.{}", name.trim_end_matches('.'), ext);
    }
    Ok(format!("{}/{}-{}", folder, uuid::Uuid::new_v4(), name))
}

pub async fn upload(
    storage: &dyn ObjectStorage,
    folder: &str,
    file_name: &str,
    content_type: &str,
    data: Bytes,
    max_bytes: usize,
) -> ServiceResult<UploadedFile> {
    let content_type = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    if data.is_empty() {
        return Err(ServiceError::validation("Upload is empty"));
    }
    if data.len() > max_bytes {
        return Err(ServiceError::validation(format!(
            "Upload is {} bytes, the limit is {}",
            data.len(),
            max_bytes
        )));
    }
    let path = object_path(folder, file_name, &content_type)?;
    let size = data.len();
    let url = storage
        .upload(&path, data, &content_type)
        .await
        .map_err(ServiceError::Storage)?;
    log::info!("Uploaded {} ({} bytes)", path, size);
    Ok(UploadedFile {
        path,
        url,
        content_type,
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryObjectStorage;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Plaza Mayor (1).JPG"), "plaza-mayor-1.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\sunset.png"), "sunset.png");
        assert_eq!(sanitize_file_name("???"), "file");
    }

    #[test]
    fn test_object_path_layout() {
        let path = object_path("tours/42", "Sunset.jpeg", "image/jpeg").unwrap();
        assert!(path.starts_with("tours/42/"));
        assert!(path.ends_with("-sunset.jpeg"));

        let path = object_path("", "clip", "video/mp4").unwrap();
        assert!(path.starts_with("uploads/"));
        assert!(path.ends_with("-clip.mp4"));

        assert!(object_path("../secret", "a.png", "image/png").is_err());
        assert!(object_path("tours", "a.svg", "image/svg+xml").is_err());
    }

    #[tokio::test]
    async fn test_upload_enforces_limits() {
        let storage = InMemoryObjectStorage::new("http://cdn.test");
        let data = Bytes::from_static(b"\x89PNG....");

        let file = upload(
            &storage,
            "tours",
            "map.png",
            "image/png; charset=binary",
            data.clone(),
            1024,
        )
        .await
        .unwrap();
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.url, format!("http://cdn.test/media/{}", file.path));
        assert_eq!(storage.len(), 1);

        assert!(upload(&storage, "tours", "map.png", "image/png", data.clone(), 4)
            .await
            .is_err());
        assert!(upload(&storage, "tours", "map.png", "image/png", Bytes::new(), 1024)
            .await
            .is_err());
        assert!(upload(&storage, "tours", "doc.pdf", "application/pdf", data, 1024)
            .await
            .is_err());
    }
}
