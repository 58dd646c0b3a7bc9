//! Object storage for tour images and media.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{check_status, http_client, ClientError, ClientResult};

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` at `path` and return its public URL.
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> ClientResult<String>;

    async fn delete(&self, path: &str) -> ClientResult<()>;

    /// Public URL an object at `path` is served from.
    fn public_url(&self, path: &str) -> String;
}

/// Storage service speaking the `/storage/v1/object` HTTP API.
pub struct HttpObjectStorage {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl HttpObjectStorage {
    pub fn new(
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        service_key: impl Into<String>,
    ) -> Self {
        Self {
            client: http_client(60),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            service_key: service_key.into(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> ClientResult<String> {
        if self.base_url.is_empty() {
            return Err(ClientError::Configuration(
                "Storage URL is not configured".to_string(),
            ));
        }
        let response = self
            .client
            .post(self.object_url(path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(data)
            .send()
            .await?;
        check_status("Storage", response).await?;
        Ok(self.public_url(path))
    }

    async fn delete(&self, path: &str) -> ClientResult<()> {
        let response = self
            .client
            .delete(self.object_url(path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .send()
            .await?;
        check_status("Storage", response).await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}

/// Object store kept in memory; used in tests and when no storage service is
/// configured.
#[derive(Default)]
pub struct InMemoryObjectStorage {
    base_url: String,
    objects: RwLock<HashMap<String, (String, Bytes)>>,
}

impl InMemoryObjectStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Content type and bytes stored at `path`.
    pub fn get(&self, path: &str) -> Option<(String, Bytes)> {
        self.objects.read().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> ClientResult<String> {
        self.objects
            .write()
            .insert(path.to_string(), (content_type.to_string(), data));
        Ok(self.public_url(path))
    }

    async fn delete(&self, path: &str) -> ClientResult<()> {
        self.objects
            .write()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(path.to_string()))
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/media/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_storage_urls() {
        let storage = HttpObjectStorage::new("https://store.example.com/", "media", "key");
        assert_eq!(
            storage.object_url("tours/a.jpg"),
            "https://store.example.com/storage/v1/object/media/tours/a.jpg"
        );
        assert_eq!(
            storage.public_url("/tours/a.jpg"),
            "https://store.example.com/storage/v1/object/public/media/tours/a.jpg"
        );
    }

    #[tokio::test]
    async fn test_in_memory_upload_and_delete() {
        let storage = InMemoryObjectStorage::new("http://localhost:8080");
        let url = storage
            .upload("tours/x.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:8080/media/tours/x.png");
        assert_eq!(storage.get("tours/x.png").unwrap().0, "image/png");

        storage.delete("tours/x.png").await.unwrap();
        assert!(storage.is_empty());
        assert!(storage.delete("tours/x.png").await.is_err());
    }
}
