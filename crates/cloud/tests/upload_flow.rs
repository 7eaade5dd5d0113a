//! Upload flow against an in-memory storage implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use runbridge_cloud::upload::upload_data_uri;
use runbridge_cloud::{ObjectStorage, StorageError, StoredObject};
use runbridge_core::urls::{StorageAddressing, StorageUrlConfig};

/// Test double capturing puts and deletes.
#[derive(Default)]
struct MemoryStorage {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list_objects(
        &self,
        prefix: &str,
        max_keys: i32,
    ) -> Result<Vec<StoredObject>, StorageError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .take(max_keys as usize)
            .map(|k| StoredObject {
                key: k.clone(),
                last_modified: None,
                size: None,
            })
            .collect())
    }
}

fn urls() -> StorageUrlConfig {
    StorageUrlConfig {
        endpoint: "https://nyc3.example-objects.com".into(),
        cdn_endpoint: "https://cdn.example.com".into(),
        bucket: "runbridge".into(),
        addressing: StorageAddressing::OmitBucket,
    }
}

#[tokio::test]
async fn upload_stores_under_uploads_prefix_and_returns_cdn_url() {
    let storage = MemoryStorage::default();
    let url = upload_data_uri(&storage, &urls(), "data:image/webp;base64,aGVsbG8=")
        .await
        .unwrap();

    assert!(url.starts_with("https://cdn.example.com/uploads/"));
    assert!(url.ends_with(".webp"));

    let objects = storage.objects.lock().unwrap();
    assert_eq!(objects.len(), 1);
    let (key, (bytes, content_type)) = objects.iter().next().unwrap();
    assert!(key.starts_with("uploads/"));
    assert!(key.ends_with(".webp"));
    assert_eq!(bytes, b"hello");
    assert_eq!(content_type, "image/webp");
}

#[tokio::test]
async fn invalid_payload_stores_nothing() {
    let storage = MemoryStorage::default();
    let result = upload_data_uri(&storage, &urls(), "https://not-a-data-uri.example").await;

    assert!(matches!(result, Err(StorageError::InvalidPayload(_))));
    assert!(storage.objects.lock().unwrap().is_empty());
}
