use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::ObjectStore;
use crate::error::StorageError;

/// In-memory implementation of [`ObjectStore`].
///
/// Backs the test suite and local development. A `BTreeMap` keeps listings
/// in lexicographic key order, matching S3 semantics.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
    /// Keys for which `delete_object` fails, for failure-injection tests.
    poisoned_deletes: Arc<RwLock<Vec<String>>>,
    /// Keys for which `put_object` fails, for failure-injection tests.
    poisoned_puts: Arc<RwLock<Vec<String>>>,
}

#[derive(Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Content type recorded for a key, if present.
    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.content_type.clone())
    }

    /// Make every `delete_object` under `prefix` fail with a storage error.
    pub async fn poison_deletes(&self, prefix: &str) {
        self.poisoned_deletes
            .write()
            .await
            .push(prefix.to_string());
    }

    /// Make every `put_object` under `prefix` fail with a storage error.
    pub async fn poison_puts(&self, prefix: &str) {
        self.poisoned_puts.write().await.push(prefix.to_string());
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let poisoned = self.poisoned_puts.read().await;
        if poisoned.iter().any(|p| key.starts_with(p.as_str())) {
            return Err(StorageError::S3(format!("injected put failure: {key}")));
        }
        drop(poisoned);

        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, StorageError> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let poisoned = self.poisoned_deletes.read().await;
        if poisoned.iter().any(|p| key.starts_with(p.as_str())) {
            return Err(StorageError::S3(format!("injected delete failure: {key}")));
        }
        drop(poisoned);

        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn object_exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.read().await.contains_key(key))
    }
}
