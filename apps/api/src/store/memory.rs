use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Collection, Document, DocumentStore, Filter, StoreError};

/// In-process store. Each collection is an insertion-ordered list, so scans
/// and lookups return documents in the order they were written, matching the
/// Postgres backend.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(&d.body)))
            .cloned())
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.matches(&d.body))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn scan(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard.get(&collection).cloned().unwrap_or_default())
    }

    async fn count(&self, collection: Collection) -> Result<u64, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard.get(&collection).map_or(0, |docs| docs.len() as u64))
    }

    async fn insert(
        &self,
        collection: Collection,
        body: Map<String, Value>,
    ) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let mut guard = self.collections.write().await;
        guard
            .entry(collection)
            .or_default()
            .push(Document { id, body });
        Ok(id)
    }

    async fn merge(
        &self,
        collection: Collection,
        id: Uuid,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(doc) = guard
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
        else {
            return Ok(false);
        };
        doc.body.extend(fields);
        Ok(true)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(&collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let store = MemoryDocumentStore::new();
        let id = store
            .insert(Collection::Jobs, body(json!({ "id": 1, "title": "Analyst" })))
            .await
            .unwrap();

        let doc = store.get(Collection::Jobs, id).await.unwrap().unwrap();
        assert_eq!(doc.body["title"], json!("Analyst"));
        assert!(store.get(Collection::Companies, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_one_returns_first_inserted() {
        let store = MemoryDocumentStore::new();
        let first = store
            .insert(Collection::Jobs, body(json!({ "id": 1, "title": "Dup" })))
            .await
            .unwrap();
        store
            .insert(Collection::Jobs, body(json!({ "id": 2, "title": "Dup" })))
            .await
            .unwrap();

        let found = store
            .find_one(Collection::Jobs, &Filter::equals("title", "Dup"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first);
    }

    #[tokio::test]
    async fn test_merge_sets_fields_and_keeps_others() {
        let store = MemoryDocumentStore::new();
        let id = store
            .insert(Collection::Industry, body(json!({ "id": 3, "name": "Energy" })))
            .await
            .unwrap();

        let updated = store
            .merge(Collection::Industry, id, body(json!({ "name": "Renewables", "size": 9 })))
            .await
            .unwrap();
        assert!(updated);

        let doc = store.get(Collection::Industry, id).await.unwrap().unwrap();
        assert_eq!(doc.body["id"], json!(3));
        assert_eq!(doc.body["name"], json!("Renewables"));
        assert_eq!(doc.body["size"], json!(9));

        let missing = store
            .merge(Collection::Industry, Uuid::new_v4(), Map::new())
            .await
            .unwrap();
        assert!(!missing);
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one() {
        let store = MemoryDocumentStore::new();
        let a = store.insert(Collection::Jobs, body(json!({ "id": 1 }))).await.unwrap();
        store.insert(Collection::Jobs, body(json!({ "id": 2 }))).await.unwrap();

        assert!(store.delete(Collection::Jobs, a).await.unwrap());
        assert!(!store.delete(Collection::Jobs, a).await.unwrap());
        assert_eq!(store.count(Collection::Jobs).await.unwrap(), 1);
    }
}
