//! Document store — pluggable, trait-based persistence for the three collections.
//!
//! Every document is a JSON object addressed by a store-assigned `Uuid`
//! (the internal identifier). Cross-entity lookups go through the
//! application-level `id` field inside the document, never the `Uuid`.
//!
//! `AppState` holds an `Arc<dyn DocumentStore>`, chosen at startup via config.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// The logical collections backing the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Jobs,
    Companies,
    Industry,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Jobs, Collection::Companies, Collection::Industry];

    /// Table name in Postgres; also the collection name in logs.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Jobs => "jobs",
            Collection::Companies => "companies",
            Collection::Industry => "industry",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("document in '{collection}' is not a JSON object")]
    NotAnObject { collection: &'static str },
}

/// A stored document together with its internal identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub body: Map<String, Value>,
}

impl Document {
    /// Renders the document for clients, exposing the internal identifier
    /// as an opaque `_id` string.
    pub fn into_json(self) -> Value {
        let mut body = self.body;
        body.insert("_id".to_string(), Value::String(self.id.to_string()));
        Value::Object(body)
    }
}

/// Selection criteria understood by every backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Top-level `field` equals `value`. Numbers compare numerically, so
    /// `5` matches `5.0`.
    Equals { field: &'static str, value: Value },
    /// The value at the nested `path` is a JSON number within the inclusive
    /// bounds. Strings and other non-numbers never match.
    IntRange {
        path: &'static [&'static str],
        min: Option<i64>,
        max: Option<i64>,
    },
}

impl Filter {
    pub fn equals(field: &'static str, value: impl Into<Value>) -> Self {
        Filter::Equals {
            field,
            value: value.into(),
        }
    }

    /// Evaluates the filter against a document body. Backends that cannot push
    /// the filter down to the database use this directly.
    pub fn matches(&self, body: &Map<String, Value>) -> bool {
        match self {
            Filter::Equals { field, value } => body
                .get(*field)
                .is_some_and(|found| json_values_equal(found, value)),
            Filter::IntRange { path, min, max } => {
                let Some(n) = lookup_path(body, path).and_then(Value::as_f64) else {
                    return false;
                };
                min.map_or(true, |lo| n >= lo as f64) && max.map_or(true, |hi| n <= hi as f64)
            }
        }
    }
}

fn lookup_path<'a>(body: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(body.get(*first)?, |current, key| current.get(*key))
}

fn json_values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

/// The store trait. Implement this to swap backends without touching the
/// handlers.
///
/// Writes are independent: no operation here spans more than one document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Looks up a document by internal identifier.
    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// First matching document in insertion order.
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError>;

    /// All matching documents in insertion order.
    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError>;

    /// Every document in the collection, in insertion order.
    async fn scan(&self, collection: Collection) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: Collection) -> Result<u64, StoreError>;

    /// Inserts a new document and returns its freshly assigned identifier.
    async fn insert(
        &self,
        collection: Collection,
        body: Map<String, Value>,
    ) -> Result<Uuid, StoreError>;

    /// Sets the given top-level fields on an existing document, leaving the
    /// others untouched. Returns `false` when no document has that id.
    async fn merge(
        &self,
        collection: Collection,
        id: Uuid,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError>;

    /// Removes a document. Returns `false` when no document has that id.
    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError>;

    /// Releases backend resources. Called once during shutdown.
    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_equals_compares_numbers_numerically() {
        let doc = body(json!({ "id": 5.0 }));
        assert!(Filter::equals("id", 5).matches(&doc));
        assert!(!Filter::equals("id", 6).matches(&doc));
    }

    #[test]
    fn test_equals_missing_field_never_matches() {
        let doc = body(json!({ "title": "Engineer" }));
        assert!(!Filter::equals("id", Value::Null).matches(&doc));
    }

    #[test]
    fn test_int_range_reads_nested_path() {
        const PATH: &[&str] = &["employment_details", "average_salary"];
        let filter = Filter::IntRange {
            path: PATH,
            min: Some(50_000),
            max: Some(100_000),
        };
        assert!(filter.matches(&body(json!({ "employment_details": { "average_salary": 75_000 } }))));
        assert!(filter.matches(&body(json!({ "employment_details": { "average_salary": 100_000 } }))));
        assert!(!filter.matches(&body(json!({ "employment_details": { "average_salary": 100_001 } }))));
        assert!(!filter.matches(&body(json!({ "employment_details": { "average_salary": "75000" } }))));
        assert!(!filter.matches(&body(json!({ "average_salary": 75_000 }))));
    }

    #[test]
    fn test_int_range_open_bounds() {
        const PATH: &[&str] = &["years_of_experience"];
        let at_most_two = Filter::IntRange {
            path: PATH,
            min: None,
            max: Some(2),
        };
        assert!(at_most_two.matches(&body(json!({ "years_of_experience": 0 }))));
        assert!(!at_most_two.matches(&body(json!({ "years_of_experience": 3 }))));
    }

    #[test]
    fn test_into_json_exposes_id_as_string() {
        let id = Uuid::new_v4();
        let doc = Document {
            id,
            body: body(json!({ "id": 1 })),
        };
        let rendered = doc.into_json();
        assert_eq!(rendered["_id"], json!(id.to_string()));
        assert_eq!(rendered["id"], json!(1));
    }
}
