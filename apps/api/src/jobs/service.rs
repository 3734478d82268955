use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::jobs::models::coerce_salary;
use crate::store::{Collection, Document, DocumentStore, Filter, StoreError};

pub const SALARY_PATH: &[&str] = &["employment_details", "average_salary"];

/// Updates the record whose application-level `id` matches, or inserts it.
/// Records without an `id` are skipped and yield `None`.
pub async fn upsert_by_app_id(
    store: &dyn DocumentStore,
    collection: Collection,
    record: Map<String, Value>,
) -> Result<Option<Uuid>, StoreError> {
    let Some(app_id) = record.get("id").cloned() else {
        return Ok(None);
    };

    let filter = Filter::Equals {
        field: "id",
        value: app_id.clone(),
    };
    let id = match store.find_one(collection, &filter).await? {
        Some(existing) => {
            store.merge(collection, existing.id, record).await?;
            debug!("Updated {} record with id {app_id}", collection.name());
            existing.id
        }
        None => {
            let id = store.insert(collection, record).await?;
            debug!("Inserted {} record with id {app_id}", collection.name());
            id
        }
    };
    Ok(Some(id))
}

/// Rewrites every job whose `employment_details.average_salary` is stored as
/// a string or float into an integer, in place. Values that cannot be
/// coerced are left untouched. Running it twice changes nothing the second
/// time.
///
/// This scans the whole jobs collection on every call.
pub async fn normalize_salaries(store: &dyn DocumentStore) -> Result<usize, StoreError> {
    let mut coerced = 0;
    for doc in store.scan(Collection::Jobs).await? {
        let Some(Value::Object(details)) = doc.body.get(SALARY_PATH[0]) else {
            continue;
        };
        let Some(salary) = details.get(SALARY_PATH[1]).and_then(coerce_salary) else {
            continue;
        };

        let mut details = details.clone();
        details.insert(SALARY_PATH[1].to_string(), Value::from(salary));
        let mut fields = Map::new();
        fields.insert(SALARY_PATH[0].to_string(), Value::Object(details));

        if store.merge(Collection::Jobs, doc.id, fields).await? {
            coerced += 1;
        }
    }

    if coerced > 0 {
        info!("Normalized average_salary on {coerced} job(s)");
    }
    Ok(coerced)
}

/// Renders a job and embeds the industry and company it references, when
/// those can be resolved by application-level id.
pub async fn with_references(
    store: &dyn DocumentStore,
    job: Document,
) -> Result<Value, StoreError> {
    let industry = resolve(store, Collection::Industry, job.body.get("industry_id")).await?;
    let company = resolve(store, Collection::Companies, job.body.get("company_id")).await?;

    let mut rendered = job.into_json();
    if let Value::Object(map) = &mut rendered {
        if let Some(industry) = industry {
            map.insert("industry".to_string(), industry.into_json());
        }
        if let Some(company) = company {
            map.insert("company".to_string(), company.into_json());
        }
    }
    Ok(rendered)
}

async fn resolve(
    store: &dyn DocumentStore,
    collection: Collection,
    app_id: Option<&Value>,
) -> Result<Option<Document>, StoreError> {
    match app_id {
        Some(app_id) => {
            let filter = Filter::Equals {
                field: "id",
                value: app_id.clone(),
            };
            store.find_one(collection, &filter).await
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let store = MemoryDocumentStore::new();
        let first = upsert_by_app_id(&store, Collection::Companies, body(json!({ "id": 1, "name": "Acme" })))
            .await
            .unwrap()
            .unwrap();
        let second = upsert_by_app_id(&store, Collection::Companies, body(json!({ "id": 1, "size": 50 })))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count(Collection::Companies).await.unwrap(), 1);
        let doc = store.get(Collection::Companies, first).await.unwrap().unwrap();
        assert_eq!(doc.body["name"], json!("Acme"));
        assert_eq!(doc.body["size"], json!(50));
    }

    #[tokio::test]
    async fn test_upsert_without_id_is_skipped() {
        let store = MemoryDocumentStore::new();
        let result = upsert_by_app_id(&store, Collection::Industry, body(json!({ "name": "Energy" })))
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(store.count(Collection::Industry).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_normalize_salaries_is_idempotent() {
        let store = MemoryDocumentStore::new();
        let stringy = store
            .insert(
                Collection::Jobs,
                body(json!({ "id": 1, "employment_details": { "average_salary": "75000", "remote": true } })),
            )
            .await
            .unwrap();
        store
            .insert(Collection::Jobs, body(json!({ "id": 2, "employment_details": { "average_salary": 60000.5 } })))
            .await
            .unwrap();
        store
            .insert(Collection::Jobs, body(json!({ "id": 3, "employment_details": { "average_salary": "n/a" } })))
            .await
            .unwrap();
        store
            .insert(Collection::Jobs, body(json!({ "id": 4, "average_salary": "90000" })))
            .await
            .unwrap();

        assert_eq!(normalize_salaries(&store).await.unwrap(), 2);
        assert_eq!(normalize_salaries(&store).await.unwrap(), 0);

        let doc = store.get(Collection::Jobs, stringy).await.unwrap().unwrap();
        assert_eq!(doc.body["employment_details"]["average_salary"], json!(75000));
        assert_eq!(doc.body["employment_details"]["remote"], json!(true));
    }

    #[tokio::test]
    async fn test_with_references_embeds_resolved_records_only() {
        let store = MemoryDocumentStore::new();
        store
            .insert(Collection::Industry, body(json!({ "id": 10, "name": "Health" })))
            .await
            .unwrap();
        let job_id = store
            .insert(Collection::Jobs, body(json!({ "id": 1, "industry_id": 10, "company_id": 99 })))
            .await
            .unwrap();

        let job = store.get(Collection::Jobs, job_id).await.unwrap().unwrap();
        let rendered = with_references(&store, job).await.unwrap();

        assert_eq!(rendered["_id"], json!(job_id.to_string()));
        assert_eq!(rendered["industry"]["name"], json!("Health"));
        assert!(rendered["industry"]["_id"].is_string());
        assert!(rendered.get("company").is_none());
    }
}
