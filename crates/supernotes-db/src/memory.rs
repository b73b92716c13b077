//! In-process document store.
//!
//! Backs offline use and tests. Server timestamps come from a monotonic clock:
//! every write gets a timestamp strictly greater than the previous one, so
//! `updatedAt` ordering is total even for writes in the same microsecond.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use supernotes_core::document::generate_id;
use supernotes_core::{
    Document, DocumentStore, Error, FieldValue, Fields, Query, Result, SortDirection,
};
use tokio::sync::RwLock;
use tracing::{debug, trace};

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Fields>>,
    last_write: Option<DateTime<Utc>>,
}

impl Inner {
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_write {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_write = Some(ts);
        ts
    }
}

/// Replace server-timestamp sentinels with `ts`.
fn resolve(fields: Fields, ts: DateTime<Utc>) -> Fields {
    fields
        .into_iter()
        .map(|(k, v)| match v {
            FieldValue::ServerTimestamp => (k, FieldValue::Timestamp(ts)),
            other => (k, other),
        })
        .collect()
}

/// Document store held in memory.
#[derive(Default)]
pub struct MemoryDocumentStore {
    inner: RwLock<Inner>,
    offline: AtomicBool,
    requests: AtomicU64,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing connectivity: while offline every call fails with
    /// `Error::Request`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of calls served (including failed ones).
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of documents in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.inner
            .read()
            .await
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }

    fn begin(&self) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Request("network unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add(&self, collection: &str, fields: Fields) -> Result<String> {
        self.begin()?;
        let mut inner = self.inner.write().await;
        let ts = inner.next_timestamp();
        let docs = inner.collections.entry(collection.to_string()).or_default();
        let mut id = generate_id();
        while docs.contains_key(&id) {
            id = generate_id();
        }
        docs.insert(id.clone(), resolve(fields, ts));
        trace!(collection, id = %id, "Document added");
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        self.begin()?;
        let mut inner = self.inner.write().await;
        let ts = inner.next_timestamp();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), resolve(fields, ts));
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.begin()?;
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        self.begin()?;
        let mut inner = self.inner.write().await;
        let exists = inner
            .collections
            .get(collection)
            .is_some_and(|docs| docs.contains_key(id));
        if !exists {
            return Err(Error::NotFound(format!("{}/{}", collection, id)));
        }
        let ts = inner.next_timestamp();
        if let Some(doc) = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        {
            for (key, value) in resolve(fields, ts) {
                if value == FieldValue::Null {
                    doc.remove(&key);
                } else {
                    doc.insert(key, value);
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.begin()?;
        let mut inner = self.inner.write().await;
        inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("{}/{}", collection, id)))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        self.begin()?;
        let inner = self.inner.read().await;
        let Some(docs) = inner.collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<Document> = docs
            .iter()
            .filter(|(_, fields)| query.matches(fields))
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .collect();

        if let Some((field, direction)) = &query.order_by {
            matched.retain(|doc| doc.get(field).is_some());
            matched.sort_by(|a, b| {
                let ord = match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) => x.compare(y).unwrap_or(std::cmp::Ordering::Equal),
                    _ => std::cmp::Ordering::Equal,
                };
                match direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        debug!(
            collection = %query.collection,
            result_count = matched.len(),
            "Memory query complete"
        );
        Ok(matched)
    }
}
