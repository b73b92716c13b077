//! Firestore REST v1 document store.
//!
//! Writes go through `:commit` so that server timestamps can be applied as
//! field transforms in the same write. Queries go through `:runQuery`.
//! Every request carries the signed-in identity's ID token as a bearer token.

pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use supernotes_core::document::generate_id;
use supernotes_core::{Document, DocumentStore, Error, Fields, Query, Result, TokenProvider};
use tracing::{debug, error, instrument};

use crate::config::FirebaseConfig;
use crate::error::{map_status, GoogleError};
use types::{
    build_write, structured_query, CommitRequest, RunQueryRequest, RunQueryResponseItem,
    WireDocument, WriteMode,
};

/// [`DocumentStore`] over the Firestore REST API.
pub struct FirestoreStore {
    client: Client,
    config: FirebaseConfig,
    tokens: Arc<dyn TokenProvider>,
}

impl FirestoreStore {
    pub fn new(config: FirebaseConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        debug!(
            project_id = %config.project_id,
            database = %config.database,
            "Initializing Firestore store"
        );
        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    /// `projects/{p}/databases/{d}/documents`
    fn documents_path(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.config.project_id, self.config.database
        )
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.firestore_base_url.trim_end_matches('/'),
            self.documents_path()
        )
    }

    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_path(), collection, id)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_url(), collection, id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send and turn any non-success status into a mapped error.
    async fn send(&self, op: &'static str, request: RequestBuilder) -> Result<Response> {
        let response = self.authorize(request).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let err = map_status(status, GoogleError::from_body(status, &body));
        if status != StatusCode::NOT_FOUND {
            error!(
                subsystem = "gateway",
                component = "firestore",
                op,
                http_status = status.as_u16(),
                error = %err,
                "Firestore request failed"
            );
        }
        Err(err)
    }

    async fn commit(
        &self,
        op: &'static str,
        name: String,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<()> {
        let body = CommitRequest {
            writes: vec![build_write(name, fields, mode)],
        };
        let url = format!("{}:commit", self.documents_url());
        self.send(op, self.client.post(url).json(&body)).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip(self, fields), fields(subsystem = "gateway", component = "firestore", op = "add"))]
    async fn add(&self, collection: &str, fields: Fields) -> Result<String> {
        let start = Instant::now();
        let id = generate_id();
        self.commit("add", self.document_name(collection, &id), fields, WriteMode::Create)
            .await?;
        debug!(
            collection,
            id = %id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Document added"
        );
        Ok(id)
    }

    #[instrument(skip(self, fields), fields(subsystem = "gateway", component = "firestore", op = "set"))]
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let start = Instant::now();
        self.commit("set", self.document_name(collection, id), fields, WriteMode::Replace)
            .await?;
        debug!(
            collection,
            duration_ms = start.elapsed().as_millis() as u64,
            "Document set"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "gateway", component = "firestore", op = "get"))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let start = Instant::now();
        let request = self.client.get(self.document_url(collection, id));
        let response = match self.send("get", request).await {
            Ok(response) => response,
            Err(Error::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let doc: WireDocument = response.json().await?;
        debug!(
            collection,
            duration_ms = start.elapsed().as_millis() as u64,
            "Document fetched"
        );
        Ok(Some(doc.into_document()))
    }

    #[instrument(skip(self, fields), fields(subsystem = "gateway", component = "firestore", op = "update"))]
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let start = Instant::now();
        self.commit("update", self.document_name(collection, id), fields, WriteMode::Merge)
            .await?;
        debug!(
            collection,
            duration_ms = start.elapsed().as_millis() as u64,
            "Document updated"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "gateway", component = "firestore", op = "delete"))]
    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let start = Instant::now();
        let request = self
            .client
            .delete(self.document_url(collection, id))
            .query(&[("currentDocument.exists", "true")]);
        self.send("delete", request).await?;
        debug!(
            collection,
            duration_ms = start.elapsed().as_millis() as u64,
            "Document deleted"
        );
        Ok(())
    }

    #[instrument(skip(self, query), fields(subsystem = "gateway", component = "firestore", op = "query", collection = %query.collection))]
    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        let start = Instant::now();
        let body = RunQueryRequest {
            structured_query: structured_query(query)?,
        };
        let url = format!("{}:runQuery", self.documents_url());
        let items: Vec<RunQueryResponseItem> =
            self.send("query", self.client.post(url).json(&body)).await?.json().await?;
        let docs: Vec<Document> = items
            .into_iter()
            .filter_map(|item| item.document)
            .map(WireDocument::into_document)
            .collect();
        debug!(
            result_count = docs.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Query complete"
        );
        Ok(docs)
    }
}
