//! In-memory CMS for tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::{Cms, Document, Predicate, QueryOptions, QueryResponse};
use crate::error::{Error, Result};

/// Documents held in memory, with scripted cursor pages
#[derive(Default)]
pub struct MemoryCms {
    documents: Mutex<Vec<Document>>,
    first_cursor: Mutex<Option<String>>,
    pages: Mutex<HashMap<String, serde_json::Value>>,
    requests: Mutex<Vec<String>>,
    failing: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MemoryCms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored documents
    pub fn set_documents(&self, documents: serde_json::Value) {
        *self.documents.lock().unwrap() = serde_json::from_value(documents).unwrap();
    }

    pub fn with_documents(self, documents: serde_json::Value) -> Self {
        self.set_documents(documents);
        self
    }

    /// Cursor returned with the first page of a query
    pub fn with_first_cursor(self, cursor: &str) -> Self {
        *self.first_cursor.lock().unwrap() = Some(cursor.to_string());
        self
    }

    /// Raw body served for a cursor URL
    pub fn with_page(self, cursor: &str, body: serde_json::Value) -> Self {
        self.pages.lock().unwrap().insert(cursor.to_string(), body);
        self
    }

    /// Make every call fail with a fetch error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Hold every call until the returned handle is notified
    pub fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    /// Log of calls received, e.g. `query`, `uid:hello`, `page:<url>`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    async fn enter(&self, request: String) -> Result<()> {
        self.requests.lock().unwrap().push(request);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Fetch("connection refused".to_string()));
        }
        Ok(())
    }

    fn matches(document: &Document, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::At { path, value } if path == "document.type" => {
                document.document_type.as_deref() == Some(value.as_str())
            }
            Predicate::At { path, value } if path.ends_with(".uid") => {
                document.uid.as_deref() == Some(value.as_str())
            }
            Predicate::At { .. } => false,
        }
    }
}

#[async_trait]
impl Cms for MemoryCms {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<QueryResponse> {
        self.enter("query".to_string()).await?;
        let results: Vec<Document> = self
            .documents
            .lock()
            .unwrap()
            .iter()
            .filter(|d| predicates.iter().all(|p| Self::matches(d, p)))
            .take(options.page_size)
            .cloned()
            .collect();
        Ok(QueryResponse {
            page: 1,
            next_page: self.first_cursor.lock().unwrap().clone(),
            results,
            ..QueryResponse::default()
        })
    }

    async fn get_by_uid(&self, document_type: &str, uid: &str) -> Result<Option<Document>> {
        self.enter(format!("uid:{}", uid)).await?;
        let uid_predicate = Predicate::uid(document_type, uid);
        let type_predicate = Predicate::document_type(document_type);
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .find(|d| Self::matches(d, &uid_predicate) && Self::matches(d, &type_predicate))
            .cloned())
    }

    async fn fetch_page(&self, url: &str) -> Result<QueryResponse> {
        self.enter(format!("page:{}", url)).await?;
        let body = self
            .pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Fetch(format!("404 for {}", url)))?;
        serde_json::from_value(body).map_err(|e| Error::Decode(e.to_string()))
    }
}
