// Document Service
// Accepts documents, runs them in the background and hands out their results

use crate::store::ResultStore;

use hyperion_engine::{
    DocumentExecutor, DocumentParameters, DocumentReader, DocumentResult, DEFAULT_TIMEOUT,
};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Asynchronous document submission
#[derive(Clone)]
pub struct DocumentService {
    executor: DocumentExecutor,
    store: ResultStore,
}

impl DocumentService {
    pub fn new(executor: DocumentExecutor) -> Self {
        Self {
            executor,
            store: ResultStore::new(),
        }
    }

    /// Start running `document` and return its id immediately.
    ///
    /// A document that cannot be read is stored as a failed result without running anything.
    pub fn submit(
        &self,
        document: Vec<u8>,
        tags: BTreeSet<String>,
        timeout_minutes: Option<u64>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let parameters = match timeout_minutes {
            Some(minutes) => DocumentParameters::new(tags, minutes),
            None => DocumentParameters::new(tags, 0).with_timeout(DEFAULT_TIMEOUT),
        };

        let executor = self.executor.clone();
        let store = self.store.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            let result = match DocumentReader::read_slice(&document) {
                Ok(document) => executor.execute(&document, &parameters).await,
                Err(e) => {
                    tracing::error!(id = %task_id, "cannot read document: {}", e);
                    DocumentResult::failed()
                }
            };
            tracing::info!(id = %task_id, success = result.success, "document finished");
            store.insert(task_id, result).await;
        });

        tracing::info!(id = %id, "document submitted");
        id
    }

    /// Result of a finished document; None while running, unknown or already collected
    pub async fn query(&self, id: &str) -> Option<DocumentResult> {
        self.store.take(id).await
    }
}
