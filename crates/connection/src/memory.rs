use crate::document::Connection;
use crate::error::Result;
use crate::remote::{ConnectionFeed, ConnectionStore, CreateOutcome, PutOutcome};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{watch, Mutex};

#[derive(Default)]
struct Collection {
    documents: HashMap<String, Connection>,
    feeds: HashMap<String, watch::Sender<Option<Connection>>>,
}

impl Collection {
    fn notify(&mut self, code: &str) {
        if let Some(tx) = self.feeds.get(code) {
            let _ = tx.send(self.documents.get(code).cloned());
        }
    }
}

/// In-process document store with last-write-wins-per-document semantics and
/// one watch feed per code. Backs tests and the offline CLI mode; a real
/// deployment plugs a remote document-store client into the same trait.
pub struct MemoryConnectionStore {
    collection_name: &'static str,
    collection: Mutex<Collection>,
}

impl MemoryConnectionStore {
    pub fn new(collection_name: &'static str) -> Self {
        Self {
            collection_name,
            collection: Mutex::new(Collection::default()),
        }
    }

    pub fn collection_name(&self) -> &'static str {
        self.collection_name
    }
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
    async fn get(&self, code: &str) -> Result<Option<Connection>> {
        let collection = self.collection.lock().await;
        Ok(collection.documents.get(code).cloned())
    }

    async fn create(&self, document: Connection) -> Result<CreateOutcome> {
        let mut collection = self.collection.lock().await;
        if collection.documents.contains_key(&document.id) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        let code = document.id.clone();
        collection.documents.insert(code.clone(), document);
        collection.notify(&code);
        Ok(CreateOutcome::Created)
    }

    async fn put(&self, mut document: Connection, observed_version: u64) -> Result<PutOutcome> {
        let mut collection = self.collection.lock().await;
        let Some(current) = collection.documents.get(&document.id) else {
            return Ok(PutOutcome::Missing);
        };
        if current.version != observed_version {
            return Ok(PutOutcome::StaleVersion);
        }
        document.version = observed_version + 1;
        let code = document.id.clone();
        collection.documents.insert(code.clone(), document);
        collection.notify(&code);
        Ok(PutOutcome::Stored)
    }

    async fn delete(&self, code: &str) -> Result<()> {
        let mut collection = self.collection.lock().await;
        collection.documents.remove(code);
        collection.notify(code);
        Ok(())
    }

    async fn list_codes(&self) -> Result<Vec<String>> {
        let collection = self.collection.lock().await;
        Ok(collection.documents.keys().cloned().collect())
    }

    async fn subscribe(&self, code: &str) -> Result<ConnectionFeed> {
        let mut collection = self.collection.lock().await;
        let current = collection.documents.get(code).cloned();
        let tx = collection
            .feeds
            .entry(code.to_string())
            .or_insert_with(|| watch::channel(current).0);
        Ok(tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryConnectionStore;
    use crate::document::Connection;
    use crate::remote::{collection_name, ConnectionStore, CreateOutcome, PutOutcome};
    use namematch_model::PersonId;
    use pretty_assertions::assert_eq;

    fn doc(code: &str) -> Connection {
        Connection::new(code, PersonId::from("device-a"), Vec::new())
    }

    #[tokio::test]
    async fn create_is_conditional_on_absence() {
        let store = MemoryConnectionStore::new(collection_name(true));

        assert_eq!(
            store.create(doc("apple11111")).await.unwrap(),
            CreateOutcome::Created
        );
        assert_eq!(
            store.create(doc("apple11111")).await.unwrap(),
            CreateOutcome::AlreadyExists
        );
    }

    #[tokio::test]
    async fn put_rejects_stale_versions() {
        let store = MemoryConnectionStore::new(collection_name(true));
        store.create(doc("pine22222")).await.unwrap();

        let fresh = store.get("pine22222").await.unwrap().unwrap();
        assert_eq!(
            store.put(fresh.clone(), fresh.version).await.unwrap(),
            PutOutcome::Stored
        );
        // a second writer that still holds the old version loses
        assert_eq!(
            store.put(fresh.clone(), fresh.version).await.unwrap(),
            PutOutcome::StaleVersion
        );

        let stored = store.get("pine22222").await.unwrap().unwrap();
        assert_eq!(stored.version, fresh.version + 1);
    }

    #[tokio::test]
    async fn put_on_a_deleted_document_reports_missing() {
        let store = MemoryConnectionStore::new(collection_name(true));
        store.create(doc("fern33333")).await.unwrap();
        let fresh = store.get("fern33333").await.unwrap().unwrap();

        store.delete("fern33333").await.unwrap();

        assert_eq!(
            store.put(fresh, 0).await.unwrap(),
            PutOutcome::Missing
        );
    }

    #[tokio::test]
    async fn subscription_emits_initial_and_updates_and_deletion() {
        let store = MemoryConnectionStore::new(collection_name(true));
        store.create(doc("wren44444")).await.unwrap();

        let mut feed = store.subscribe("wren44444").await.unwrap();
        assert!(feed.borrow_and_update().is_some());

        let fresh = store.get("wren44444").await.unwrap().unwrap();
        store.put(fresh.clone(), fresh.version).await.unwrap();
        feed.changed().await.unwrap();
        assert_eq!(feed.borrow_and_update().as_ref().unwrap().version, 1);

        store.delete("wren44444").await.unwrap();
        feed.changed().await.unwrap();
        assert!(feed.borrow_and_update().is_none());
    }

    #[tokio::test]
    async fn list_codes_tracks_live_documents() {
        let store = MemoryConnectionStore::new(collection_name(true));
        store.create(doc("sage55555")).await.unwrap();
        store.create(doc("reed66666")).await.unwrap();
        store.delete("sage55555").await.unwrap();

        let mut codes = store.list_codes().await.unwrap();
        codes.sort();
        assert_eq!(codes, vec!["reed66666"]);
    }
}
