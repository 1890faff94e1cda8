use crate::document::Connection;
use crate::error::{ConnectionError, Result};
use crate::remote::{ConnectionFeed, ConnectionStore, CreateOutcome, PutOutcome};
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{watch, Mutex};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// File-backed document collection: the whole collection serialized as one
/// JSON object, re-read on every operation so that separate processes sharing
/// the file observe each other's writes. Snapshot feeds are driven by a
/// polling task per subscribed code.
///
/// Concurrent writers from different processes race exactly as the remote
/// document model allows: last full-document write wins.
pub struct JsonConnectionStore {
    path: PathBuf,
    poll_interval: Duration,
    // serializes this process's read-modify-write sections on the file
    write_lock: Mutex<()>,
    feeds: Mutex<HashMap<String, watch::Sender<Option<Connection>>>>,
}

impl JsonConnectionStore {
    /// `dir/<collection_name>.json` holds the collection.
    pub fn new(dir: impl AsRef<Path>, collection_name: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{collection_name}.json")),
            poll_interval: DEFAULT_POLL_INTERVAL,
            write_lock: Mutex::new(()),
            feeds: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn read_all(&self) -> Result<HashMap<String, Connection>> {
        read_collection(&self.path).await
    }

    async fn write_all(&self, documents: &HashMap<String, Connection>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| ConnectionError::Remote(err.to_string()))?;
        }
        let data = serde_json::to_string_pretty(documents)
            .map_err(|err| ConnectionError::Remote(err.to_string()))?;
        tokio::fs::write(&self.path, data)
            .await
            .map_err(|err| ConnectionError::Remote(err.to_string()))?;
        Ok(())
    }

    async fn notify(&self, code: &str, value: Option<Connection>) {
        let feeds = self.feeds.lock().await;
        if let Some(tx) = feeds.get(code) {
            tx.send_if_modified(|current| {
                if *current == value {
                    false
                } else {
                    *current = value.clone();
                    true
                }
            });
        }
    }
}

async fn read_collection(path: &Path) -> Result<HashMap<String, Connection>> {
    match tokio::fs::read_to_string(path).await {
        Ok(data) => {
            serde_json::from_str(&data).map_err(|err| ConnectionError::Remote(err.to_string()))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
        Err(err) => Err(ConnectionError::Remote(err.to_string())),
    }
}

#[async_trait]
impl ConnectionStore for JsonConnectionStore {
    async fn get(&self, code: &str) -> Result<Option<Connection>> {
        Ok(self.read_all().await?.remove(code))
    }

    async fn create(&self, document: Connection) -> Result<CreateOutcome> {
        let _guard = self.write_lock.lock().await;
        let mut documents = self.read_all().await?;
        if documents.contains_key(&document.id) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        let code = document.id.clone();
        documents.insert(code.clone(), document.clone());
        self.write_all(&documents).await?;
        self.notify(&code, Some(document)).await;
        Ok(CreateOutcome::Created)
    }

    async fn put(&self, mut document: Connection, observed_version: u64) -> Result<PutOutcome> {
        let _guard = self.write_lock.lock().await;
        let mut documents = self.read_all().await?;
        let Some(current) = documents.get(&document.id) else {
            return Ok(PutOutcome::Missing);
        };
        if current.version != observed_version {
            return Ok(PutOutcome::StaleVersion);
        }
        document.version = observed_version + 1;
        let code = document.id.clone();
        documents.insert(code.clone(), document.clone());
        self.write_all(&documents).await?;
        self.notify(&code, Some(document)).await;
        Ok(PutOutcome::Stored)
    }

    async fn delete(&self, code: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut documents = self.read_all().await?;
        if documents.remove(code).is_some() {
            self.write_all(&documents).await?;
        }
        self.notify(code, None).await;
        Ok(())
    }

    async fn list_codes(&self) -> Result<Vec<String>> {
        Ok(self.read_all().await?.into_keys().collect())
    }

    async fn subscribe(&self, code: &str) -> Result<ConnectionFeed> {
        let current = self.get(code).await?;
        let mut feeds = self.feeds.lock().await;
        match feeds.entry(code.to_string()) {
            Entry::Occupied(entry) => {
                let tx = entry.into_mut();
                if tx.is_closed() {
                    // the previous poller exited with its last receiver;
                    // refresh the value and start a new one
                    tx.send_replace(current);
                    spawn_poller(
                        self.path.clone(),
                        code.to_string(),
                        self.poll_interval,
                        tx.clone(),
                    );
                }
                Ok(tx.subscribe())
            }
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(current);
                spawn_poller(
                    self.path.clone(),
                    code.to_string(),
                    self.poll_interval,
                    tx.clone(),
                );
                entry.insert(tx);
                Ok(rx)
            }
        }
    }
}

/// Re-reads the collection on an interval and pushes changes into the feed,
/// so mutations from other processes surface too. Stops once every receiver
/// is gone.
fn spawn_poller(
    path: PathBuf,
    code: String,
    interval: Duration,
    tx: watch::Sender<Option<Connection>>,
) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            if tx.is_closed() {
                break;
            }
            let value = match read_collection(&path).await {
                Ok(mut documents) => documents.remove(&code),
                Err(err) => {
                    log::warn!("poll of {} failed: {err}", path.display());
                    continue;
                }
            };
            tx.send_if_modified(|current| {
                if *current == value {
                    false
                } else {
                    *current = value;
                    true
                }
            });
        }
        log::debug!("feed for {code} closed, stopping poller");
    });
}
