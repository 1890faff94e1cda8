use crate::document::Connection;
use crate::error::Result;
use async_trait::async_trait;

/// Continuous feed of a connection's state. Carries an initial value on
/// subscribe and a new value after every successful remote mutation by either
/// party; `None` means the document was deleted.
pub type ConnectionFeed = tokio::sync::watch::Receiver<Option<Connection>>;

/// One logical collection per build variant.
pub fn collection_name(testing: bool) -> &'static str {
    if testing {
        "connections-testing"
    } else {
        "connections"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The code is already taken; the caller regenerates and retries.
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Stored,
    /// The document changed since the caller read it; re-read and retry.
    StaleVersion,
    /// The document no longer exists at all.
    Missing,
}

/// Abstract remote document collection keyed by connection code. There are no
/// partial-field updates: every write replaces the whole document, guarded by
/// the version the writer observed. On a successful put the store stamps the
/// document with `observed_version + 1`.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn get(&self, code: &str) -> Result<Option<Connection>>;

    /// Conditional create-if-absent, the uniqueness guarantee for fresh codes.
    async fn create(&self, document: Connection) -> Result<CreateOutcome>;

    /// Whole-document replace, rejected when `observed_version` is stale.
    async fn put(&self, document: Connection, observed_version: u64) -> Result<PutOutcome>;

    async fn delete(&self, code: &str) -> Result<()>;

    /// Codes of every currently-existing connection; used for existence
    /// checks.
    async fn list_codes(&self) -> Result<Vec<String>>;

    async fn subscribe(&self, code: &str) -> Result<ConnectionFeed>;
}
