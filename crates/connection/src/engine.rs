use crate::claim::LikedClaim;
use crate::code::{generate_code, now_epoch_millis};
use crate::document::Connection;
use crate::error::{ConnectionError, Result};
use crate::remote::{ConnectionFeed, ConnectionStore, CreateOutcome, PutOutcome};
use namematch_model::FailureReporter;
use namematch_store::{Preferences, PreferencesExt, SeenStore};
use std::sync::Arc;
use std::time::Duration;

/// Remote existence checks give up after this long and treat the code as
/// unknown.
pub const DEFAULT_EXISTENCE_TIMEOUT: Duration = Duration::from_millis(10_000);

const MAX_WRITE_ATTEMPTS: u32 = 5;
const MAX_CODE_ATTEMPTS: u32 = 16;

/// Everything the engine talks to, passed in explicitly at construction.
pub struct ConnectionDeps {
    pub remote: Arc<dyn ConnectionStore>,
    pub seen: Arc<dyn SeenStore>,
    pub prefs: Arc<dyn Preferences>,
    pub reporter: Arc<dyn FailureReporter>,
}

/// Result of a join attempt. The two failure shapes are expected business
/// outcomes, not errors, and mutate nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    Joined(Connection),
    CodeDoesNotExist,
    AlreadyHasPartner,
}

/// This device's relationship to its last-known connection.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkState {
    NoConnection,
    AwaitingPartner(Connection),
    Connected(Connection),
    /// The pointer referenced a connection that no longer exists remotely;
    /// the pointer has been cleared.
    Dissolved,
}

/// Owns the two-party connection lifecycle: create, join, like propagation,
/// reconciliation, read tracking, deletion, and the update feed. Every remote
/// mutation is a whole-document read-modify-write retried on version
/// conflicts.
pub struct ConnectionEngine {
    remote: Arc<dyn ConnectionStore>,
    seen: Arc<dyn SeenStore>,
    prefs: Arc<dyn Preferences>,
    reporter: Arc<dyn FailureReporter>,
    existence_timeout: Duration,
}

impl ConnectionEngine {
    pub fn new(deps: ConnectionDeps) -> Self {
        Self {
            remote: deps.remote,
            seen: deps.seen,
            prefs: deps.prefs,
            reporter: deps.reporter,
            existence_timeout: DEFAULT_EXISTENCE_TIMEOUT,
        }
    }

    pub fn with_existence_timeout(mut self, timeout: Duration) -> Self {
        self.existence_timeout = timeout;
        self
    }

    /// Create a fresh connection with this device as person one and its
    /// liked history snapshotted in. Conditional create keeps generated codes
    /// unique without a list-then-create window.
    pub async fn create(&self) -> Result<Connection> {
        let user = self.prefs.user_id().await?;
        let likes = self.liked_snapshot().await?;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_code(&mut rand::thread_rng(), now_epoch_millis());
            let document = Connection::new(code.clone(), user.clone(), likes.clone());
            match self.remote.create(document.clone()).await? {
                CreateOutcome::Created => {
                    self.prefs.set_last_known_connection(&code).await?;
                    log::info!("created connection {code}");
                    return Ok(document);
                }
                CreateOutcome::AlreadyExists => {
                    log::debug!("connection code {code} collided, regenerating");
                }
            }
        }

        Err(ConnectionError::Remote(format!(
            "could not allocate a unique connection code in {MAX_CODE_ATTEMPTS} attempts"
        )))
    }

    /// Join an existing connection as person two, snapshotting this device's
    /// liked history and reconciling immediately.
    pub async fn join(&self, code: &str) -> Result<JoinOutcome> {
        if !self.exists(code).await {
            return Ok(JoinOutcome::CodeDoesNotExist);
        }

        let user = self.prefs.user_id().await?;
        let likes = self.liked_snapshot().await?;
        let mut taken = false;

        let result = self
            .read_modify_write(code, |document| {
                taken = document.person_two.is_some();
                if taken {
                    return false;
                }
                document.join(user.clone(), likes.clone());
                true
            })
            .await;

        match result {
            Ok(_) if taken => Ok(JoinOutcome::AlreadyHasPartner),
            Ok(document) => {
                self.prefs.set_last_known_connection(code).await?;
                log::info!("joined connection {code}");
                Ok(JoinOutcome::Joined(document))
            }
            Err(ConnectionError::NotFound) => Ok(JoinOutcome::CodeDoesNotExist),
            Err(err) => Err(err),
        }
    }

    /// Record a swipe decision locally and, when it is a like and a
    /// connection is active, propagate the claim and reconcile.
    pub async fn record_swipe(&self, name: &str, gender_code: &str, liked: bool) -> Result<()> {
        self.seen.insert(name, gender_code, liked).await?;
        if !liked {
            return Ok(());
        }

        let Some(code) = self.prefs.last_known_connection().await? else {
            return Ok(());
        };
        if !self.exists(&code).await {
            return Ok(());
        }

        let user = self.prefs.user_id().await?;
        let result = self
            .read_modify_write(&code, |document| {
                let Some(side) = document.side_of(&user) else {
                    log::warn!("identity matches neither side of {code}; skipping propagation");
                    return false;
                };
                if !document.add_like(side, name, gender_code) {
                    return false;
                }
                document.reconcile();
                true
            })
            .await;

        self.discard_not_found(result)
    }

    /// Reverse a prior decision: flip the local row, then toggle the claim on
    /// the active connection and reconcile.
    pub async fn reverse_decision(
        &self,
        name: &str,
        gender_code: &str,
        now_liked: bool,
    ) -> Result<()> {
        self.seen.set_liked(name, gender_code, now_liked).await?;

        let Some(code) = self.prefs.last_known_connection().await? else {
            return Ok(());
        };
        if !self.exists(&code).await {
            return Ok(());
        }

        let user = self.prefs.user_id().await?;
        let result = self
            .read_modify_write(&code, |document| {
                let Some(side) = document.side_of(&user) else {
                    log::warn!("identity matches neither side of {code}; skipping propagation");
                    return false;
                };
                document.toggle_like(side, name, gender_code);
                document.reconcile();
                true
            })
            .await;

        self.discard_not_found(result)
    }

    /// Flip the caller's own ack flag across all matched claims.
    pub async fn mark_matched_read(&self, code: &str) -> Result<()> {
        let user = self.prefs.user_id().await?;
        let result = self
            .read_modify_write(code, |document| {
                let Some(side) = document.side_of(&user) else {
                    log::warn!("identity matches neither side of {code}; skipping mark-read");
                    return false;
                };
                document.mark_matched_read(side);
                true
            })
            .await;

        self.discard_not_found(result)
    }

    /// Delete the remote record and clear only this device's pointer. The
    /// partner observes the absence through its feed and clears its own.
    pub async fn delete(&self, code: &str) -> Result<()> {
        self.prefs.clear_last_known_connection().await?;
        self.remote.delete(code).await?;
        log::info!("deleted connection {code}");
        Ok(())
    }

    /// This device's relationship to its last-known connection. A dangling
    /// pointer (record deleted by the partner) is cleared here.
    pub async fn link_state(&self) -> Result<LinkState> {
        let Some(code) = self.prefs.last_known_connection().await? else {
            return Ok(LinkState::NoConnection);
        };
        match self.remote.get(&code).await? {
            Some(document) if document.person_two.is_some() => {
                Ok(LinkState::Connected(document))
            }
            Some(document) => Ok(LinkState::AwaitingPartner(document)),
            None => {
                log::info!("connection {code} no longer exists, clearing local pointer");
                self.prefs.clear_last_known_connection().await?;
                Ok(LinkState::Dissolved)
            }
        }
    }

    /// Continuous feed of the connection's state: an initial value, then one
    /// per successful mutation by either party.
    pub async fn updates(&self, code: &str) -> Result<ConnectionFeed> {
        if !self.exists(code).await {
            return Err(ConnectionError::NotFound);
        }
        self.remote.subscribe(code).await
    }

    async fn liked_snapshot(&self) -> Result<Vec<LikedClaim>> {
        Ok(self
            .seen
            .liked_history()
            .await?
            .into_iter()
            .map(|row| LikedClaim::new(row.name, row.gender_code))
            .collect())
    }

    /// Existence check against the remote listing, bounded by the configured
    /// timeout. Timeouts and transport failures are recorded and treated as
    /// "does not exist / unknown".
    async fn exists(&self, code: &str) -> bool {
        match tokio::time::timeout(self.existence_timeout, self.remote.list_codes()).await {
            Ok(Ok(codes)) => codes.iter().any(|existing| existing == code),
            Ok(Err(err)) => {
                self.reporter.record("connection existence check", &err);
                false
            }
            Err(_) => {
                log::warn!(
                    "existence check for {code} timed out after {:?}",
                    self.existence_timeout
                );
                self.reporter
                    .record("connection existence check", &ConnectionError::RemoteTimeout);
                false
            }
        }
    }

    /// Whole-document read-modify-write. `mutate` returns false to stop
    /// without writing; stale writes are re-read and retried.
    async fn read_modify_write<F>(&self, code: &str, mut mutate: F) -> Result<Connection>
    where
        F: FnMut(&mut Connection) -> bool,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let Some(mut document) = self.remote.get(code).await? else {
                return Err(ConnectionError::NotFound);
            };
            let observed = document.version;

            if !mutate(&mut document) {
                return Ok(document);
            }

            match self.remote.put(document.clone(), observed).await? {
                PutOutcome::Stored => {
                    document.version = observed + 1;
                    return Ok(document);
                }
                PutOutcome::StaleVersion => {
                    log::debug!("stale write on {code} (attempt {attempt}), retrying");
                }
                PutOutcome::Missing => return Err(ConnectionError::NotFound),
            }
        }

        Err(ConnectionError::Conflict(MAX_WRITE_ATTEMPTS))
    }

    /// A connection that vanished mid-operation is an expected outcome for
    /// propagation paths, not a failure.
    fn discard_not_found(&self, result: Result<Connection>) -> Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(ConnectionError::NotFound) => {
                log::debug!("connection disappeared during propagation");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// At most one live feed per logical screen/session. Starting a new
/// read-then-subscribe drops the previous feed first, so duplicate or stale
/// emissions never reach the same downstream state.
#[derive(Default)]
pub struct WatchSession {
    feed: Option<ConnectionFeed>,
}

impl WatchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn start(
        &mut self,
        engine: &ConnectionEngine,
        code: &str,
    ) -> Result<&mut ConnectionFeed> {
        self.feed = None;
        let feed = engine.updates(code).await?;
        Ok(self.feed.insert(feed))
    }

    pub fn current(&mut self) -> Option<&mut ConnectionFeed> {
        self.feed.as_mut()
    }

    pub fn stop(&mut self) {
        self.feed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionDeps, ConnectionEngine, JoinOutcome, LinkState};
    use crate::document::Connection;
    use crate::error::Result;
    use crate::memory::MemoryConnectionStore;
    use crate::remote::{collection_name, ConnectionFeed, ConnectionStore, CreateOutcome, PutOutcome};
    use async_trait::async_trait;
    use namematch_model::LogReporter;
    use namematch_store::{JsonPreferences, JsonSeenStore, PreferencesExt, SeenStore};
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn device(
        dir: &Path,
        label: &str,
        remote: Arc<dyn ConnectionStore>,
    ) -> (ConnectionEngine, Arc<JsonPreferences>, Arc<JsonSeenStore>) {
        let seen = Arc::new(
            JsonSeenStore::open(dir.join(format!("{label}-seen.json")))
                .await
                .unwrap(),
        );
        let prefs = Arc::new(
            JsonPreferences::open(dir.join(format!("{label}-prefs.json")))
                .await
                .unwrap(),
        );
        let engine = ConnectionEngine::new(ConnectionDeps {
            remote,
            seen: seen.clone(),
            prefs: prefs.clone(),
            reporter: Arc::new(LogReporter),
        });
        (engine, prefs, seen)
    }

    #[tokio::test]
    async fn create_snapshots_liked_history() {
        let temp = tempdir().unwrap();
        let remote = Arc::new(MemoryConnectionStore::new(collection_name(true)));
        let (engine, prefs, seen) = device(temp.path(), "a", remote.clone()).await;

        seen.insert("Ava", "F", true).await.unwrap();
        seen.insert("Max", "M", false).await.unwrap();

        let connection = engine.create().await.unwrap();

        assert_eq!(connection.person_one_liked.len(), 1);
        assert_eq!(connection.person_one_liked[0].name, "Ava");
        assert_eq!(
            prefs.last_known_connection().await.unwrap(),
            Some(connection.id.clone())
        );
        assert!(remote.get(&connection.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn join_unknown_code_is_a_value_not_an_error() {
        let temp = tempdir().unwrap();
        let remote = Arc::new(MemoryConnectionStore::new(collection_name(true)));
        let (engine, prefs, _) = device(temp.path(), "b", remote).await;

        let outcome = engine.join("ghost00000").await.unwrap();

        assert_eq!(outcome, JoinOutcome::CodeDoesNotExist);
        assert_eq!(prefs.last_known_connection().await.unwrap(), None);
    }

    #[tokio::test]
    async fn join_full_connection_mutates_nothing() {
        let temp = tempdir().unwrap();
        let remote = Arc::new(MemoryConnectionStore::new(collection_name(true)));
        let (a, _, _) = device(temp.path(), "a", remote.clone()).await;
        let (b, _, _) = device(temp.path(), "b", remote.clone()).await;
        let (c, c_prefs, _) = device(temp.path(), "c", remote.clone()).await;

        let code = a.create().await.unwrap().id;
        assert!(matches!(b.join(&code).await.unwrap(), JoinOutcome::Joined(_)));

        let before = remote.get(&code).await.unwrap().unwrap();
        let outcome = c.join(&code).await.unwrap();

        assert_eq!(outcome, JoinOutcome::AlreadyHasPartner);
        assert_eq!(remote.get(&code).await.unwrap().unwrap(), before);
        assert_eq!(c_prefs.last_known_connection().await.unwrap(), None);
    }

    #[tokio::test]
    async fn swipes_propagate_and_reconcile() {
        let temp = tempdir().unwrap();
        let remote = Arc::new(MemoryConnectionStore::new(collection_name(true)));
        let (a, _, _) = device(temp.path(), "a", remote.clone()).await;
        let (b, _, _) = device(temp.path(), "b", remote.clone()).await;

        let code = a.create().await.unwrap().id;
        b.join(&code).await.unwrap();

        a.record_swipe("Noah", "M", true).await.unwrap();
        a.record_swipe("Ivy", "F", true).await.unwrap();
        a.record_swipe("Rex", "M", false).await.unwrap();
        b.record_swipe("Noah", "M", true).await.unwrap();

        let document = remote.get(&code).await.unwrap().unwrap();
        assert_eq!(document.matched.len(), 1);
        assert_eq!(document.matched[0].name, "Noah");
        let one: Vec<&str> = document.person_one_liked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(one, vec!["Ivy"]);
        assert!(document.person_two_liked.is_empty());
    }

    #[tokio::test]
    async fn foreign_identity_is_a_silent_noop() {
        let temp = tempdir().unwrap();
        let remote = Arc::new(MemoryConnectionStore::new(collection_name(true)));
        let (a, _, _) = device(temp.path(), "a", remote.clone()).await;
        let (stranger, stranger_prefs, _) = device(temp.path(), "s", remote.clone()).await;

        let code = a.create().await.unwrap().id;
        // a stale pointer to someone else's connection
        stranger_prefs.set_last_known_connection(&code).await.unwrap();

        let before = remote.get(&code).await.unwrap().unwrap();
        stranger.record_swipe("Ava", "F", true).await.unwrap();
        let after = remote.get(&code).await.unwrap().unwrap();

        assert_eq!(before, after);
        assert_eq!(before.version, after.version);
    }

    #[tokio::test]
    async fn reverse_decision_breaks_a_match() {
        let temp = tempdir().unwrap();
        let remote = Arc::new(MemoryConnectionStore::new(collection_name(true)));
        let (a, _, a_seen) = device(temp.path(), "a", remote.clone()).await;
        let (b, _, b_seen) = device(temp.path(), "b", remote.clone()).await;

        a_seen.insert("Noah", "M", true).await.unwrap();
        b_seen.insert("Noah", "M", true).await.unwrap();
        let code = a.create().await.unwrap().id;
        b.join(&code).await.unwrap();
        assert_eq!(remote.get(&code).await.unwrap().unwrap().matched.len(), 1);

        a.reverse_decision("Noah", "M", false).await.unwrap();

        let document = remote.get(&code).await.unwrap().unwrap();
        assert!(document.matched.is_empty());
        assert!(document.person_one_liked.is_empty());
        // B still likes Noah, so the claim is pending on B's side again
        assert_eq!(document.person_two_liked.len(), 1);
        assert_eq!(document.person_two_liked[0].name, "Noah");
    }

    #[tokio::test]
    async fn mark_read_touches_only_the_callers_flag() {
        let temp = tempdir().unwrap();
        let remote = Arc::new(MemoryConnectionStore::new(collection_name(true)));
        let (a, _, a_seen) = device(temp.path(), "a", remote.clone()).await;
        let (b, _, b_seen) = device(temp.path(), "b", remote.clone()).await;

        a_seen.insert("Noah", "M", true).await.unwrap();
        b_seen.insert("Noah", "M", true).await.unwrap();
        let code = a.create().await.unwrap().id;
        b.join(&code).await.unwrap();

        a.mark_matched_read(&code).await.unwrap();

        let document = remote.get(&code).await.unwrap().unwrap();
        assert!(document.matched.iter().all(|c| c.person_one_acked));
        assert!(document.matched.iter().all(|c| !c.person_two_acked));
    }

    #[tokio::test]
    async fn delete_clears_only_the_callers_pointer() {
        let temp = tempdir().unwrap();
        let remote = Arc::new(MemoryConnectionStore::new(collection_name(true)));
        let (a, a_prefs, _) = device(temp.path(), "a", remote.clone()).await;
        let (b, b_prefs, _) = device(temp.path(), "b", remote.clone()).await;

        let code = a.create().await.unwrap().id;
        b.join(&code).await.unwrap();

        a.delete(&code).await.unwrap();

        assert_eq!(a_prefs.last_known_connection().await.unwrap(), None);
        assert_eq!(b_prefs.last_known_connection().await.unwrap(), Some(code.clone()));

        // the partner discovers the deletion on its next sync and resets
        assert_eq!(b.link_state().await.unwrap(), LinkState::Dissolved);
        assert_eq!(b_prefs.last_known_connection().await.unwrap(), None);
        assert_eq!(b.link_state().await.unwrap(), LinkState::NoConnection);
    }

    #[tokio::test]
    async fn link_state_tracks_the_lifecycle() {
        let temp = tempdir().unwrap();
        let remote = Arc::new(MemoryConnectionStore::new(collection_name(true)));
        let (a, _, _) = device(temp.path(), "a", remote.clone()).await;
        let (b, _, _) = device(temp.path(), "b", remote.clone()).await;

        assert_eq!(a.link_state().await.unwrap(), LinkState::NoConnection);

        let code = a.create().await.unwrap().id;
        assert!(matches!(a.link_state().await.unwrap(), LinkState::AwaitingPartner(_)));

        b.join(&code).await.unwrap();
        assert!(matches!(a.link_state().await.unwrap(), LinkState::Connected(_)));
    }

    struct StalledStore;

    #[async_trait]
    impl ConnectionStore for StalledStore {
        async fn get(&self, _code: &str) -> Result<Option<Connection>> {
            Ok(None)
        }
        async fn create(&self, _document: Connection) -> Result<CreateOutcome> {
            Ok(CreateOutcome::Created)
        }
        async fn put(&self, _document: Connection, _observed: u64) -> Result<PutOutcome> {
            Ok(PutOutcome::Missing)
        }
        async fn delete(&self, _code: &str) -> Result<()> {
            Ok(())
        }
        async fn list_codes(&self) -> Result<Vec<String>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
        async fn subscribe(&self, _code: &str) -> Result<ConnectionFeed> {
            Ok(tokio::sync::watch::channel(None).1)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn existence_timeout_reads_as_unknown_code() {
        let temp = tempdir().unwrap();
        let (engine, _, _) = device(temp.path(), "t", Arc::new(StalledStore)).await;

        let outcome = engine.join("willow99999").await.unwrap();

        assert_eq!(outcome, JoinOutcome::CodeDoesNotExist);
    }
}
