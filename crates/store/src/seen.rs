use crate::error::Result;
use async_trait::async_trait;
use namematch_model::SeenName;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Gateway to the device-local table of prior swipe decisions, keyed by
/// `(name, gender_code)`. Rows are never deleted, only toggled. Each call
/// either fully commits or fails atomically.
#[async_trait]
pub trait SeenStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<SeenName>>;

    /// Idempotent create against the unique key: inserting an existing pair
    /// leaves the stored row untouched.
    async fn insert(&self, name: &str, gender_code: &str, liked: bool) -> Result<()>;

    /// Flip the liked flag of an existing row. Unknown keys are a no-op.
    async fn set_liked(&self, name: &str, gender_code: &str, liked: bool) -> Result<()>;

    /// Every liked row — the snapshot source for connection create/join.
    async fn liked_history(&self) -> Result<Vec<SeenName>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|row| row.liked)
            .collect())
    }
}

/// File-backed store: the full row set serialized as one JSON document,
/// rewritten on every mutation.
pub struct JsonSeenStore {
    path: PathBuf,
    rows: Mutex<Vec<SeenName>>,
}

impl JsonSeenStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let rows: Vec<SeenName> = match tokio::fs::read_to_string(&path).await {
            Ok(data) => serde_json::from_str(&data)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        log::debug!("opened seen store at {} ({} rows)", path.display(), rows.len());
        Ok(Self {
            path,
            rows: Mutex::new(rows),
        })
    }

    async fn save(&self, rows: &[SeenName]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_string_pretty(rows)?;
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }
}

#[async_trait]
impl SeenStore for JsonSeenStore {
    async fn list_all(&self) -> Result<Vec<SeenName>> {
        Ok(self.rows.lock().await.clone())
    }

    async fn insert(&self, name: &str, gender_code: &str, liked: bool) -> Result<()> {
        let mut rows = self.rows.lock().await;
        let exists = rows
            .iter()
            .any(|row| row.name == name && row.gender_code == gender_code);
        if exists {
            return Ok(());
        }
        rows.push(SeenName::new(name, gender_code, liked));
        self.save(&rows).await
    }

    async fn set_liked(&self, name: &str, gender_code: &str, liked: bool) -> Result<()> {
        let mut rows = self.rows.lock().await;
        let Some(row) = rows
            .iter_mut()
            .find(|row| row.name == name && row.gender_code == gender_code)
        else {
            log::debug!("set_liked on unknown row {name}/{gender_code}");
            return Ok(());
        };
        if row.liked == liked {
            return Ok(());
        }
        row.liked = liked;
        self.save(&rows).await
    }
}

/// History-view ordering: liked rows first, then by name, split into the
/// boy and girl columns.
pub fn split_history_by_gender(mut rows: Vec<SeenName>) -> (Vec<SeenName>, Vec<SeenName>) {
    rows.sort_by(|a, b| b.liked.cmp(&a.liked).then_with(|| a.name.cmp(&b.name)));
    let (boys, rest): (Vec<_>, Vec<_>) = rows.into_iter().partition(|row| row.gender_code == "M");
    let girls = rest
        .into_iter()
        .filter(|row| row.gender_code == "F")
        .collect();
    (boys, girls)
}
