use crate::error::Result;
use async_trait::async_trait;
use namematch_model::{Gender, NameSort, PersonId, TimePeriod, LAST_CORPUS_YEAR};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const GENDER_KEY: &str = "gender";
const YEAR_KEY: &str = "year";
const PARTNER_NAME_KEY: &str = "last_name";
const STARTS_WITH_KEY: &str = "starts_with";
const TIME_PERIOD_KEY: &str = "time_period";
const MAX_LENGTH_KEY: &str = "max_length";
const USER_ID_KEY: &str = "user_id";
const SORTING_KEY: &str = "sorting";
const LAST_KNOWN_CONNECTION_KEY: &str = "last_known_connection_code";

/// Plain string/integer key-value settings. Typed accessors with the
/// documented defaults live on [`PreferencesExt`].
#[async_trait]
pub trait Preferences: Send + Sync {
    async fn get_string(&self, key: &str) -> Result<Option<String>>;
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;
    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;
    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Typed settings layer. Defaults when a key is absent: gender Male, time
/// period current-year-only, starts-with empty, max length unbounded, sort
/// Popular.
#[async_trait]
pub trait PreferencesExt: Preferences {
    async fn gender_or_default(&self) -> Result<Gender> {
        let code = self.get_string(GENDER_KEY).await?;
        Ok(code
            .as_deref()
            .and_then(Gender::from_code)
            .unwrap_or(Gender::Male))
    }

    async fn set_gender(&self, gender: Gender) -> Result<()> {
        self.set_string(GENDER_KEY, gender.code()).await
    }

    async fn year_or_default(&self) -> Result<i32> {
        Ok(self
            .get_i64(YEAR_KEY)
            .await?
            .map(|year| year as i32)
            .unwrap_or(LAST_CORPUS_YEAR))
    }

    async fn time_period_or_default(&self) -> Result<TimePeriod> {
        let key = self.get_string(TIME_PERIOD_KEY).await?;
        let year = self.year_or_default().await?;
        Ok(key
            .map(|key| TimePeriod::from_key(&key, year))
            .unwrap_or_default())
    }

    async fn set_time_period(&self, period: TimePeriod) -> Result<()> {
        self.set_string(TIME_PERIOD_KEY, period.key()).await?;
        if let TimePeriod::SpecificYear(year) = period {
            self.set_i64(YEAR_KEY, i64::from(year)).await?;
        }
        Ok(())
    }

    async fn starts_with_or_default(&self) -> Result<String> {
        Ok(self.get_string(STARTS_WITH_KEY).await?.unwrap_or_default())
    }

    async fn set_starts_with(&self, prefix: &str) -> Result<()> {
        self.set_string(STARTS_WITH_KEY, prefix).await
    }

    async fn max_length_or_default(&self) -> Result<usize> {
        Ok(self
            .get_i64(MAX_LENGTH_KEY)
            .await?
            .map(|len| len.max(0) as usize)
            .unwrap_or(usize::MAX))
    }

    async fn set_max_length(&self, max_length: usize) -> Result<()> {
        if max_length == usize::MAX {
            self.remove(MAX_LENGTH_KEY).await
        } else {
            self.set_i64(MAX_LENGTH_KEY, max_length.min(i64::MAX as usize) as i64)
                .await
        }
    }

    async fn sort_or_default(&self) -> Result<NameSort> {
        let key = self.get_i64(SORTING_KEY).await?;
        Ok(key.and_then(NameSort::from_key).unwrap_or(NameSort::Popular))
    }

    async fn set_sort(&self, sort: NameSort) -> Result<()> {
        self.set_i64(SORTING_KEY, sort.key()).await
    }

    /// Device identity: generated once on first access and persisted.
    async fn user_id(&self) -> Result<PersonId> {
        if let Some(id) = self.get_string(USER_ID_KEY).await? {
            return Ok(PersonId::new(id));
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.set_string(USER_ID_KEY, &id).await?;
        log::info!("generated device identity");
        Ok(PersonId::new(id))
    }

    async fn last_known_connection(&self) -> Result<Option<String>> {
        self.get_string(LAST_KNOWN_CONNECTION_KEY).await
    }

    async fn set_last_known_connection(&self, code: &str) -> Result<()> {
        self.set_string(LAST_KNOWN_CONNECTION_KEY, code).await
    }

    async fn clear_last_known_connection(&self) -> Result<()> {
        self.remove(LAST_KNOWN_CONNECTION_KEY).await
    }

    async fn partner_last_name(&self) -> Result<Option<String>> {
        self.get_string(PARTNER_NAME_KEY).await
    }

    async fn set_partner_last_name(&self, last_name: &str) -> Result<()> {
        self.set_string(PARTNER_NAME_KEY, last_name).await
    }
}

#[async_trait]
impl<P: Preferences + ?Sized> PreferencesExt for P {}

/// File-backed settings: one JSON object, rewritten on every mutation.
pub struct JsonPreferences {
    path: PathBuf,
    map: Mutex<HashMap<String, serde_json::Value>>,
}

impl JsonPreferences {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let map: HashMap<String, serde_json::Value> =
            match tokio::fs::read_to_string(&path).await {
                Ok(data) => serde_json::from_str(&data)?,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
                Err(err) => return Err(err.into()),
            };
        log::debug!("opened preferences at {} ({} keys)", path.display(), map.len());
        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    async fn save(&self, map: &HashMap<String, serde_json::Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_string_pretty(map)?;
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }
}

#[async_trait]
impl Preferences for JsonPreferences {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let map = self.map.lock().await;
        Ok(map.get(key).and_then(|v| v.as_str()).map(str::to_string))
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.map.lock().await;
        map.insert(key.to_string(), serde_json::Value::from(value));
        self.save(&map).await
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        let map = self.map.lock().await;
        Ok(map.get(key).and_then(|v| v.as_i64()))
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        let mut map = self.map.lock().await;
        map.insert(key.to_string(), serde_json::Value::from(value));
        self.save(&map).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.map.lock().await;
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.save(&map).await
    }
}
