//! Application context
//!
//! Built once at startup and shared by every command. Owns the settings
//! store, the document slot directory and the life-table cache.

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use weekcache::{Clock, LifeStats, LifeTableCache};
use weekstore::{SettingsStore, SlotStore};

use crate::profile::{Profile, PROFILE_KEY};
use crate::reminders::{ReminderPrefs, REMINDERS_KEY};

/// Subdirectory of the data dir holding rendered images
pub const DOCUMENTS_DIR: &str = "documents";

pub struct AppContext {
    settings: Arc<SettingsStore>,
    cache: Arc<LifeTableCache>,
    clock: Arc<dyn Clock>,
}

impl AppContext {
    /// Open (or create) the stores under `data_dir`
    pub fn open(data_dir: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let settings = Arc::new(
            SettingsStore::open(data_dir).context("Failed to open settings store")?,
        );
        let slots = SlotStore::open(data_dir.join(DOCUMENTS_DIR))
            .context("Failed to open documents directory")?;
        let cache = Arc::new(LifeTableCache::new(
            Arc::clone(&settings),
            slots,
            Arc::clone(&clock),
        ));

        info!("Data directory: {}", data_dir.display());

        Ok(Self {
            settings,
            cache,
            clock,
        })
    }

    pub fn cache(&self) -> &Arc<LifeTableCache> {
        &self.cache
    }

    /// Local wall-clock time
    pub fn now(&self) -> Result<NaiveDateTime> {
        self.clock
            .local_datetime(self.clock.now_millis())
            .ok_or_else(|| anyhow!("Clock is out of range"))
    }

    /// Local calendar date
    pub fn today(&self) -> Result<NaiveDate> {
        Ok(self.now()?.date())
    }

    pub fn profile(&self) -> Result<Option<Profile>> {
        self.load_json(PROFILE_KEY)
    }

    /// Stored profile, or an error telling the user how to create one
    pub fn require_profile(&self) -> Result<Profile> {
        self.profile()?
            .ok_or_else(|| anyhow!("No profile yet. Run `lifeweeks profile set` first"))
    }

    /// Validate and store `profile`
    ///
    /// Returns whether the stored profile changed. A change discards the
    /// cached life table.
    pub fn save_profile(&self, profile: Profile) -> Result<bool> {
        let profile = profile.validated(self.today()?)?;

        if self.profile()?.as_ref() == Some(&profile) {
            return Ok(false);
        }

        self.save_json(PROFILE_KEY, &profile)?;
        self.cache.invalidate();
        info!("Profile updated, life table cache discarded");

        Ok(true)
    }

    /// Life statistics for today from the stored profile
    pub fn life_stats(&self) -> Result<LifeStats> {
        self.require_profile()?.life_stats(self.today()?)
    }

    /// Stored reminder preferences, defaults if none were saved
    pub fn reminders(&self) -> Result<ReminderPrefs> {
        Ok(self.load_json(REMINDERS_KEY)?.unwrap_or_default())
    }

    pub fn save_reminders(&self, prefs: &ReminderPrefs) -> Result<()> {
        prefs.validate()?;
        self.save_json(REMINDERS_KEY, prefs)
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.settings.get(key)? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("Stored {} is not valid JSON", key))?;
        Ok(Some(value))
    }

    fn save_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.settings
            .set(key, &raw)
            .with_context(|| format!("Failed to store {}", key))
    }
}
