//! Copy-on-write preferences store backed by a single durable blob.

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;

use super::{
    DarkThemeConfig, NotificationChannel, PreferencesBackend, UserData, UserPreferences,
};
use crate::errors::{PreferencesError, Result};
use crate::resources::ResourceKind;
use crate::sync::ChangeListVersions;

/// Process-wide preferences store.
///
/// Overlay data and cursors are published as immutable snapshots on separate
/// watch channels so cursor advances never wake overlay observers. Every
/// mutation is a read-modify-write under `write_lock` touching only its own
/// field, then persisted as one blob.
pub struct PreferencesDataSource {
    backend: Arc<dyn PreferencesBackend>,
    user_data: watch::Sender<Arc<UserData>>,
    versions: watch::Sender<ChangeListVersions>,
    /// Guards every write; holds whether the backend blob has been read.
    write_lock: Mutex<bool>,
}

impl PreferencesDataSource {
    /// Opens the store from `backend`.
    ///
    /// An absent blob starts from defaults. An unreadable backend also starts
    /// from defaults (fail-open), but nothing is written back until a later
    /// read succeeds, so stored data is never replaced by those defaults. A
    /// blob that exists but does not deserialize is returned as
    /// [`PreferencesError::Corrupted`].
    pub async fn load(
        backend: Arc<dyn PreferencesBackend>,
    ) -> std::result::Result<Self, PreferencesError> {
        match read_preferences(backend.as_ref()).await {
            Ok(preferences) => Ok(Self::from_preferences(backend, preferences, true)),
            Err(err @ PreferencesError::Corrupted(_)) => Err(err),
            Err(err) => {
                warn!("[Prefs] Failed to read preferences, using defaults: {}", err);
                Ok(Self::from_preferences(backend, UserPreferences::default(), false))
            }
        }
    }

    /// Discards whatever the backend holds and starts from defaults.
    pub async fn reset(backend: Arc<dyn PreferencesBackend>) -> Self {
        let store = Self::from_preferences(backend, UserPreferences::default(), true);
        if let Err(err) = store.persist(&UserPreferences::default()).await {
            warn!("[Prefs] Failed to persist reset preferences: {}", err);
        }
        store
    }

    fn from_preferences(
        backend: Arc<dyn PreferencesBackend>,
        preferences: UserPreferences,
        loaded: bool,
    ) -> Self {
        let (user_data, _) = watch::channel(Arc::new(preferences.user_data));
        let (versions, _) = watch::channel(preferences.change_list_versions);
        Self {
            backend,
            user_data,
            versions,
            write_lock: Mutex::new(loaded),
        }
    }

    /// Adopts the stored blob if it has not been read yet. Must be called
    /// with `write_lock` held.
    async fn ensure_loaded(&self, loaded: &mut bool) -> Result<()> {
        if *loaded {
            return Ok(());
        }
        let stored = read_preferences(self.backend.as_ref()).await?;
        info!("[Prefs] Preferences readable again, adopting stored values");
        self.user_data.send_if_modified(|current| {
            if **current == stored.user_data {
                return false;
            }
            *current = Arc::new(stored.user_data);
            true
        });
        self.versions.send_replace(stored.change_list_versions);
        *loaded = true;
        Ok(())
    }

    /// Current overlay snapshot.
    pub fn snapshot(&self) -> Arc<UserData> {
        self.user_data.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<UserData>> {
        self.user_data.subscribe()
    }

    /// Emits the current overlay immediately and again after every change.
    pub fn user_data(&self) -> BoxStream<'static, Arc<UserData>> {
        WatchStream::new(self.subscribe()).boxed()
    }

    pub async fn set_bookmarked(&self, kind: ResourceKind, id: &str, bookmarked: bool) {
        self.mutate_user_data("bookmark", |data| {
            toggle_membership(data.bookmarked_mut(kind), id, bookmarked)
        })
        .await;
    }

    pub async fn set_viewed(&self, kind: ResourceKind, id: &str, viewed: bool) {
        self.mutate_user_data("viewed", |data| {
            toggle_membership(data.viewed_mut(kind), id, viewed)
        })
        .await;
    }

    pub async fn set_viewed_batch(&self, kind: ResourceKind, ids: &[String], viewed: bool) {
        self.mutate_user_data("viewed batch", |data| {
            let set = data.viewed_mut(kind);
            ids.iter()
                .fold(false, |changed, id| toggle_membership(set, id, viewed) || changed)
        })
        .await;
    }

    pub async fn set_dark_theme_config(&self, config: DarkThemeConfig) {
        self.mutate_user_data("dark theme", |data| {
            std::mem::replace(&mut data.dark_theme_config, config) != config
        })
        .await;
    }

    pub async fn set_dynamic_color(&self, enabled: bool) {
        self.mutate_user_data("dynamic color", |data| {
            std::mem::replace(&mut data.use_dynamic_color, enabled) != enabled
        })
        .await;
    }

    pub async fn set_notification_allowed(&self, channel: NotificationChannel, allowed: bool) {
        self.mutate_user_data("notifications", |data| {
            let flag = data.notification_allowed_mut(channel);
            std::mem::replace(flag, allowed) != allowed
        })
        .await;
    }

    pub fn get_change_list_versions(&self) -> ChangeListVersions {
        *self.versions.borrow()
    }

    /// Applies `update` to the cursors and persists the result.
    ///
    /// Unlike overlay toggles, a failed write is returned and the in-memory
    /// cursors stay unchanged.
    pub async fn update_change_list_versions<F>(&self, update: F) -> Result<ChangeListVersions>
    where
        F: FnOnce(ChangeListVersions) -> ChangeListVersions + Send,
    {
        let mut loaded = self.write_lock.lock().await;
        self.ensure_loaded(&mut *loaded).await?;
        let current = *self.versions.borrow();
        let next = update(current);
        if next == current {
            return Ok(current);
        }
        self.persist(&UserPreferences {
            user_data: (*self.snapshot()).clone(),
            change_list_versions: next,
        })
        .await?;
        self.versions.send_replace(next);
        Ok(next)
    }

    /// Moves the cursor of `kind` from `expected` to `new`.
    ///
    /// Returns `false` without writing when the stored cursor is no longer
    /// `expected` or when `new` would move it backwards.
    pub async fn compare_and_set_cursor(
        &self,
        kind: ResourceKind,
        expected: i64,
        new: i64,
    ) -> Result<bool> {
        let mut loaded = self.write_lock.lock().await;
        self.ensure_loaded(&mut *loaded).await?;
        let current = *self.versions.borrow();
        if current.get(kind) != expected || new < expected {
            warn!(
                "[Prefs] Rejecting {} cursor move {} -> {} (stored {})",
                kind,
                expected,
                new,
                current.get(kind)
            );
            return Ok(false);
        }
        if new == expected {
            return Ok(true);
        }
        let next = current.with(kind, new);
        self.persist(&UserPreferences {
            user_data: (*self.snapshot()).clone(),
            change_list_versions: next,
        })
        .await?;
        self.versions.send_replace(next);
        Ok(true)
    }

    async fn mutate_user_data<F>(&self, label: &str, mutate: F)
    where
        F: FnOnce(&mut UserData) -> bool + Send,
    {
        let mut loaded = self.write_lock.lock().await;
        if let Err(err) = self.ensure_loaded(&mut *loaded).await {
            warn!(
                "[Prefs] Preferences still unreadable, keeping {} change in memory: {}",
                label, err
            );
            let mut next = (*self.snapshot()).clone();
            if mutate(&mut next) {
                self.user_data.send_replace(Arc::new(next));
            }
            return;
        }
        let mut next = (*self.snapshot()).clone();
        if !mutate(&mut next) {
            return;
        }
        let preferences = UserPreferences {
            user_data: next,
            change_list_versions: *self.versions.borrow(),
        };
        if let Err(err) = self.persist(&preferences).await {
            warn!("[Prefs] Failed to persist {} change: {}", label, err);
        }
        self.user_data.send_replace(Arc::new(preferences.user_data));
    }

    async fn persist(&self, preferences: &UserPreferences) -> Result<()> {
        let blob = serde_json::to_string(preferences)?;
        self.backend.store(blob).await?;
        Ok(())
    }
}

async fn read_preferences(
    backend: &dyn PreferencesBackend,
) -> std::result::Result<UserPreferences, PreferencesError> {
    match backend.load().await? {
        Some(blob) => serde_json::from_str::<UserPreferences>(&blob).map_err(|err| {
            error!("[Prefs] Stored preferences failed to deserialize: {}", err);
            PreferencesError::Corrupted(err.to_string())
        }),
        None => {
            debug!("[Prefs] No stored preferences, starting from defaults");
            Ok(UserPreferences::default())
        }
    }
}

fn toggle_membership(set: &mut std::collections::BTreeSet<String>, id: &str, member: bool) -> bool {
    if member {
        set.insert(id.to_string())
    } else {
        set.remove(id)
    }
}
