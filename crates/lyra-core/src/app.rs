//! Application root.
//!
//! [`LyraApp`] wires configuration, storage, the playlist store, the catalog
//! client and the view model together. Nothing is global; an embedder owns
//! one `LyraApp` and drives it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::bridge::{PlaybackBridge, PlaybackBridgeHandle, WidgetFactory};
use crate::config::AppConfig;
use crate::error::Result;
use crate::playback::WidgetEvent;
use crate::storage::{FileStorage, StateStorage};
use crate::store::PlaylistStore;
use crate::view::{PlaylistView, SubmitOutcome};
use crate::youtube::{VideoCatalog, YouTubeDataApi};

/// The assembled player core.
pub struct LyraApp {
    config: AppConfig,
    store: PlaylistStore,
    view: PlaylistView,
    catalog: Arc<dyn VideoCatalog>,
}

impl LyraApp {
    /// Build the app from configuration: file storage in the configured
    /// directory and the YouTube Data API as catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage directory cannot be created or no API
    /// key is configured.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let storage = FileStorage::new(&config.storage_directory)?;
        let catalog = YouTubeDataApi::with_config(&config.catalog)?;
        Ok(Self::with_parts(config, Box::new(storage), Arc::new(catalog)))
    }

    /// Load configuration from its default location and build the app.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::load`] and [`LyraApp::from_config`].
    pub fn load() -> Result<Self> {
        Self::from_config(AppConfig::load()?)
    }

    /// Build the app from explicit parts.
    #[must_use]
    pub fn with_parts(
        config: AppConfig,
        storage: Box<dyn StateStorage>,
        catalog: Arc<dyn VideoCatalog>,
    ) -> Self {
        let store = PlaylistStore::open(storage);
        info!(
            "Lyra player ready with {} playlists",
            store.playlists().len()
        );
        Self {
            config,
            store,
            view: PlaylistView::new(),
            catalog,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The playlist store.
    #[must_use]
    pub const fn store(&self) -> &PlaylistStore {
        &self.store
    }

    /// The playlist store, for mutation.
    pub const fn store_mut(&mut self) -> &mut PlaylistStore {
        &mut self.store
    }

    /// The playlist view model.
    #[must_use]
    pub const fn view(&self) -> &PlaylistView {
        &self.view
    }

    /// The view model and store together, for routing user actions.
    pub const fn view_and_store(&mut self) -> (&mut PlaylistView, &mut PlaylistStore) {
        (&mut self.view, &mut self.store)
    }

    /// Submit `url` through the view.
    pub async fn add_track_from_url(&mut self, url: &str) -> SubmitOutcome {
        self.view.set_url_input(url);
        self.view
            .submit_url(&mut self.store, self.catalog.as_ref())
            .await
    }

    /// Start a playback bridge fed by this app's current track.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start_playback<F: WidgetFactory>(
        &self,
        factory: Arc<F>,
        widget_events: mpsc::Receiver<WidgetEvent>,
    ) -> PlaybackBridgeHandle {
        PlaybackBridge::new(factory).start(self.store.subscribe_current_track(), widget_events)
    }
}

impl std::fmt::Debug for LyraApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LyraApp")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}
