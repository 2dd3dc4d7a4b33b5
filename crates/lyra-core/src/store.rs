//! Playlist store.
//!
//! [`PlaylistStore`] owns the whole [`PlayerState`] and is the single source
//! of truth for what exists and what should be playing. Every mutation is a
//! [`StoreCommand`] passed to [`PlaylistStore::dispatch`]; the named methods
//! (`create_playlist`, `add_track`, ...) are thin wrappers over it.
//!
//! After each command that changes something, the full state is serialized
//! and written to [`StateStorage`] under [`STORAGE_KEY`]. A failed write is
//! logged and the in-memory change stands.
//!
//! The store is owned, not global: hand `&mut PlaylistStore` to whatever needs
//! to mutate it, and give the playback bridge a receiver from
//! [`PlaylistStore::subscribe_current_track`].

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Error, PlaylistError, Result};
use crate::playlist::{PlayerState, Playlist, PlaylistId, Track, is_permutation, move_item};
use crate::storage::{MemoryStorage, StateStorage};

/// Fixed key the player state is stored under.
pub const STORAGE_KEY: &str = "player-storage";

/// Version written alongside the persisted state.
pub const STATE_VERSION: u32 = 0;

/// Versioned envelope around the persisted state.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedState<S> {
    state: S,
    #[serde(default)]
    version: u32,
}

/// Serialize the player state into its persisted form.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_state(state: &PlayerState) -> Result<String> {
    Ok(serde_json::to_string(&PersistedState {
        state,
        version: STATE_VERSION,
    })?)
}

/// Deserialize a persisted player state.
///
/// The state comes back exactly as it was serialized, including a current
/// playlist reference that points at nothing.
///
/// # Errors
///
/// Returns an error if the input is not a persisted state document.
pub fn deserialize_state(raw: &str) -> Result<PlayerState> {
    let persisted: PersistedState<PlayerState> = serde_json::from_str(raw)?;
    if persisted.version != STATE_VERSION {
        warn!(
            "Persisted state has version {}, expected {}",
            persisted.version, STATE_VERSION
        );
    }
    Ok(persisted.state)
}

/// A single mutation of the player state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    /// Append a new empty playlist.
    CreatePlaylist {
        /// Id for the new playlist.
        id: PlaylistId,
        /// Display name; the store accepts any string.
        name: String,
    },
    /// Remove a playlist.
    DeletePlaylist {
        /// Playlist to remove.
        playlist_id: PlaylistId,
    },
    /// Rename a playlist in place.
    RenamePlaylist {
        /// Playlist to rename.
        playlist_id: PlaylistId,
        /// New display name.
        name: String,
    },
    /// Change the current playlist reference.
    SetCurrentPlaylist {
        /// New reference, not checked for existence.
        playlist_id: Option<PlaylistId>,
    },
    /// Change the current track.
    SetCurrentTrack {
        /// New current track.
        track: Option<Track>,
    },
    /// Append a track to a playlist.
    AddTrack {
        /// Target playlist.
        playlist_id: PlaylistId,
        /// Track to append.
        track: Track,
    },
    /// Remove every track with the given id from a playlist.
    RemoveTrack {
        /// Target playlist.
        playlist_id: PlaylistId,
        /// Track id to remove.
        track_id: String,
    },
    /// Remove the single track at an index.
    RemoveTrackAt {
        /// Target playlist.
        playlist_id: PlaylistId,
        /// Position of the track.
        index: usize,
    },
    /// Replace a playlist's tracks with a permutation of them.
    ReorderTracks {
        /// Target playlist.
        playlist_id: PlaylistId,
        /// New order.
        tracks: Vec<Track>,
    },
    /// Move one track from one position to another.
    MoveTrack {
        /// Target playlist.
        playlist_id: PlaylistId,
        /// Current position.
        from: usize,
        /// Desired position.
        to: usize,
    },
}

/// Owned, persisted playlist state with command-based mutation.
pub struct PlaylistStore {
    state: PlayerState,
    storage: Box<dyn StateStorage>,
    current_track_tx: watch::Sender<Option<Track>>,
}

impl PlaylistStore {
    /// Open the store, seeding state from `storage`.
    ///
    /// Missing or unreadable stored state yields an empty store.
    pub fn open(storage: Box<dyn StateStorage>) -> Self {
        let state = load_state(storage.as_ref());
        info!(
            "Opened playlist store with {} playlists",
            state.playlists.len()
        );
        let (current_track_tx, _) = watch::channel(state.current_track.clone());
        Self {
            state,
            storage,
            current_track_tx,
        }
    }

    /// Open an empty store that persists only in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryStorage::new()))
    }

    /// Apply a command, persisting the state if it changed.
    ///
    /// Returns whether anything changed. Commands targeting a missing
    /// playlist or track are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`PlaylistError::NotAPermutation`] when a reorder does not hold
    /// exactly the playlist's current tracks. The state is left untouched.
    pub fn dispatch(&mut self, command: StoreCommand) -> Result<bool> {
        debug!("Dispatching {:?}", command);
        let changed = self.apply(command)?;
        if changed {
            self.persist();
            self.notify_current_track();
        }
        Ok(changed)
    }

    fn apply(&mut self, command: StoreCommand) -> Result<bool> {
        match command {
            StoreCommand::CreatePlaylist { id, name } => {
                if self.state.playlist(&id).is_some() {
                    warn!("Playlist {} already exists, not creating", id);
                    return Ok(false);
                }
                info!("Creating playlist '{}' ({})", name, id);
                self.state.playlists.push(Playlist {
                    id,
                    name,
                    tracks: Vec::new(),
                });
                Ok(true)
            }
            StoreCommand::DeletePlaylist { playlist_id } => {
                let before = self.state.playlists.len();
                self.state.playlists.retain(|p| p.id != playlist_id);
                if self.state.playlists.len() == before {
                    debug!("Delete ignored, playlist {} not found", playlist_id);
                    return Ok(false);
                }
                if self.state.current_playlist_id.as_ref() == Some(&playlist_id) {
                    self.state.current_playlist_id = None;
                }
                info!("Deleted playlist {}", playlist_id);
                Ok(true)
            }
            StoreCommand::RenamePlaylist { playlist_id, name } => {
                let Some(playlist) = self.state.playlist_mut(&playlist_id) else {
                    debug!("Rename ignored, playlist {} not found", playlist_id);
                    return Ok(false);
                };
                if playlist.name == name {
                    return Ok(false);
                }
                info!("Renaming playlist {} to '{}'", playlist_id, name);
                playlist.name = name;
                Ok(true)
            }
            StoreCommand::SetCurrentPlaylist { playlist_id } => {
                if self.state.current_playlist_id == playlist_id {
                    return Ok(false);
                }
                if let Some(id) = &playlist_id
                    && self.state.playlist(id).is_none()
                {
                    debug!("Current playlist set to unknown id {}", id);
                }
                self.state.current_playlist_id = playlist_id;
                Ok(true)
            }
            StoreCommand::SetCurrentTrack { track } => {
                if self.state.current_track == track {
                    return Ok(false);
                }
                info!(
                    "Current track set to {}",
                    track.as_ref().map_or("none", |t| t.id.as_str())
                );
                self.state.current_track = track;
                Ok(true)
            }
            StoreCommand::AddTrack { playlist_id, track } => {
                let Some(playlist) = self.state.playlist_mut(&playlist_id) else {
                    debug!("Add ignored, playlist {} not found", playlist_id);
                    return Ok(false);
                };
                info!("Adding track {} to playlist {}", track.id, playlist_id);
                playlist.tracks.push(track);
                Ok(true)
            }
            StoreCommand::RemoveTrack {
                playlist_id,
                track_id,
            } => {
                let Some(playlist) = self.state.playlist_mut(&playlist_id) else {
                    debug!("Remove ignored, playlist {} not found", playlist_id);
                    return Ok(false);
                };
                let before = playlist.tracks.len();
                playlist.tracks.retain(|t| t.id != track_id);
                let removed = before - playlist.tracks.len();
                if removed == 0 {
                    return Ok(false);
                }
                info!(
                    "Removed {} track(s) {} from playlist {}",
                    removed, track_id, playlist_id
                );
                self.clear_current_track_if(&track_id);
                Ok(true)
            }
            StoreCommand::RemoveTrackAt { playlist_id, index } => {
                let Some(playlist) = self.state.playlist_mut(&playlist_id) else {
                    return Ok(false);
                };
                if index >= playlist.tracks.len() {
                    return Ok(false);
                }
                let removed = playlist.tracks.remove(index);
                info!(
                    "Removed track {} at {} from playlist {}",
                    removed.id, index, playlist_id
                );
                self.clear_current_track_if(&removed.id);
                Ok(true)
            }
            StoreCommand::ReorderTracks {
                playlist_id,
                tracks,
            } => {
                let Some(playlist) = self.state.playlist_mut(&playlist_id) else {
                    debug!("Reorder ignored, playlist {} not found", playlist_id);
                    return Ok(false);
                };
                if !is_permutation(&playlist.tracks, &tracks) {
                    return Err(Error::Playlist(PlaylistError::NotAPermutation {
                        id: playlist_id.to_string(),
                        expected: playlist.tracks.len(),
                    }));
                }
                if playlist.tracks == tracks {
                    return Ok(false);
                }
                playlist.tracks = tracks;
                info!("Reordered playlist {}", playlist_id);
                Ok(true)
            }
            StoreCommand::MoveTrack {
                playlist_id,
                from,
                to,
            } => {
                let Some(playlist) = self.state.playlist_mut(&playlist_id) else {
                    return Ok(false);
                };
                if from == to || !move_item(&mut playlist.tracks, from, to) {
                    return Ok(false);
                }
                info!(
                    "Moved track {} -> {} in playlist {}",
                    from, to, playlist_id
                );
                Ok(true)
            }
        }
    }

    fn clear_current_track_if(&mut self, track_id: &str) {
        if self
            .state
            .current_track
            .as_ref()
            .is_some_and(|t| t.id == track_id)
        {
            info!("Current track {} was removed, clearing it", track_id);
            self.state.current_track = None;
        }
    }

    fn persist(&self) {
        let result =
            serialize_state(&self.state).and_then(|raw| self.storage.set(STORAGE_KEY, &raw));
        if let Err(e) = result {
            warn!("Failed to persist player state: {}", e);
        }
    }

    fn notify_current_track(&self) {
        let current = &self.state.current_track;
        self.current_track_tx.send_if_modified(|published| {
            if published == current {
                false
            } else {
                published.clone_from(current);
                true
            }
        });
    }

    /// Create an empty playlist and return its id.
    pub fn create_playlist(&mut self, name: impl Into<String>) -> PlaylistId {
        let id = PlaylistId::generate();
        self.dispatch_infallible(StoreCommand::CreatePlaylist {
            id: id.clone(),
            name: name.into(),
        });
        id
    }

    /// Delete a playlist; clears the current playlist if it was this one.
    pub fn delete_playlist(&mut self, playlist_id: &PlaylistId) {
        self.dispatch_infallible(StoreCommand::DeletePlaylist {
            playlist_id: playlist_id.clone(),
        });
    }

    /// Rename a playlist.
    pub fn rename_playlist(&mut self, playlist_id: &PlaylistId, name: impl Into<String>) {
        self.dispatch_infallible(StoreCommand::RenamePlaylist {
            playlist_id: playlist_id.clone(),
            name: name.into(),
        });
    }

    /// Set or clear the current playlist.
    pub fn set_current_playlist(&mut self, playlist_id: Option<PlaylistId>) {
        self.dispatch_infallible(StoreCommand::SetCurrentPlaylist { playlist_id });
    }

    /// Set or clear the current track.
    pub fn set_current_track(&mut self, track: Option<Track>) {
        self.dispatch_infallible(StoreCommand::SetCurrentTrack { track });
    }

    /// Make `track` current as a user selection.
    ///
    /// Selecting the track that is already current publishes it to
    /// subscribers again, so a surface whose widget failed to initialize
    /// retries. Nothing is written to storage in that case.
    pub fn select_track(&mut self, track: Track) {
        if self.state.current_track.as_ref() == Some(&track) {
            debug!("Track {} reselected, republishing", track.id);
            self.current_track_tx.send_modify(|_| {});
            return;
        }
        self.set_current_track(Some(track));
    }

    /// Append a track to a playlist.
    pub fn add_track(&mut self, playlist_id: &PlaylistId, track: Track) {
        self.dispatch_infallible(StoreCommand::AddTrack {
            playlist_id: playlist_id.clone(),
            track,
        });
    }

    /// Remove every track with `track_id` from a playlist.
    pub fn remove_track(&mut self, playlist_id: &PlaylistId, track_id: &str) {
        self.dispatch_infallible(StoreCommand::RemoveTrack {
            playlist_id: playlist_id.clone(),
            track_id: track_id.to_string(),
        });
    }

    /// Remove only the track at `index`.
    pub fn remove_track_at(&mut self, playlist_id: &PlaylistId, index: usize) {
        self.dispatch_infallible(StoreCommand::RemoveTrackAt {
            playlist_id: playlist_id.clone(),
            index,
        });
    }

    /// Replace a playlist's tracks with a reordering of them.
    ///
    /// # Errors
    ///
    /// Returns [`PlaylistError::NotAPermutation`] if `tracks` is not a
    /// permutation of the playlist's current tracks.
    pub fn reorder_tracks(&mut self, playlist_id: &PlaylistId, tracks: Vec<Track>) -> Result<()> {
        self.dispatch(StoreCommand::ReorderTracks {
            playlist_id: playlist_id.clone(),
            tracks,
        })
        .map(|_| ())
    }

    /// Move the track at `from` to `to`.
    pub fn move_track(&mut self, playlist_id: &PlaylistId, from: usize, to: usize) {
        self.dispatch_infallible(StoreCommand::MoveTrack {
            playlist_id: playlist_id.clone(),
            from,
            to,
        });
    }

    fn dispatch_infallible(&mut self, command: StoreCommand) {
        if let Err(e) = self.dispatch(command) {
            warn!("Store command failed: {}", e);
        }
    }

    /// The whole state tree.
    #[must_use]
    pub const fn state(&self) -> &PlayerState {
        &self.state
    }

    /// All playlists in creation order.
    #[must_use]
    pub fn playlists(&self) -> &[Playlist] {
        &self.state.playlists
    }

    /// Find a playlist by id.
    #[must_use]
    pub fn playlist(&self, playlist_id: &PlaylistId) -> Option<&Playlist> {
        self.state.playlist(playlist_id)
    }

    /// The current playlist reference, as stored.
    #[must_use]
    pub const fn current_playlist_id(&self) -> Option<&PlaylistId> {
        self.state.current_playlist_id.as_ref()
    }

    /// The current playlist, if the reference resolves.
    #[must_use]
    pub fn current_playlist(&self) -> Option<&Playlist> {
        self.state.current_playlist()
    }

    /// The current track.
    #[must_use]
    pub const fn current_track(&self) -> Option<&Track> {
        self.state.current_track.as_ref()
    }

    /// Subscribe to current-track changes.
    ///
    /// The receiver starts out holding the current value.
    #[must_use]
    pub fn subscribe_current_track(&self) -> watch::Receiver<Option<Track>> {
        self.current_track_tx.subscribe()
    }
}

impl std::fmt::Debug for PlaylistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaylistStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn load_state(storage: &dyn StateStorage) -> PlayerState {
    match storage.get(STORAGE_KEY) {
        Ok(Some(raw)) => match deserialize_state(&raw) {
            Ok(mut state) => {
                if state.reconcile() {
                    warn!("Cleared dangling current playlist reference from stored state");
                }
                state
            }
            Err(e) => {
                warn!("Stored player state is unreadable, starting empty: {}", e);
                PlayerState::default()
            }
        },
        Ok(None) => {
            debug!("No stored player state, starting empty");
            PlayerState::default()
        }
        Err(e) => {
            warn!("Failed to read player state, starting empty: {}", e);
            PlayerState::default()
        }
    }
}
