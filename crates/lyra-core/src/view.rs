//! Playlist view model.
//!
//! [`PlaylistView`] holds the transient UI state of the playlist panel (the
//! URL being typed, whether a fetch is in flight, the inline error, the
//! playlist being renamed) and turns user actions into store commands.
//! Resolver errors stop here: they become [`PlaylistView::error`] and never
//! reach the store.

use tracing::{debug, info, warn};

use crate::error::{Error, ErrorKind, PlaylistError, Result};
use crate::playlist::{PlaylistId, Track};
use crate::store::PlaylistStore;
use crate::youtube::{VideoCatalog, VideoMetadata, extract_video_id};

/// Result of a URL submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The track was appended to the playlist.
    Added {
        /// Playlist the track went into.
        playlist_id: PlaylistId,
        /// The new track.
        track: Track,
    },
    /// The video resolved but no playlist is selected, so nothing was added.
    Resolved(Track),
    /// The submission failed; the message is in [`PlaylistView::error`].
    Failed(ErrorKind),
    /// Another submission is still in flight.
    Busy,
}

/// A submission that passed URL validation and awaits its catalog fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    video_id: String,
}

impl PendingSubmission {
    /// Video id to fetch.
    #[must_use]
    pub fn video_id(&self) -> &str {
        &self.video_id
    }
}

/// Transient state of the playlist panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistView {
    url_input: String,
    is_loading: bool,
    error: Option<String>,
    editing: Option<(PlaylistId, String)>,
}

impl PlaylistView {
    /// Create an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text currently in the URL input.
    #[must_use]
    pub fn url_input(&self) -> &str {
        &self.url_input
    }

    /// Replace the URL input text.
    pub fn set_url_input(&mut self, url: impl Into<String>) {
        self.url_input = url.into();
    }

    /// Whether a catalog fetch is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Inline error message from the last submission.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Resolve the URL input and append the track to the current playlist.
    pub async fn submit_url<C>(&mut self, store: &mut PlaylistStore, catalog: &C) -> SubmitOutcome
    where
        C: VideoCatalog + ?Sized,
    {
        let pending = match self.begin_submission() {
            Ok(pending) => pending,
            Err(outcome) => return outcome,
        };
        let fetched = catalog.fetch_metadata(pending.video_id()).await;
        self.complete_submission(store, fetched)
    }

    /// First half of a submission: validate the URL and mark the view busy.
    ///
    /// # Errors
    ///
    /// Returns the final outcome when no fetch should happen: [`SubmitOutcome::Busy`]
    /// while another submission is pending, or [`SubmitOutcome::Failed`] for a
    /// URL with no video id.
    pub fn begin_submission(&mut self) -> std::result::Result<PendingSubmission, SubmitOutcome> {
        if self.is_loading {
            debug!("Submission ignored, another is in flight");
            return Err(SubmitOutcome::Busy);
        }
        self.error = None;

        let Some(video_id) = extract_video_id(&self.url_input) else {
            let err = Error::InvalidUrl {
                url: self.url_input.clone(),
            };
            debug!("Rejected URL: {}", err);
            let kind = err.kind();
            self.error = Some(err.user_message());
            return Err(SubmitOutcome::Failed(kind));
        };

        self.is_loading = true;
        Ok(PendingSubmission { video_id })
    }

    /// Second half of a submission: apply the fetch result.
    pub fn complete_submission(
        &mut self,
        store: &mut PlaylistStore,
        fetched: Result<VideoMetadata>,
    ) -> SubmitOutcome {
        self.is_loading = false;

        let track = match fetched {
            Ok(metadata) => metadata.into_track(),
            Err(e) => {
                warn!("Failed to add track: {}", e);
                self.error = Some(e.user_message());
                return SubmitOutcome::Failed(e.kind());
            }
        };

        self.url_input.clear();
        match store.current_playlist().map(|p| p.id.clone()) {
            Some(playlist_id) => {
                store.add_track(&playlist_id, track.clone());
                SubmitOutcome::Added { playlist_id, track }
            }
            None => {
                info!("No playlist selected, track {} not added", track.id);
                SubmitOutcome::Resolved(track)
            }
        }
    }

    /// Create a playlist from user input.
    ///
    /// # Errors
    ///
    /// Returns [`PlaylistError::InvalidName`] for a blank name.
    pub fn create_playlist(&self, store: &mut PlaylistStore, name: &str) -> Result<PlaylistId> {
        let name = validated_name(name)?;
        Ok(store.create_playlist(name))
    }

    /// Start renaming a playlist, seeding the edit buffer with its name.
    pub fn start_rename(&mut self, store: &PlaylistStore, playlist_id: &PlaylistId) {
        if let Some(playlist) = store.playlist(playlist_id) {
            self.editing = Some((playlist_id.clone(), playlist.name.clone()));
        }
    }

    /// The playlist being renamed and the edit buffer.
    #[must_use]
    pub fn editing(&self) -> Option<(&PlaylistId, &str)> {
        self.editing.as_ref().map(|(id, name)| (id, name.as_str()))
    }

    /// Replace the rename edit buffer.
    pub fn set_editing_name(&mut self, name: impl Into<String>) {
        if let Some((_, buffer)) = self.editing.as_mut() {
            *buffer = name.into();
        }
    }

    /// Apply the rename. A blank buffer cancels instead.
    ///
    /// Returns whether a rename was issued.
    pub fn commit_rename(&mut self, store: &mut PlaylistStore) -> bool {
        let Some((playlist_id, buffer)) = self.editing.take() else {
            return false;
        };
        match validated_name(&buffer) {
            Ok(name) => {
                store.rename_playlist(&playlist_id, name);
                true
            }
            Err(_) => false,
        }
    }

    /// Abandon the rename.
    pub fn cancel_rename(&mut self) {
        self.editing = None;
    }

    /// Delete the selected playlist, if any.
    pub fn delete_current_playlist(&mut self, store: &mut PlaylistStore) -> bool {
        let Some(playlist_id) = store.current_playlist_id().cloned() else {
            return false;
        };
        if self
            .editing
            .as_ref()
            .is_some_and(|(id, _)| *id == playlist_id)
        {
            self.editing = None;
        }
        store.delete_playlist(&playlist_id);
        true
    }

    /// Make `track` the current track. Picking the current track again asks
    /// the player to retry it.
    pub fn select_track(&self, store: &mut PlaylistStore, track: &Track) {
        store.select_track(track.clone());
    }

    /// Remove a track from the selected playlist.
    pub fn remove_track(&self, store: &mut PlaylistStore, track_id: &str) {
        if let Some(playlist_id) = store.current_playlist_id().cloned() {
            store.remove_track(&playlist_id, track_id);
        }
    }

    /// Finish a drag in the track list: move `active_id` to where `over_id` is.
    ///
    /// Returns whether the order changed.
    pub fn handle_drag_end(&self, store: &mut PlaylistStore, active_id: &str, over_id: &str) -> bool {
        if active_id == over_id {
            return false;
        }
        let Some(playlist) = store.current_playlist() else {
            return false;
        };
        let (Some(from), Some(to)) = (playlist.position_of(active_id), playlist.position_of(over_id))
        else {
            return false;
        };
        let playlist_id = playlist.id.clone();
        store.move_track(&playlist_id, from, to);
        true
    }
}

fn validated_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PlaylistError::InvalidName {
            name: name.to_string(),
            reason: "name is blank".to_string(),
        }
        .into());
    }
    Ok(trimmed.to_string())
}

/// Format seconds as zero-padded `mm:ss`. Minutes are not wrapped into hours.
#[must_use]
pub fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
