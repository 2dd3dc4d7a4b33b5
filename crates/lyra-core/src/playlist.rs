//! Playlist data model.
//!
//! A [`Playlist`] is a named, ordered list of [`Track`]s. Order is exactly the
//! sequence produced by inserts and reorders; nothing here sorts tracks.
//! [`PlayerState`] is the whole persisted tree: every playlist plus the
//! current playlist and current track references.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single playable video reference with display metadata.
///
/// The id is the YouTube video identifier. Two tracks may share an id within
/// one playlist when the same video is added twice.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Video identifier (11 characters for real YouTube videos).
    pub id: String,
    /// Video title.
    pub title: String,
    /// Thumbnail image URL.
    pub thumbnail_url: String,
    /// Duration in whole seconds.
    pub duration: u64,
}

impl Track {
    /// Create a new track.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        thumbnail_url: impl Into<String>,
        duration: u64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            thumbnail_url: thumbnail_url.into(),
            duration,
        }
    }

    /// The video identifier to hand to the player widget.
    #[must_use]
    pub fn video_id(&self) -> &str {
        &self.id
    }
}

/// Opaque playlist identifier, generated once at creation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(String);

impl PlaylistId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// View the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlaylistId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PlaylistId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, ordered collection of tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Unique identifier.
    pub id: PlaylistId,
    /// Display name.
    pub name: String,
    /// Tracks in playback order.
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Playlist {
    /// Create an empty playlist with a freshly generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PlaylistId::generate(),
            name: name.into(),
            tracks: Vec::new(),
        }
    }

    /// Number of tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the playlist has no tracks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Index of the first track with the given id.
    #[must_use]
    pub fn position_of(&self, track_id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == track_id)
    }

    /// Whether any track has the given id.
    #[must_use]
    pub fn contains_track(&self, track_id: &str) -> bool {
        self.tracks.iter().any(|t| t.id == track_id)
    }

    /// Total duration of all tracks in seconds.
    #[must_use]
    pub fn total_duration(&self) -> u64 {
        self.tracks.iter().map(|t| t.duration).sum()
    }
}

/// The complete player state tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    /// All playlists, in creation order.
    #[serde(default)]
    pub playlists: Vec<Playlist>,
    /// The playlist shown in the view, if any.
    #[serde(default)]
    pub current_playlist_id: Option<PlaylistId>,
    /// The track loaded in the player, independent of its playlist.
    #[serde(default)]
    pub current_track: Option<Track>,
}

impl PlayerState {
    /// Find a playlist by id.
    #[must_use]
    pub fn playlist(&self, id: &PlaylistId) -> Option<&Playlist> {
        self.playlists.iter().find(|p| &p.id == id)
    }

    /// Find a playlist by id (mutable).
    pub fn playlist_mut(&mut self, id: &PlaylistId) -> Option<&mut Playlist> {
        self.playlists.iter_mut().find(|p| &p.id == id)
    }

    /// The current playlist, if the reference resolves.
    #[must_use]
    pub fn current_playlist(&self) -> Option<&Playlist> {
        self.current_playlist_id
            .as_ref()
            .and_then(|id| self.playlist(id))
    }

    /// Clear a current playlist reference that points at nothing.
    ///
    /// Returns true if the reference was cleared.
    pub fn reconcile(&mut self) -> bool {
        let dangling = self
            .current_playlist_id
            .as_ref()
            .is_some_and(|id| self.playlist(id).is_none());
        if dangling {
            self.current_playlist_id = None;
        }
        dangling
    }
}

/// Move the element at `from` so that it ends up at index `to`.
///
/// Elements in between shift by one, matching what a drag-and-drop list does.
/// Returns false and leaves the slice untouched if either index is out of range.
pub fn move_item<T>(items: &mut [T], from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    if from < to {
        items[from..=to].rotate_left(1);
    } else if from > to {
        items[to..=from].rotate_right(1);
    }
    true
}

/// Whether `candidate` holds exactly the same tracks as `current`, in any order.
///
/// Duplicates count: a playlist with a video twice must be reordered into a
/// sequence that also has it twice.
#[must_use]
pub fn is_permutation(current: &[Track], candidate: &[Track]) -> bool {
    if current.len() != candidate.len() {
        return false;
    }
    let mut a: Vec<&Track> = current.iter().collect();
    let mut b: Vec<&Track> = candidate.iter().collect();
    a.sort();
    b.sort();
    a == b
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track::new(id, format!("Title {id}"), format!("https://i/{id}.jpg"), 60)
    }

    #[test]
    fn test_playlist_ids_are_unique() {
        let a = Playlist::new("A");
        let b = Playlist::new("A");
        assert_ne!(a.id, b.id);
        assert!(a.is_empty());
    }

    #[test]
    fn test_move_item_forward() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        assert!(move_item(&mut items, 0, 2));
        assert_eq!(items, vec!['b', 'c', 'a', 'd']);
    }

    #[test]
    fn test_move_item_backward() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        assert!(move_item(&mut items, 3, 1));
        assert_eq!(items, vec!['a', 'd', 'b', 'c']);
    }

    #[test]
    fn test_move_item_out_of_range() {
        let mut items = vec!['a', 'b'];
        assert!(!move_item(&mut items, 0, 5));
        assert_eq!(items, vec!['a', 'b']);
    }

    #[test]
    fn test_is_permutation_with_duplicates() {
        let current = vec![track("a"), track("b"), track("a")];
        assert!(is_permutation(
            &current,
            &[track("a"), track("a"), track("b")]
        ));
        assert!(!is_permutation(
            &current,
            &[track("a"), track("b"), track("b")]
        ));
        assert!(!is_permutation(&current, &[track("a"), track("b")]));
    }

    #[test]
    fn test_reconcile_clears_dangling_reference() {
        let mut state = PlayerState {
            current_playlist_id: Some(PlaylistId::from("missing")),
            ..Default::default()
        };
        assert!(state.reconcile());
        assert!(state.current_playlist_id.is_none());
        assert!(!state.reconcile());
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let mut playlist = Playlist::new("Mix");
        playlist.tracks.push(track("dQw4w9WgXcQ"));
        let state = PlayerState {
            current_playlist_id: Some(playlist.id.clone()),
            current_track: Some(track("dQw4w9WgXcQ")),
            playlists: vec![playlist],
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"currentPlaylistId\""));
        assert!(json.contains("\"thumbnailUrl\""));
        let back: PlayerState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_total_duration() {
        let mut playlist = Playlist::new("Mix");
        playlist.tracks.push(track("a"));
        playlist.tracks.push(track("b"));
        assert_eq!(playlist.total_duration(), 120);
        assert_eq!(playlist.position_of("b"), Some(1));
        assert!(!playlist.contains_track("c"));
    }
}
