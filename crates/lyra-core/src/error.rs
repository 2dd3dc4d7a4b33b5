//! Error types for Lyra Player core operations.
//!
//! Errors are grouped by where they originate. The four kinds a user can run
//! into while adding or playing a track (`InvalidUrl`, `NotFound`, `Network`,
//! `Widget`) are caught at the boundary closest to their origin: the
//! [`PlaylistView`](crate::view::PlaylistView) turns the first three into an
//! inline message, and the [`PlaybackSurface`](crate::playback::PlaybackSurface)
//! logs widget failures. None of them alter the playlist store.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Playlist-specific errors raised by the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaylistError {
    /// Playlist does not exist.
    #[error("Playlist not found: {id}")]
    NotFound {
        /// The playlist id that was looked up.
        id: String,
    },

    /// Playlist name was rejected before reaching the store.
    #[error("Invalid playlist name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A reorder request was not a permutation of the playlist's tracks.
    #[error("Reorder of playlist {id} is not a permutation of its {expected} tracks")]
    NotAPermutation {
        /// The playlist id.
        id: String,
        /// Number of tracks currently in the playlist.
        expected: usize,
    },
}

/// Errors that can occur in Lyra Player core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No video identifier could be extracted from the URL.
    #[error("Invalid YouTube URL: {url}")]
    InvalidUrl {
        /// The URL as entered by the user.
        url: String,
    },

    /// The catalog has no record for the video.
    #[error("Video not found: {video_id}")]
    NotFound {
        /// The video identifier that was requested.
        video_id: String,
    },

    /// Transport or response parsing failure while talking to the catalog.
    #[error("Network error: {message}")]
    Network {
        /// Description of the failure.
        message: String,
    },

    /// The embedded video widget failed during initialization or a command.
    #[error("Video widget error: {message}")]
    Widget {
        /// Description of the failure.
        message: String,
    },

    /// Playlist operation failed.
    #[error(transparent)]
    Playlist(#[from] PlaylistError),

    /// Durable storage could not be read or written.
    #[error("Storage error for key '{key}': {message}")]
    Storage {
        /// The storage key involved.
        key: String,
        /// Error message.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse error category, used for logging and for deciding how to surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The URL did not contain a video reference.
    InvalidUrl,
    /// The catalog returned no matching video.
    NotFound,
    /// Network or response failure.
    Network,
    /// Embedded widget failure.
    Widget,
    /// Playlist store rejection.
    Playlist,
    /// Durable storage failure.
    Storage,
    /// Configuration problem.
    Configuration,
    /// Raw IO failure.
    Io,
    /// JSON encoding or decoding failure.
    Serialization,
}

impl Error {
    /// Create a network error from any message.
    pub fn network_error(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a widget error from any message.
    pub fn widget_error(message: impl Into<String>) -> Self {
        Self::Widget {
            message: message.into(),
        }
    }

    /// Create a storage error for a key.
    pub fn storage_error(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            key: key.into(),
            message: message.into(),
        }
    }

    /// The category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Network { .. } => ErrorKind::Network,
            Self::Widget { .. } => ErrorKind::Widget,
            Self::Playlist(_) => ErrorKind::Playlist,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Io(_) => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Whether the user can fix this by editing input or trying again.
    ///
    /// There is no automatic retry anywhere; a correctable error simply means
    /// the view shows a message and waits for a fresh action.
    #[must_use]
    pub const fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. } | Self::NotFound { .. } | Self::Network { .. }
        )
    }

    /// Message suitable for inline display next to the URL input.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidUrl { .. } => "Please enter a valid YouTube URL.".to_string(),
            Self::NotFound { .. } => "Video not found.".to_string(),
            Self::Network { .. } => {
                "Could not reach YouTube. Check your connection and try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}
