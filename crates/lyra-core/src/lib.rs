//! `Lyra` Player Core Library
//!
//! This crate provides the core of the `Lyra` YouTube playlist player:
//! - Video URL parsing and metadata lookup through the `YouTube` Data API
//! - A persisted playlist store with command-based mutation
//! - A playback surface that keeps an embedded video widget in step with the
//!   current track, and the background bridge that drives it
//! - The playlist panel view model
//! - Application configuration and logging setup
//!
//! # Error Handling
//!
//! All fallible operations return [`Result`] with the crate [`Error`]. See the
//! [`error`] module for how each kind is surfaced.
//!
//! ```rust,ignore
//! use lyra_core::{PlaylistStore, Track};
//!
//! let mut store = PlaylistStore::in_memory();
//! let favorites = store.create_playlist("Favorites");
//! store.add_track(&favorites, Track::new("dQw4w9WgXcQ", "Song", "https://i/t.jpg", 213));
//! ```

pub mod app;
pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;
pub mod playback;
pub mod playlist;
pub mod storage;
pub mod store;
pub mod view;
pub mod youtube;

pub use app::LyraApp;
pub use bridge::{PlaybackBridge, PlaybackBridgeHandle, WidgetFactory};
pub use config::{API_KEY_ENV_VARS, AppConfig, CatalogConfig, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::{Error, ErrorKind, PlaylistError, Result};
pub use logging::{LogRotation, LoggingConfig, LoggingGuard};
pub use playback::{
    PlaybackSurface, SurfaceAction, SurfaceState, VideoWidget, WidgetEvent, WidgetState,
};
pub use playlist::{PlayerState, Playlist, PlaylistId, Track};
pub use storage::{FileStorage, MemoryStorage, StateStorage};
pub use store::{PlaylistStore, STORAGE_KEY, StoreCommand};
pub use view::{PendingSubmission, PlaylistView, SubmitOutcome, format_duration};
pub use youtube::{
    DEFAULT_API_BASE_URL, VIDEO_ID_LEN, VideoCatalog, VideoMetadata, VideoUrlType,
    VideoUrlValidation, YouTubeDataApi, extract_video_id, parse_duration, parse_video_response,
    resolve_track, validate_video_url, youtube_thumbnail_url,
};
