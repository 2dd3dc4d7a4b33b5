//! Playback surface.
//!
//! [`PlaybackSurface`] keeps an embedded video widget in step with the store's
//! current track. It never writes to the store; it only reads the current
//! track it is given and issues commands to the widget.
//!
//! ```text
//!   Idle --track set--> Loading --widget ready--> Ready
//!    ^                     |                        |
//!    +-----track cleared---+------------------------+
//! ```
//!
//! Widget construction is asynchronous and lives outside this type: when
//! [`PlaybackSurface::sync_track`] answers [`SurfaceAction::InitializeWidget`]
//! the caller starts initialization and later hands the ready widget to
//! [`PlaybackSurface::widget_ready`]. See [`crate::bridge`] for the task that
//! drives this.

use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::playlist::Track;

/// Player state reported by the widget, with the iframe API's numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetState {
    /// Nothing has played yet.
    Unstarted,
    /// Playback reached the end.
    Ended,
    /// Playing.
    Playing,
    /// Paused.
    Paused,
    /// Waiting for data.
    Buffering,
    /// A video is cued and ready to play.
    Cued,
}

impl WidgetState {
    /// Map an iframe API state code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Unstarted),
            0 => Some(Self::Ended),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            3 => Some(Self::Buffering),
            5 => Some(Self::Cued),
            _ => None,
        }
    }

    /// The iframe API state code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Unstarted => -1,
            Self::Ended => 0,
            Self::Playing => 1,
            Self::Paused => 2,
            Self::Buffering => 3,
            Self::Cued => 5,
        }
    }
}

/// Notification emitted by a live widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetEvent {
    /// The widget's player state changed.
    StateChange(WidgetState),
}

/// Control surface of an embedded video player.
///
/// Commands may fail at any time (the embed can be torn down underneath
/// us); queries report whatever the widget last knew.
#[cfg_attr(test, mockall::automock)]
pub trait VideoWidget: Send {
    /// Load and start playing a video.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Widget`] if the widget rejects the command.
    fn load_video_by_id(&mut self, video_id: &str) -> Result<()>;

    /// Load a video without playing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Widget`] if the widget rejects the command.
    fn cue_video_by_id(&mut self, video_id: &str) -> Result<()>;

    /// Start or resume playback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Widget`] if the widget rejects the command.
    fn play_video(&mut self) -> Result<()>;

    /// Pause playback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Widget`] if the widget rejects the command.
    fn pause_video(&mut self) -> Result<()>;

    /// Stop playback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Widget`] if the widget rejects the command.
    fn stop_video(&mut self) -> Result<()>;

    /// Seek to a position in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Widget`] if the widget rejects the command.
    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool) -> Result<()>;

    /// Playback position in seconds.
    fn current_time(&self) -> f64;

    /// Length of the loaded video in seconds.
    fn duration(&self) -> f64;

    /// Volume, 0 to 100.
    fn volume(&self) -> u8;

    /// Set the volume, 0 to 100.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Widget`] if the widget rejects the command.
    fn set_volume(&mut self, volume: u8) -> Result<()>;

    /// Mute audio.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Widget`] if the widget rejects the command.
    fn mute(&mut self) -> Result<()>;

    /// Unmute audio.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Widget`] if the widget rejects the command.
    fn un_mute(&mut self) -> Result<()>;

    /// Whether audio is muted.
    fn is_muted(&self) -> bool;

    /// Current player state.
    fn player_state(&self) -> WidgetState;

    /// Release the widget. No other method is called afterwards.
    fn destroy(&mut self);
}

/// Lifecycle of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SurfaceState {
    /// No current track.
    #[default]
    Idle,
    /// A track is set and the widget is being initialized.
    Loading,
    /// The widget is live.
    Ready,
}

/// What the caller must do after a track change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceAction {
    /// Nothing.
    None,
    /// Start widget initialization.
    InitializeWidget,
    /// Abort an initialization that is still pending.
    CancelInitialization,
}

/// Keeps a video widget in step with the current track.
#[derive(Debug)]
pub struct PlaybackSurface<W: VideoWidget> {
    state: SurfaceState,
    widget: Option<W>,
    video_id: Option<String>,
    observed: Option<WidgetState>,
    last_error: Option<Error>,
}

impl<W: VideoWidget> Default for PlaybackSurface<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: VideoWidget> PlaybackSurface<W> {
    /// Create an idle surface.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SurfaceState::Idle,
            widget: None,
            video_id: None,
            observed: None,
            last_error: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SurfaceState {
        self.state
    }

    /// Video id the surface is tracking.
    #[must_use]
    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    /// Last player state reported by the widget.
    #[must_use]
    pub const fn observed_state(&self) -> Option<WidgetState> {
        self.observed
    }

    /// Most recent widget failure.
    #[must_use]
    pub const fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// The live widget, if ready.
    #[must_use]
    pub const fn widget(&self) -> Option<&W> {
        self.widget.as_ref()
    }

    /// React to the store's current track.
    pub fn sync_track(&mut self, track: Option<&Track>) -> SurfaceAction {
        let Some(track) = track else {
            return self.clear_track();
        };
        let video_id = track.video_id();
        if self.video_id.as_deref() == Some(video_id) {
            return SurfaceAction::None;
        }
        self.video_id = Some(video_id.to_string());

        match self.state {
            SurfaceState::Idle => {
                debug!("Track {} selected, initializing widget", video_id);
                self.state = SurfaceState::Loading;
                SurfaceAction::InitializeWidget
            }
            // The ready handler loads whatever id is current by then.
            SurfaceState::Loading => SurfaceAction::None,
            SurfaceState::Ready => {
                self.run("load video", |w| w.load_video_by_id(video_id));
                self.run("play video", VideoWidget::play_video);
                SurfaceAction::None
            }
        }
    }

    fn clear_track(&mut self) -> SurfaceAction {
        self.video_id = None;
        let action = match self.state {
            SurfaceState::Idle => return SurfaceAction::None,
            SurfaceState::Loading => SurfaceAction::CancelInitialization,
            SurfaceState::Ready => SurfaceAction::None,
        };
        debug!("Current track cleared, releasing widget");
        self.release_widget();
        self.state = SurfaceState::Idle;
        action
    }

    /// Accept a widget whose initialization finished.
    ///
    /// Returns false, destroying the widget, if the surface no longer wants
    /// one.
    pub fn widget_ready(&mut self, mut widget: W) -> bool {
        if self.state != SurfaceState::Loading || self.widget.is_some() {
            debug!("Discarding widget that is no longer needed");
            widget.destroy();
            return false;
        }
        self.widget = Some(widget);
        self.state = SurfaceState::Ready;
        if let Some(video_id) = self.video_id.clone() {
            self.run("load video", |w| w.load_video_by_id(&video_id));
        }
        true
    }

    /// Record a failed widget initialization and return to idle.
    ///
    /// The tracked id is forgotten, so the next [`sync_track`](Self::sync_track)
    /// with any track, including the same one, starts a new initialization.
    pub fn initialization_failed(&mut self, err: Error) {
        error!("Video widget failed to initialize: {}", err);
        self.last_error = Some(err);
        self.video_id = None;
        self.state = SurfaceState::Idle;
    }

    /// Apply a widget notification.
    pub fn handle_event(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::StateChange(state) => {
                debug!("Widget state: {:?} ({})", state, state.code());
                self.observed = Some(state);
            }
        }
    }

    /// Resume playback.
    pub fn play(&mut self) {
        self.run("play video", VideoWidget::play_video);
    }

    /// Pause playback.
    pub fn pause(&mut self) {
        self.run("pause video", VideoWidget::pause_video);
    }

    /// Stop playback.
    pub fn stop(&mut self) {
        self.run("stop video", VideoWidget::stop_video);
    }

    /// Seek to a position in seconds, clamped to the loaded video.
    ///
    /// A widget that does not know its duration yet reports 0; only the lower
    /// bound applies then.
    pub fn seek(&mut self, seconds: f64) {
        self.run("seek", |w| {
            let duration = w.duration();
            let target = if duration > 0.0 {
                seconds.clamp(0.0, duration)
            } else {
                seconds.max(0.0)
            };
            w.seek_to(target, true)
        });
    }

    /// Set the volume; values above 100 are clamped.
    pub fn set_volume(&mut self, volume: u8) {
        let volume = volume.min(100);
        self.run("set volume", |w| w.set_volume(volume));
    }

    /// Mute or unmute audio.
    pub fn set_muted(&mut self, muted: bool) {
        if muted {
            self.run("mute", VideoWidget::mute);
        } else {
            self.run("unmute", VideoWidget::un_mute);
        }
    }

    /// Playback position and length in seconds.
    #[must_use]
    pub fn progress(&self) -> Option<(f64, f64)> {
        self.widget.as_ref().map(|w| (w.current_time(), w.duration()))
    }

    /// Volume and mute flag.
    #[must_use]
    pub fn audio(&self) -> Option<(u8, bool)> {
        self.widget.as_ref().map(|w| (w.volume(), w.is_muted()))
    }

    /// Player state as queried from the widget.
    #[must_use]
    pub fn player_state(&self) -> Option<WidgetState> {
        self.widget.as_ref().map(VideoWidget::player_state)
    }

    /// Release the widget and go idle.
    pub fn teardown(&mut self) {
        if self.widget.is_some() {
            info!("Tearing down playback surface");
        }
        self.release_widget();
        self.video_id = None;
        self.state = SurfaceState::Idle;
    }

    fn release_widget(&mut self) {
        if let Some(mut widget) = self.widget.take() {
            widget.destroy();
        }
        self.observed = None;
    }

    fn run<F>(&mut self, action: &str, command: F)
    where
        F: FnOnce(&mut W) -> Result<()>,
    {
        let Some(widget) = self.widget.as_mut() else {
            debug!("Ignoring {}: widget not ready", action);
            return;
        };
        if let Err(e) = command(widget) {
            error!("Failed to {}: {}", action, e);
            self.last_error = Some(e);
        }
    }
}

impl<W: VideoWidget> Drop for PlaybackSurface<W> {
    fn drop(&mut self) {
        self.release_widget();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use mockall::{Sequence, predicate::eq};

    fn track(id: &str) -> Track {
        Track::new(id, "Title", "https://i/t.jpg", 200)
    }

    fn widget_expecting_destroy() -> MockVideoWidget {
        let mut widget = MockVideoWidget::new();
        widget.expect_destroy().times(1).return_const(());
        widget
    }

    #[test]
    fn test_widget_state_codes() {
        for code in [-1, 0, 1, 2, 3, 5] {
            assert_eq!(WidgetState::from_code(code).unwrap().code(), code);
        }
        assert_eq!(WidgetState::from_code(4), None);
        assert_eq!(WidgetState::from_code(1), Some(WidgetState::Playing));
    }

    #[test]
    fn test_idle_until_track_selected() {
        let mut surface = PlaybackSurface::<MockVideoWidget>::new();
        assert_eq!(surface.state(), SurfaceState::Idle);
        assert_eq!(surface.sync_track(None), SurfaceAction::None);
        assert_eq!(surface.state(), SurfaceState::Idle);
    }

    #[test]
    fn test_select_then_ready_loads_once() {
        let mut surface = PlaybackSurface::new();
        assert_eq!(
            surface.sync_track(Some(&track("abc12345678"))),
            SurfaceAction::InitializeWidget
        );
        assert_eq!(surface.state(), SurfaceState::Loading);

        let mut widget = widget_expecting_destroy();
        widget
            .expect_load_video_by_id()
            .withf(|id: &str| id == "abc12345678")
            .times(1)
            .returning(|_| Ok(()));
        assert!(surface.widget_ready(widget));
        assert_eq!(surface.state(), SurfaceState::Ready);

        // Same track again issues nothing.
        assert_eq!(
            surface.sync_track(Some(&track("abc12345678"))),
            SurfaceAction::None
        );
    }

    #[test]
    fn test_track_change_while_loading_loads_latest() {
        let mut surface = PlaybackSurface::new();
        surface.sync_track(Some(&track("first000000")));
        assert_eq!(
            surface.sync_track(Some(&track("second00000"))),
            SurfaceAction::None
        );

        let mut widget = widget_expecting_destroy();
        widget
            .expect_load_video_by_id()
            .withf(|id: &str| id == "second00000")
            .times(1)
            .returning(|_| Ok(()));
        surface.widget_ready(widget);
    }

    #[test]
    fn test_track_change_while_ready_loads_then_plays() {
        let mut seq = Sequence::new();
        let mut widget = MockVideoWidget::new();
        widget
            .expect_load_video_by_id()
            .withf(|id: &str| id == "first000000")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        widget
            .expect_load_video_by_id()
            .withf(|id: &str| id == "second00000")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        widget
            .expect_play_video()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        widget.expect_destroy().times(1).return_const(());

        let mut surface = PlaybackSurface::new();
        surface.sync_track(Some(&track("first000000")));
        surface.widget_ready(widget);
        surface.sync_track(Some(&track("second00000")));
        assert_eq!(surface.video_id(), Some("second00000"));
    }

    #[test]
    fn test_clearing_track_while_ready_destroys_widget() {
        let mut widget = widget_expecting_destroy();
        widget.expect_load_video_by_id().returning(|_| Ok(()));

        let mut surface = PlaybackSurface::new();
        surface.sync_track(Some(&track("abc12345678")));
        surface.widget_ready(widget);

        assert_eq!(surface.sync_track(None), SurfaceAction::None);
        assert_eq!(surface.state(), SurfaceState::Idle);
        assert!(surface.widget().is_none());
    }

    #[test]
    fn test_clearing_track_while_loading_cancels_init() {
        let mut surface = PlaybackSurface::<MockVideoWidget>::new();
        surface.sync_track(Some(&track("abc12345678")));
        assert_eq!(
            surface.sync_track(None),
            SurfaceAction::CancelInitialization
        );
        assert_eq!(surface.state(), SurfaceState::Idle);
    }

    #[test]
    fn test_late_widget_is_destroyed() {
        let mut surface = PlaybackSurface::new();
        surface.sync_track(Some(&track("abc12345678")));
        surface.sync_track(None);

        let widget = widget_expecting_destroy();
        assert!(!surface.widget_ready(widget));
        assert_eq!(surface.state(), SurfaceState::Idle);
    }

    #[test]
    fn test_load_error_is_kept_not_raised() {
        let mut widget = widget_expecting_destroy();
        widget
            .expect_load_video_by_id()
            .returning(|_| Err(Error::widget_error("embed gone")));

        let mut surface = PlaybackSurface::new();
        surface.sync_track(Some(&track("abc12345678")));
        surface.widget_ready(widget);

        assert_eq!(surface.state(), SurfaceState::Ready);
        assert!(matches!(surface.last_error(), Some(Error::Widget { .. })));
    }

    #[test]
    fn test_initialization_failure_allows_retry() {
        let mut surface = PlaybackSurface::<MockVideoWidget>::new();
        surface.sync_track(Some(&track("abc12345678")));
        surface.initialization_failed(Error::widget_error("script blocked"));
        assert_eq!(surface.state(), SurfaceState::Idle);
        assert_eq!(
            surface.sync_track(Some(&track("abc12345678"))),
            SurfaceAction::InitializeWidget
        );
    }

    #[test]
    fn test_transport_controls_forward_when_ready() {
        let mut widget = widget_expecting_destroy();
        widget.expect_load_video_by_id().returning(|_| Ok(()));
        widget.expect_pause_video().times(1).returning(|| Ok(()));
        widget
            .expect_seek_to()
            .with(eq(0.0), eq(true))
            .times(1)
            .returning(|_, _| Ok(()));
        widget
            .expect_set_volume()
            .with(eq(100))
            .times(1)
            .returning(|_| Ok(()));
        widget.expect_mute().times(1).returning(|| Ok(()));
        widget.expect_current_time().return_const(12.5);
        widget.expect_duration().return_const(200.0);

        let mut surface = PlaybackSurface::new();
        surface.sync_track(Some(&track("abc12345678")));
        surface.widget_ready(widget);

        surface.pause();
        surface.seek(-3.0);
        surface.set_volume(150);
        surface.set_muted(true);
        assert_eq!(surface.progress(), Some((12.5, 200.0)));
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let mut widget = widget_expecting_destroy();
        widget.expect_load_video_by_id().returning(|_| Ok(()));
        widget.expect_duration().return_const(200.0);
        let mut seq = Sequence::new();
        for expected in [200.0, 42.0, 0.0] {
            widget
                .expect_seek_to()
                .with(eq(expected), eq(true))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(()));
        }

        let mut surface = PlaybackSurface::new();
        surface.sync_track(Some(&track("abc12345678")));
        surface.widget_ready(widget);

        surface.seek(999.0);
        surface.seek(42.0);
        surface.seek(-1.0);
    }

    #[test]
    fn test_seek_without_known_duration_keeps_lower_bound() {
        let mut widget = widget_expecting_destroy();
        widget.expect_load_video_by_id().returning(|_| Ok(()));
        widget.expect_duration().return_const(0.0);
        widget
            .expect_seek_to()
            .with(eq(30.0), eq(true))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut surface = PlaybackSurface::new();
        surface.sync_track(Some(&track("abc12345678")));
        surface.widget_ready(widget);

        surface.seek(30.0);
    }

    #[test]
    fn test_transport_controls_ignored_when_idle() {
        let mut surface = PlaybackSurface::<MockVideoWidget>::new();
        surface.play();
        surface.stop();
        assert!(surface.progress().is_none());
        assert!(surface.last_error().is_none());
    }

    #[test]
    fn test_state_change_events_are_observed() {
        let mut surface = PlaybackSurface::<MockVideoWidget>::new();
        surface.handle_event(WidgetEvent::StateChange(WidgetState::Buffering));
        assert_eq!(surface.observed_state(), Some(WidgetState::Buffering));
    }

    #[test]
    fn test_drop_destroys_widget() {
        let mut widget = widget_expecting_destroy();
        widget.expect_load_video_by_id().returning(|_| Ok(()));
        let mut surface = PlaybackSurface::new();
        surface.sync_track(Some(&track("abc12345678")));
        surface.widget_ready(widget);
        drop(surface);
    }

    #[test]
    fn test_teardown_then_drop_destroys_once() {
        let mut widget = widget_expecting_destroy();
        widget.expect_load_video_by_id().returning(|_| Ok(()));
        let mut surface = PlaybackSurface::new();
        surface.sync_track(Some(&track("abc12345678")));
        surface.widget_ready(widget);
        surface.teardown();
        assert_eq!(surface.state(), SurfaceState::Idle);
    }
}
