//! Background task that connects the store to a playback surface.
//!
//! The bridge owns a [`PlaybackSurface`] and drives it from three sources:
//! current-track changes published by the store, completion of the
//! asynchronous widget initialization, and notifications from the live
//! widget. Stopping the bridge aborts any pending initialization and destroys
//! the widget before the task exits.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info};

use crate::error::Result;
use crate::playback::{PlaybackSurface, SurfaceAction, SurfaceState, VideoWidget, WidgetEvent};
use crate::playlist::Track;

/// Builds ready-to-use widgets.
///
/// `create` resolves once the embedded player reports ready. The bridge runs
/// it as its own task and aborts it if the track is cleared first.
#[async_trait]
pub trait WidgetFactory: Send + Sync + 'static {
    /// Widget type produced.
    type Widget: VideoWidget + 'static;

    /// Initialize a widget and wait until it is ready.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Widget`] if the player cannot be created.
    async fn create(&self) -> Result<Self::Widget>;
}

/// Handle for controlling a running playback bridge.
#[derive(Debug)]
pub struct PlaybackBridgeHandle {
    shutdown_tx: mpsc::Sender<()>,
    state_rx: watch::Receiver<SurfaceState>,
    task: JoinHandle<()>,
}

impl PlaybackBridgeHandle {
    /// Surface state after the last processed input.
    #[must_use]
    pub fn state(&self) -> SurfaceState {
        *self.state_rx.borrow()
    }

    /// Subscribe to surface state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<SurfaceState> {
        self.state_rx.clone()
    }

    /// Stop the bridge and wait for the widget to be released.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            error!("Playback bridge task failed: {}", e);
        }
    }
}

/// Spawns the task that keeps a playback surface in step with the store.
pub struct PlaybackBridge<F: WidgetFactory> {
    factory: Arc<F>,
}

impl<F: WidgetFactory> PlaybackBridge<F> {
    /// Create a bridge that builds widgets with `factory`.
    #[must_use]
    pub const fn new(factory: Arc<F>) -> Self {
        Self { factory }
    }

    /// Start the bridge.
    ///
    /// `current_track` comes from
    /// [`PlaylistStore::subscribe_current_track`](crate::store::PlaylistStore::subscribe_current_track);
    /// its value at start is applied immediately. `widget_events` carries
    /// notifications from whatever widget the factory produced.
    #[must_use]
    pub fn start(
        self,
        mut current_track: watch::Receiver<Option<Track>>,
        mut widget_events: mpsc::Receiver<WidgetEvent>,
    ) -> PlaybackBridgeHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (state_tx, state_rx) = watch::channel(SurfaceState::Idle);
        let factory = self.factory;

        let task = tokio::spawn(async move {
            let mut surface = PlaybackSurface::<F::Widget>::new();
            let mut pending: Option<JoinHandle<Result<F::Widget>>> = None;
            let mut tracks_open = true;
            let mut events_open = true;

            let initial = current_track.borrow_and_update().clone();
            apply_track(&mut surface, &mut pending, &factory, initial.as_ref());
            state_tx.send_replace(surface.state());

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Playback bridge shutting down");
                        break;
                    }
                    changed = current_track.changed(), if tracks_open => {
                        if changed.is_ok() {
                            let track = current_track.borrow_and_update().clone();
                            apply_track(&mut surface, &mut pending, &factory, track.as_ref());
                        } else {
                            debug!("Current track publisher closed");
                            tracks_open = false;
                        }
                    }
                    joined = wait_for_init(&mut pending) => {
                        pending = None;
                        match joined {
                            Ok(Ok(widget)) => {
                                info!("Video widget ready");
                                surface.widget_ready(widget);
                            }
                            Ok(Err(e)) => surface.initialization_failed(e),
                            Err(e) if e.is_cancelled() => debug!("Widget initialization cancelled"),
                            Err(e) => error!("Widget initialization task failed: {}", e),
                        }
                    }
                    event = widget_events.recv(), if events_open => {
                        match event {
                            Some(event) => surface.handle_event(event),
                            None => events_open = false,
                        }
                    }
                }
                state_tx.send_replace(surface.state());
            }

            if let Some(handle) = pending.take() {
                handle.abort();
            }
            surface.teardown();
            state_tx.send_replace(surface.state());
        });

        PlaybackBridgeHandle {
            shutdown_tx,
            state_rx,
            task,
        }
    }
}

fn apply_track<F: WidgetFactory>(
    surface: &mut PlaybackSurface<F::Widget>,
    pending: &mut Option<JoinHandle<Result<F::Widget>>>,
    factory: &Arc<F>,
    track: Option<&Track>,
) {
    match surface.sync_track(track) {
        SurfaceAction::InitializeWidget => {
            if pending.is_none() {
                let factory = Arc::clone(factory);
                *pending = Some(tokio::spawn(async move { factory.create().await }));
            }
        }
        SurfaceAction::CancelInitialization => {
            if let Some(handle) = pending.take() {
                debug!("Aborting widget initialization");
                handle.abort();
            }
        }
        SurfaceAction::None => {}
    }
}

async fn wait_for_init<T>(
    pending: &mut Option<JoinHandle<T>>,
) -> std::result::Result<T, JoinError> {
    match pending {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
