pub mod controller;
pub mod gst_backend;
pub mod tracks;

pub use controller::{ControlSurface, PlaybackController, PlaybackEvent};
pub use gst_backend::GstBackend;

use controller::TrackBackend;
use log::{error, info};
use tokio::sync::{mpsc, watch};

pub enum Command {
    PlayPause,
    Next,
    Previous,
    Stop,
    TrackFinished,
}

/// The single serialization point for all playback mutation: user commands
/// and track-completion signals arrive on the same queue and are applied to
/// the controller one at a time. Every handled command is followed by a
/// control-surface refresh for the notification presenter; `Stop` tears the
/// controller down, fires the stop signal and ends the loop.
pub async fn run_playback<B: TrackBackend>(
    mut controller: PlaybackController<B>,
    mut commands: mpsc::Receiver<Command>,
    surfaces: mpsc::Sender<ControlSurface>,
    stop_signal: watch::Sender<()>,
) {
    // Render once at startup so the notification controls exist before the
    // first command arrives.
    let _ = surfaces.send(controller.control_surface()).await;

    while let Some(command) = commands.recv().await {
        match command {
            Command::PlayPause => {
                info!("Toggle play/pause");
                if let Err(e) = controller.play_or_pause() {
                    error!("Failed to toggle playback: {e}");
                }
            }
            Command::Next => {
                info!("Play next song");
                if let Err(e) = controller.next() {
                    error!("Failed to play next track: {e}");
                }
            }
            Command::Previous => {
                info!("Play previous song");
                if let Err(e) = controller.previous() {
                    error!("Failed to play previous track: {e}");
                }
            }
            Command::TrackFinished => {
                info!("Track finished playing, advancing");
                if let Err(e) = controller.track_completed() {
                    error!("Failed to play next track: {e}");
                }
            }
            Command::Stop => {
                controller.teardown();
                let _ = stop_signal.send(());
                break;
            }
        }
        let _ = surfaces.send(controller.control_surface()).await;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::controller::{ActiveTrack, PlaybackController, PlaybackEvent, TrackBackend};
    use super::tracks::Track;
    use crate::error::App;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tokio::sync::broadcast;

    pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

    pub struct StubPlayer {
        playing: bool,
        log: CallLog,
    }

    impl ActiveTrack for StubPlayer {
        fn start(&mut self) -> Result<(), App> {
            self.playing = true;
            self.log.lock().unwrap().push("start");
            Ok(())
        }

        fn pause(&mut self) -> Result<(), App> {
            self.playing = false;
            self.log.lock().unwrap().push("pause");
            Ok(())
        }

        fn is_playing(&self) -> bool {
            self.playing
        }

        fn release(&mut self) {
            self.log.lock().unwrap().push("release");
        }
    }

    pub struct StubBackend {
        fail: bool,
        log: CallLog,
    }

    impl TrackBackend for StubBackend {
        type Player = StubPlayer;

        fn create(&self, _track: &Track) -> Result<StubPlayer, App> {
            if self.fail {
                return Err(App::TrackLoad("stub refused to load".to_string()));
            }
            self.log.lock().unwrap().push("create");
            Ok(StubPlayer {
                playing: false,
                log: Arc::clone(&self.log),
            })
        }
    }

    fn stub_tracks() -> Vec<Track> {
        (1..=3)
            .map(|n| Track::new(PathBuf::from(format!("/stub/song{n}.ogg"))))
            .collect()
    }

    fn build(fail: bool) -> (
        PlaybackController<StubBackend>,
        broadcast::Receiver<PlaybackEvent>,
        CallLog,
    ) {
        let log = CallLog::default();
        let (events, receiver) = broadcast::channel(16);
        let backend = StubBackend {
            fail,
            log: Arc::clone(&log),
        };
        (
            PlaybackController::new(stub_tracks(), backend, events),
            receiver,
            log,
        )
    }

    pub fn new_controller() -> (
        PlaybackController<StubBackend>,
        broadcast::Receiver<PlaybackEvent>,
        CallLog,
    ) {
        build(false)
    }

    pub fn failing_controller() -> (
        PlaybackController<StubBackend>,
        broadcast::Receiver<PlaybackEvent>,
        CallLog,
    ) {
        build(true)
    }
}
