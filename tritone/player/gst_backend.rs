use crate::error::App;
use crate::player::controller::{ActiveTrack, TrackBackend};
use crate::player::tracks::Track;
use crate::player::Command;
use futures_util::stream::StreamExt;
use gstreamer::prelude::*;
use gstreamer::MessageView;
use log::{error, info};
use tokio::sync::mpsc;
use tokio::task;

/// GStreamer-backed track playback. One `playbin` element per active track;
/// the element is created on track start and torn down on release.
pub struct GstBackend {
    completion: mpsc::Sender<Command>,
}

impl GstBackend {
    /// Initialises GStreamer. Natural track completion is reported as a
    /// [`Command::TrackFinished`] on the given sender so it lines up behind
    /// any user command already in the queue.
    pub fn new(completion: mpsc::Sender<Command>) -> Result<Self, App> {
        gstreamer::init().map_err(|e| App::Init(e.to_string()))?;
        info!("GStreamer initialised successfully.");
        Ok(Self { completion })
    }
}

impl TrackBackend for GstBackend {
    type Player = GstPlayer;

    fn create(&self, track: &Track) -> Result<GstPlayer, App> {
        let uri = track.uri()?;
        let playbin = gstreamer::ElementFactory::make("playbin")
            .property("uri", &uri)
            .build()?;
        let bus = playbin
            .bus()
            .ok_or_else(|| App::Pipeline("Failed to get GStreamer bus".to_string()))?;

        let completion = self.completion.clone();
        let watch = task::spawn(bus.stream().for_each(move |msg| {
            let completion = completion.clone();
            async move {
                match msg.view() {
                    MessageView::Eos(_) => {
                        info!("EOS message received, sending completion signal.");
                        if completion.send(Command::TrackFinished).await.is_err() {
                            error!("Failed to send track completion signal");
                        }
                    }
                    MessageView::Error(err) => {
                        error!("Error from GStreamer pipeline: {err}");
                    }
                    _ => (),
                }
            }
        }));

        Ok(GstPlayer {
            element: playbin,
            watch,
        })
    }
}

pub struct GstPlayer {
    element: gstreamer::Element,
    watch: task::JoinHandle<()>,
}

impl ActiveTrack for GstPlayer {
    fn start(&mut self) -> Result<(), App> {
        self.element
            .set_state(gstreamer::State::Playing)
            .map(|_| ())
            .map_err(|_| App::State("Failed to set pipeline to Playing".to_string()))
    }

    fn pause(&mut self) -> Result<(), App> {
        self.element
            .set_state(gstreamer::State::Paused)
            .map(|_| ())
            .map_err(|_| App::State("Failed to set pipeline to Paused".to_string()))
    }

    fn is_playing(&self) -> bool {
        // A state change may still be in flight right after start or pause;
        // the pending state is the truth in that window.
        let (_, current, pending) = self.element.state(gstreamer::ClockTime::ZERO);
        if pending == gstreamer::State::VoidPending {
            current == gstreamer::State::Playing
        } else {
            pending == gstreamer::State::Playing
        }
    }

    fn release(&mut self) {
        // Stop the bus watch first so a stale EOS cannot queue a completion
        // for a track that is being replaced.
        self.watch.abort();
        if self.element.set_state(gstreamer::State::Null).is_err() {
            error!("Failed to set pipeline to Null");
        }
    }
}
