use crate::error::App;
use crate::player::tracks::Track;
use tokio::sync::broadcast;

/// One live handle to the external track-playback resource. At most one
/// exists per controller; it is released and replaced on every track change.
pub trait ActiveTrack: Send {
    fn start(&mut self) -> Result<(), App>;
    fn pause(&mut self) -> Result<(), App>;
    fn is_playing(&self) -> bool;
    fn release(&mut self);
}

/// Creates an [`ActiveTrack`] for a given bundled track.
pub trait TrackBackend: Send {
    type Player: ActiveTrack;

    fn create(&self, track: &Track) -> Result<Self::Player, App>;
}

/// State event emitted on every playback transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackEvent {
    pub is_playing: bool,
    pub current_song_index: u32,
}

/// Everything the notification presenter needs to render the controls.
/// The play/pause flag is re-derived from the live player on every build,
/// never cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlSurface {
    pub body: String,
    pub playing: bool,
}

/// Owns the current track index, the active player, and the play/pause
/// state. All mutation goes through the four operations below; each of
/// `play_or_pause`, `next`, `previous` and `track_completed` emits exactly
/// one [`PlaybackEvent`] describing the resulting state.
pub struct PlaybackController<B: TrackBackend> {
    tracks: Vec<Track>,
    current: usize,
    backend: B,
    active: Option<B::Player>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl<B: TrackBackend> PlaybackController<B> {
    pub fn new(tracks: Vec<Track>, backend: B, events: broadcast::Sender<PlaybackEvent>) -> Self {
        assert!(!tracks.is_empty(), "track list must not be empty");
        Self {
            tracks,
            current: 0,
            backend,
            active: None,
            events,
        }
    }

    /// Idle: start the current track. Playing: pause. Paused: resume.
    /// The track index never changes here.
    pub fn play_or_pause(&mut self) -> Result<(), App> {
        let outcome = if let Some(player) = self.active.as_mut() {
            if player.is_playing() {
                player.pause()
            } else {
                player.start()
            }
        } else {
            self.start_current()
        };
        self.emit();
        outcome
    }

    /// Advances to the next track, wrapping at the end of the list, and
    /// starts it. Starting a new track always plays.
    pub fn next(&mut self) -> Result<(), App> {
        self.current = (self.current + 1) % self.tracks.len();
        let outcome = self.start_current();
        self.emit();
        outcome
    }

    /// Moves back one track, wrapping to the last entry from index 0, and
    /// starts it.
    pub fn previous(&mut self) -> Result<(), App> {
        self.current = if self.current == 0 {
            self.tracks.len() - 1
        } else {
            self.current - 1
        };
        let outcome = self.start_current();
        self.emit();
        outcome
    }

    /// Natural end of the current track, delivered through the command
    /// queue. Identical effect to an explicit `next`.
    pub fn track_completed(&mut self) -> Result<(), App> {
        self.next()
    }

    /// Releases the active player and returns to Idle. Idempotent, and
    /// deliberately emits no event.
    pub fn teardown(&mut self) {
        if let Some(mut player) = self.active.take() {
            player.release();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.active.as_ref().is_some_and(ActiveTrack::is_playing)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn control_surface(&self) -> ControlSurface {
        ControlSurface {
            body: format!("Playing Song {}", self.current + 1),
            playing: self.is_playing(),
        }
    }

    /// Releases any previous player, then creates and starts one for the
    /// current index. On failure the controller is left Idle and the error
    /// is surfaced to the caller.
    fn start_current(&mut self) -> Result<(), App> {
        if let Some(mut old) = self.active.take() {
            old.release();
        }
        let track = &self.tracks[self.current];
        let mut player = self.backend.create(track).map_err(|e| {
            // Add the track number without nesting a second error prefix.
            let reason = match e {
                App::TrackLoad(reason) => reason,
                other => other.to_string(),
            };
            App::TrackLoad(format!("track {}: {reason}", self.current + 1))
        })?;
        if let Err(e) = player.start() {
            player.release();
            return Err(e);
        }
        self.active = Some(player);
        Ok(())
    }

    fn emit(&self) {
        let event = PlaybackEvent {
            is_playing: self.is_playing(),
            current_song_index: self.current_index() as u32,
        };
        // No receivers is fine; nobody is listening yet.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::testing::{failing_controller, new_controller};
    use tokio::sync::broadcast::error::TryRecvError;

    fn expect_event(
        events: &mut broadcast::Receiver<PlaybackEvent>,
        is_playing: bool,
        current_song_index: u32,
    ) {
        assert_eq!(
            events.try_recv().unwrap(),
            PlaybackEvent {
                is_playing,
                current_song_index,
            }
        );
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn next_wraps_forward_through_the_list() {
        let (mut controller, _events, _log) = new_controller();
        for n in 1..=7_usize {
            controller.next().unwrap();
            assert_eq!(controller.current_index(), n % 3);
            assert!(controller.is_playing());
        }
    }

    #[test]
    fn previous_wraps_backward_through_the_list() {
        let (mut controller, _events, _log) = new_controller();
        for n in 1..=7_usize {
            controller.previous().unwrap();
            assert_eq!(controller.current_index(), (3 - n % 3) % 3);
            assert!(controller.is_playing());
        }
    }

    #[test]
    fn play_or_pause_toggles_without_changing_the_index() {
        let (mut controller, _events, _log) = new_controller();
        assert!(!controller.is_playing());

        controller.play_or_pause().unwrap();
        assert!(controller.is_playing());
        assert_eq!(controller.current_index(), 0);

        controller.play_or_pause().unwrap();
        assert!(!controller.is_playing());
        assert_eq!(controller.current_index(), 0);

        controller.play_or_pause().unwrap();
        assert!(controller.is_playing());
        assert_eq!(controller.current_index(), 0);
    }

    #[test]
    fn skipping_always_resumes_playback() {
        let (mut controller, _events, _log) = new_controller();
        controller.play_or_pause().unwrap();
        controller.play_or_pause().unwrap();
        assert!(!controller.is_playing());

        controller.next().unwrap();
        assert!(controller.is_playing());

        controller.play_or_pause().unwrap();
        controller.previous().unwrap();
        assert!(controller.is_playing());
    }

    #[test]
    fn every_transition_broadcasts_exactly_once() {
        let (mut controller, mut events, _log) = new_controller();

        controller.play_or_pause().unwrap();
        expect_event(&mut events, true, 0);

        controller.next().unwrap();
        expect_event(&mut events, true, 1);

        controller.play_or_pause().unwrap();
        expect_event(&mut events, false, 1);

        controller.previous().unwrap();
        expect_event(&mut events, true, 0);
    }

    #[test]
    fn documented_control_sequence() {
        let (mut controller, mut events, _log) = new_controller();

        controller.play_or_pause().unwrap();
        expect_event(&mut events, true, 0);

        controller.next().unwrap();
        expect_event(&mut events, true, 1);

        controller.previous().unwrap();
        expect_event(&mut events, true, 0);
        controller.previous().unwrap();
        expect_event(&mut events, true, 2);

        controller.play_or_pause().unwrap();
        expect_event(&mut events, false, 2);
        assert_eq!(controller.current_index(), 2);
    }

    #[test]
    fn completion_behaves_like_next() {
        let (mut controller, mut events, _log) = new_controller();
        controller.next().unwrap();
        controller.next().unwrap();
        assert_eq!(controller.current_index(), 2);
        while events.try_recv().is_ok() {}

        controller.track_completed().unwrap();
        assert_eq!(controller.current_index(), 0);
        assert!(controller.is_playing());
        expect_event(&mut events, true, 0);
    }

    #[test]
    fn teardown_is_idempotent_and_silent() {
        let (mut controller, mut events, log) = new_controller();
        controller.play_or_pause().unwrap();
        while events.try_recv().is_ok() {}

        controller.teardown();
        assert!(!controller.is_playing());
        controller.teardown();
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(
            log.lock().unwrap().iter().filter(|s| **s == "release").count(),
            1
        );
    }

    #[test]
    fn failed_track_load_stays_idle_with_a_distinct_error() {
        let (mut controller, mut events, _log) = failing_controller();

        let result = controller.play_or_pause();
        assert!(matches!(result, Err(App::TrackLoad(_))));
        assert!(!controller.is_playing());
        expect_event(&mut events, false, 0);

        // The index still advances on a failed skip.
        let result = controller.next();
        assert!(matches!(result, Err(App::TrackLoad(_))));
        assert_eq!(controller.current_index(), 1);
        expect_event(&mut events, false, 1);
    }

    #[test]
    fn track_load_errors_carry_context_without_nesting() {
        let (mut controller, _events, _log) = failing_controller();
        let err = controller.play_or_pause().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Track load error: track 1: stub refused to load"
        );

        let err = controller.next().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Track load error: track 2: stub refused to load"
        );
    }

    #[test]
    fn old_player_is_released_before_the_new_one_is_created() {
        let (mut controller, _events, log) = new_controller();
        controller.play_or_pause().unwrap();
        controller.next().unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["create", "start", "release", "create", "start"]
        );
    }

    #[test]
    fn control_surface_reflects_live_state() {
        let (mut controller, _events, _log) = new_controller();
        let surface = controller.control_surface();
        assert_eq!(surface.body, "Playing Song 1");
        assert!(!surface.playing);

        controller.play_or_pause().unwrap();
        controller.next().unwrap();
        let surface = controller.control_surface();
        assert_eq!(surface.body, "Playing Song 2");
        assert!(surface.playing);

        controller.play_or_pause().unwrap();
        assert!(!controller.control_surface().playing);
    }
}
