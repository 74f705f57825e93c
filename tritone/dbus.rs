use crate::error::App;
use crate::player::{Command, PlaybackEvent};
use log::{error, info};
use tokio::sync::{broadcast, mpsc, watch};
use zbus::object_server::SignalContext;
use zbus::{fdo, interface, ConnectionBuilder};

const BUS_NAME: &str = "org.tritone.Player";
const OBJECT_PATH: &str = "/org/tritone/Player";

pub struct PlayerDBus {
    tx: mpsc::Sender<Command>,
}

impl PlayerDBus {
    async fn send(&self, command: Command) -> fdo::Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))
    }
}

#[interface(name = "org.tritone.Player")]
impl PlayerDBus {
    async fn test_connection(&self) -> fdo::Result<()> {
        Ok(())
    }

    async fn play_pause(&self) -> fdo::Result<()> {
        self.send(Command::PlayPause).await
    }

    async fn next(&self) -> fdo::Result<()> {
        self.send(Command::Next).await
    }

    async fn previous(&self) -> fdo::Result<()> {
        self.send(Command::Previous).await
    }

    async fn stop(&self) -> fdo::Result<()> {
        self.send(Command::Stop).await
    }

    /// Emitted on every playback transition.
    #[zbus(signal)]
    async fn playback_state(
        ctxt: &SignalContext<'_>,
        is_playing: bool,
        current_song_index: u32,
    ) -> zbus::Result<()>;
}

/// Serves the command interface and re-emits every playback event as the
/// `PlaybackState` signal until the stop signal fires.
pub async fn run_dbus_server(
    command_sender: mpsc::Sender<Command>,
    mut events: broadcast::Receiver<PlaybackEvent>,
    stop_signal: watch::Sender<()>,
) -> Result<(), App> {
    let player_dbus = PlayerDBus { tx: command_sender };

    let connection = ConnectionBuilder::session()?
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, player_dbus)?
        .build()
        .await?;

    let ctxt = SignalContext::new(&connection, OBJECT_PATH)?;
    let mut stop_receiver = stop_signal.subscribe();

    loop {
        tokio::select! {
            _ = stop_receiver.changed() => {
                info!("Stop signal received, shutting down DBus server...");
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if let Err(e) = PlayerDBus::playback_state(
                            &ctxt,
                            event.is_playing,
                            event.current_song_index,
                        )
                        .await
                        {
                            error!("Failed to emit playback state signal: {e}");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        error!("Playback event stream lagged, skipped {skipped} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    Ok(())
}
