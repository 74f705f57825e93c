use crate::error::App;
use crate::player::{Command, ControlSurface};
use futures_util::stream::{Stream, StreamExt};
use log::{error, info};
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};
use zbus::zvariant::Value;
use zbus::{proxy, Connection};

const APP_NAME: &str = "tritone";
const SUMMARY: &str = "Music Player";
const URGENCY_LOW: u8 = 0;
const ACTIONS: [&str; 6] = [
    "previous",
    "Previous",
    "play-pause",
    "Play/Pause",
    "next",
    "Next",
];

#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    #[allow(clippy::too_many_arguments)]
    async fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: HashMap<&str, &Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;

    async fn close_notification(&self, id: u32) -> zbus::Result<()>;

    #[zbus(signal)]
    fn action_invoked(&self, id: u32, action_key: String) -> zbus::Result<()>;

    #[zbus(signal)]
    fn notification_closed(&self, id: u32, reason: u32) -> zbus::Result<()>;
}

/// The external notification renderer: posts one control surface, returning
/// the notification id, and closes a posted one.
trait NotificationPort {
    async fn post(&mut self, replaces_id: u32, surface: &ControlSurface) -> Result<u32, App>;
    async fn close(&mut self, id: u32) -> Result<(), App>;
}

impl NotificationPort for NotificationsProxy<'_> {
    async fn post(&mut self, replaces_id: u32, surface: &ControlSurface) -> Result<u32, App> {
        let icon = if surface.playing {
            "media-playback-pause"
        } else {
            "media-playback-start"
        };
        let urgency = Value::from(URGENCY_LOW);
        let mut hints = HashMap::new();
        hints.insert("urgency", &urgency);

        let id = self
            .notify(
                APP_NAME,
                replaces_id,
                icon,
                SUMMARY,
                &surface.body,
                &ACTIONS,
                hints,
                0,
            )
            .await?;
        Ok(id)
    }

    async fn close(&mut self, id: u32) -> Result<(), App> {
        self.close_notification(id).await?;
        Ok(())
    }
}

struct Presenter<P: NotificationPort> {
    port: P,
    replaces_id: u32,
    last: Option<ControlSurface>,
}

impl<P: NotificationPort> Presenter<P> {
    fn new(port: P) -> Self {
        Self {
            port,
            replaces_id: 0,
            last: None,
        }
    }

    /// Posts the control surface, replacing the previous notification so a
    /// single entry stays in the shade. Identical consecutive surfaces are
    /// not re-posted at all.
    async fn render(&mut self, surface: &ControlSurface) -> Result<(), App> {
        if self.last.as_ref() == Some(surface) {
            return Ok(());
        }
        let id = self.port.post(self.replaces_id, surface).await?;
        self.replaces_id = id;
        self.last = Some(surface.clone());
        Ok(())
    }

    /// Re-posts the last surface as a fresh notification after the server
    /// reported ours closed (e.g. dismissed by the user).
    async fn reopen(&mut self) -> Result<(), App> {
        let Some(surface) = self.last.take() else {
            return Ok(());
        };
        self.replaces_id = 0;
        self.render(&surface).await
    }

    async fn dismiss(&mut self) {
        if self.replaces_id != 0 {
            if let Err(e) = self.port.close(self.replaces_id).await {
                error!("Failed to close notification: {e}");
            }
        }
    }
}

fn command_for_action(action_key: &str) -> Option<Command> {
    match action_key {
        "previous" => Some(Command::Previous),
        "play-pause" => Some(Command::PlayPause),
        "next" => Some(Command::Next),
        // Unknown action keys are no-ops; the service stays up.
        _ => None,
    }
}

/// Keeps the persistent control notification in sync with playback and
/// feeds invoked notification actions back into the command queue. Returns
/// only after the notification has been closed on the stop path, so callers
/// can await a clean shutdown.
pub async fn run_presenter(
    surfaces: mpsc::Receiver<ControlSurface>,
    command_sender: mpsc::Sender<Command>,
    stop_signal: watch::Sender<()>,
) -> Result<(), App> {
    let connection = Connection::session().await?;
    let proxy = NotificationsProxy::new(&connection).await?;
    let actions = proxy
        .receive_action_invoked()
        .await?
        .filter_map(|signal| async move {
            signal.args().ok().map(|args| (args.id, args.action_key))
        })
        .boxed();
    let closed = proxy
        .receive_notification_closed()
        .await?
        .filter_map(|signal| async move { signal.args().ok().map(|args| args.id) })
        .boxed();
    drive_presenter(proxy, actions, closed, surfaces, command_sender, stop_signal).await
}

async fn drive_presenter<P, A, C>(
    port: P,
    mut actions: A,
    mut closed: C,
    mut surfaces: mpsc::Receiver<ControlSurface>,
    command_sender: mpsc::Sender<Command>,
    stop_signal: watch::Sender<()>,
) -> Result<(), App>
where
    P: NotificationPort,
    A: Stream<Item = (u32, String)> + Unpin,
    C: Stream<Item = u32> + Unpin,
{
    let mut presenter = Presenter::new(port);
    let mut stop_receiver = stop_signal.subscribe();

    loop {
        tokio::select! {
            _ = stop_receiver.changed() => {
                info!("Stop signal received, closing notification...");
                presenter.dismiss().await;
                break;
            }
            surface = surfaces.recv() => {
                let Some(surface) = surface else { break };
                if let Err(e) = presenter.render(&surface).await {
                    error!("Failed to update notification: {e}");
                }
            }
            Some((id, action_key)) = actions.next() => {
                if id != presenter.replaces_id {
                    continue;
                }
                if let Some(command) = command_for_action(&action_key) {
                    if command_sender.send(command).await.is_err() {
                        error!("Failed to send notification action command");
                    }
                }
            }
            Some(closed_id) = closed.next() => {
                if closed_id == presenter.replaces_id {
                    info!("Notification closed externally, re-posting controls");
                    if let Err(e) = presenter.reopen().await {
                        error!("Failed to re-post notification: {e}");
                    }
                }
            }
        }
    }
    Ok(())
}
