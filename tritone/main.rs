mod config;
mod dbus;
mod error;
mod notify;
mod player;

use crate::config::Config;
use crate::error::App;
use crate::player::{run_playback, tracks, Command, GstBackend, PlaybackController};
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming};
use log::{error, info, warn};
use std::process;
use tokio::fs;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task;

#[tokio::main]
async fn main() -> Result<(), App> {
    let home_dir = std::env::var("HOME")
        .map_err(|e| App::Io(format!("Failed to get HOME environment variable: {e}")))?;

    let config_dir = format!("{home_dir}/.config/tritone");
    let log_dir = format!("{config_dir}/logs");
    fs::create_dir_all(&log_dir).await?;

    // Logger setup
    Logger::try_with_str("info")?
        .log_to_file(FileSpec::default().directory(&log_dir))
        .rotate(
            Criterion::Size(1_000_000),
            Naming::Timestamps,
            Cleanup::KeepLogFiles(3),
        )
        .duplicate_to_stderr(Duplicate::None)
        .start()?;

    let config = Config::load(&format!("{config_dir}/config.toml")).await?;
    let assets_dir = config.assets_dir();
    let track_list = tracks::bundled(&assets_dir);
    for track in &track_list {
        if !track.path().exists() {
            warn!("Bundled track {} is missing", track.path().display());
        }
    }

    let (command_sender, command_receiver) = mpsc::channel(8);
    let (event_sender, _) = broadcast::channel(16);
    let (surface_sender, surface_receiver) = mpsc::channel(8);
    let (stop_sender, mut stop_receiver) = watch::channel(());

    let backend = GstBackend::new(command_sender.clone())?;
    let controller = PlaybackController::new(track_list, backend, event_sender.clone());

    let dbus_task = task::spawn({
        let command_sender = command_sender.clone();
        let events = event_sender.subscribe();
        let stop_sender = stop_sender.clone();
        async move {
            if let Err(e) = dbus::run_dbus_server(command_sender, events, stop_sender).await {
                error!("DBus server error: {e}");
            }
        }
    });

    let presenter_task = task::spawn({
        let command_sender = command_sender.clone();
        let stop_sender = stop_sender.clone();
        async move {
            if let Err(e) = notify::run_presenter(surface_receiver, command_sender, stop_sender).await
            {
                error!("Notification presenter error: {e}");
            }
        }
    });

    let playback_task = task::spawn({
        let stop_sender = stop_sender.clone();
        async move {
            run_playback(controller, command_receiver, surface_sender, stop_sender).await;
        }
    });

    info!("tritone is ready");
    let interrupted = tokio::select! {
        _ = stop_receiver.changed() => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        info!("Interrupt received, shutting down");
        let _ = command_sender.send(Command::Stop).await;
        let _ = stop_receiver.changed().await;
    }

    // The presenter still has a notification to close on the bus; let every
    // task finish its shutdown before the process goes away.
    let _ = playback_task.await;
    let _ = presenter_task.await;
    let _ = dbus_task.await;
    process::exit(0);
}
