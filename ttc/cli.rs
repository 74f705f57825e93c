mod error;

use clap::{Parser, Subcommand};
use error::App;
use futures_util::stream::StreamExt;
use std::time::Duration;
use tokio::process;
use tokio::time::sleep;
use zbus::{proxy, Connection};

type StdResult<T> = std::result::Result<T, App>;

#[proxy(
    interface = "org.tritone.Player",
    default_service = "org.tritone.Player",
    default_path = "/org/tritone/Player"
)]
trait Player {
    async fn play_pause(&self) -> zbus::Result<()>;
    async fn next(&self) -> zbus::Result<()>;
    async fn previous(&self) -> zbus::Result<()>;
    async fn stop(&self) -> zbus::Result<()>;
    async fn test_connection(&self) -> zbus::Result<()>;

    #[zbus(signal)]
    fn playback_state(&self, is_playing: bool, current_song_index: u32) -> zbus::Result<()>;
}

#[derive(Parser)]
#[command(name = "ttc", about = "Control the tritone player.", version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Toggle between play and pause")]
    PlayPause,

    #[command(about = "Skip to the next track")]
    Next,

    #[command(about = "Return to the previous track")]
    Previous,

    #[command(about = "Stop the tritone service")]
    Stop,

    #[command(about = "Start the tritone service")]
    Start,

    #[command(about = "Print playback state broadcasts as they arrive")]
    Watch,
}

#[tokio::main]
async fn main() -> StdResult<()> {
    let cli = Cli::parse();
    let connection = Connection::session().await?;
    let proxy = PlayerProxy::new(&connection).await?;
    handle_command(cli, proxy).await
}

async fn handle_command(cli: Cli, proxy: PlayerProxy<'_>) -> StdResult<()> {
    match cli.command {
        Commands::PlayPause => {
            if !is_running(&proxy).await {
                eprintln!("tritone is not running, start it with `ttc start`");
                return Ok(());
            }
            proxy.play_pause().await?;
            println!("Toggled play/pause");
        }
        Commands::Next => {
            if !is_running(&proxy).await {
                eprintln!("tritone is not running, start it with `ttc start`");
                return Ok(());
            }
            proxy.next().await?;
            println!("Skipped to the next track");
        }
        Commands::Previous => {
            if !is_running(&proxy).await {
                eprintln!("tritone is not running, start it with `ttc start`");
                return Ok(());
            }
            proxy.previous().await?;
            println!("Returned to the previous track");
        }
        Commands::Stop => {
            if is_running(&proxy).await {
                proxy.stop().await?;
                println!("tritone stopped");
            } else {
                eprintln!("tritone is not running");
            }
        }
        Commands::Start => start_tritone(&proxy).await?,
        Commands::Watch => watch_state(&proxy).await?,
    }
    Ok(())
}

async fn is_running(proxy: &PlayerProxy<'_>) -> bool {
    proxy.test_connection().await.is_ok()
}

async fn start_tritone(proxy: &PlayerProxy<'_>) -> StdResult<()> {
    if is_running(proxy).await {
        eprintln!("tritone is already running");
        return Ok(());
    }

    process::Command::new("tritone").spawn()?;
    for _ in 0..10 {
        sleep(Duration::from_millis(300)).await;
        if is_running(proxy).await {
            println!("tritone started");
            return Ok(());
        }
    }
    Err(App::Startup(
        "tritone did not appear on the session bus".to_string(),
    ))
}

async fn watch_state(proxy: &PlayerProxy<'_>) -> StdResult<()> {
    if !is_running(proxy).await {
        eprintln!("tritone is not running, start it with `ttc start`");
        return Ok(());
    }
    let mut states = proxy.receive_playback_state().await?;
    println!("Watching playback state (Ctrl-C to quit)");
    while let Some(signal) = states.next().await {
        let args = signal.args()?;
        let verb = if args.is_playing { "playing" } else { "paused" };
        println!("Song {} ({verb})", args.current_song_index + 1);
    }
    Ok(())
}
