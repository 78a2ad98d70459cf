mod config;
mod input;
mod render;

use config::ViewerConfig;
use input::Input;
use snooper_core::{Session, Snapshot, SnooperError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_stream::wrappers::{LinesStream, WatchStream};
use tokio_stream::StreamExt;
use tracing::{info, warn};

// clear screen, cursor home
const CLEAR: &str = "\x1b[2J\x1b[H";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional
    let _ = dotenvy::dotenv();

    // Logging goes to stderr so the table owns stdout
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,snooper_core=info,can_snooper=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cfg = ViewerConfig::load();
    info!(url = %cfg.url, window = cfg.window, "Starting CAN Snooper");

    let handle = Session::connect(&cfg.url, cfg.window)?;
    let mut snapshots = WatchStream::new(handle.subscribe());
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let mut stdout = tokio::io::stdout();

    let mut redraw = interval(Duration::from_millis(cfg.refresh_ms.max(1)));
    redraw.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut dirty = true;
    let mut failure: Option<SnooperError> = None;

    loop {
        tokio::select! {
            _ = redraw.tick() => {
                if dirty {
                    if let Err(e) = draw(&mut stdout, &handle.snapshot()).await {
                        failure = Some(e);
                        break;
                    }
                    dirty = false;
                }
            }
            changed = snapshots.next() => match changed {
                Some(_) => dirty = true,
                None => break,
            },
            line = lines.next() => match line {
                Some(Ok(line)) => match input::parse_line(&line) {
                    Input::Command(command) => handle.send(command).await,
                    Input::Refresh => dirty = true,
                    Input::Quit => break,
                    Input::Unknown(other) => {
                        warn!(input = %other, "Unknown command; use p, pause, resume, c, /text or q");
                    }
                },
                Some(Err(e)) => {
                    failure = Some(e.into());
                    break;
                }
                // stdin closed
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // tear down before reporting a terminal failure
    let controller = handle.shutdown().await?;
    let stats = controller.stats();
    info!(
        total = controller.total_message_count(),
        unique_signals = controller.unique_signal_count(),
        malformed = stats.malformed,
        dropped_while_paused = stats.dropped_while_paused,
        "CAN Snooper stopped"
    );
    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

async fn draw(stdout: &mut tokio::io::Stdout, snapshot: &Snapshot) -> snooper_core::Result<()> {
    let mut screen = String::from(CLEAR);
    screen.push_str(&render::render(snapshot));
    stdout.write_all(screen.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
