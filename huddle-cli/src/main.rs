use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Input;
use huddle_client::media::{LoggingOutput, RtcMediaBackend};
use huddle_client::transport::WsConnector;
use huddle_client::{ClientConfig, SessionController, SessionEnd};
use huddle_core::RoomId;
use huddle_server::{ServerConfig, SignalingService, serve_on};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(about = "Full-mesh audio rooms")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Serve {
        #[arg(long, env = "HUDDLE_BIND", default_value_t = ServerConfig::default().bind)]
        bind: SocketAddr,
    },
    /// Join a room and stay until `q` or ctrl-c.
    Join {
        /// Room to join. Prompted for when omitted.
        room: Option<String>,

        #[arg(long, env = "HUDDLE_SIGNALING_URL")]
        url: Option<String>,

        /// JSON client config (`signalingUrl`, `iceServers`).
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        muted: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Commands::Serve { bind } => run_server(ServerConfig { bind }).await,
        Commands::Join {
            room,
            url,
            config,
            muted,
        } => {
            let mut client_config = match config {
                Some(path) => ClientConfig::from_json_file(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?,
                None => ClientConfig::default(),
            };
            if let Some(url) = url {
                client_config = client_config.with_signaling_url(url);
            }
            let room = match room {
                Some(room) => room,
                None => Input::<String>::new()
                    .with_prompt("Room")
                    .interact_text()
                    .context("Failed to read room name")?,
            };
            run_client(client_config, RoomId::from(room), muted).await
        }
    }
}

async fn run_server(config: ServerConfig) -> Result<()> {
    println!("{}", "Starting huddle relay...".green().bold());
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    serve_on(listener, SignalingService::new(), async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down");
    })
    .await
}

async fn run_client(config: ClientConfig, room: RoomId, muted: bool) -> Result<()> {
    let backend = Arc::new(RtcMediaBackend::from_config(&config));
    let mut controller = SessionController::new(
        config,
        backend,
        Arc::new(WsConnector),
        Arc::new(LoggingOutput::new()),
    );
    controller.set_muted(muted);

    controller
        .join(room.clone())
        .await
        .with_context(|| format!("Failed to join room {room}"))?;

    println!(
        "{} {} as {}",
        "Joined".green().bold(),
        room.to_string().cyan(),
        controller.participant_id().to_string().yellow()
    );
    println!("{}", "m = toggle mute, q = leave".dimmed());

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let end = loop {
        tokio::select! {
            _ = ticker.tick() => print_status(&controller),
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match line.trim() {
                    "m" => {
                        controller.toggle_muted();
                    }
                    "q" => break controller.leave().await?,
                    "" => {}
                    other => warn!("Unknown command {:?}", other),
                },
                // Stdin closed: keep the session running until ctrl-c.
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => break controller.leave().await?,
            end = controller.wait_closed() => match end {
                Some(end) => break end,
                None => break SessionEnd::Left,
            },
        }
    };

    println!();
    match end {
        SessionEnd::Left => println!("{}", "Left the room".green()),
        SessionEnd::Disconnected(reason) => {
            println!("{} {:?}", "Disconnected:".red().bold(), reason)
        }
    }
    Ok(())
}

fn print_status(controller: &SessionController) {
    let mic = if controller.is_muted() {
        "muted".red()
    } else {
        "live".green()
    };
    print!(
        "\r{} | {} | {}   ",
        controller.elapsed_display().bold(),
        mic,
        controller.display_names().join(", ")
    );
    let _ = std::io::stdout().flush();
}
