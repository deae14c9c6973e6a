//! CLI for statusbridge
//!
//! Subcommands:
//! - `serve`: run the MQTT to WebSocket bridge
//! - `watch`: connect to a running bridge and print what it relays

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use statusbridge::Bridge;
use statusbridge::config::{DEFAULT_CONFIG_PATH, load_config_from};
use statusbridge::upstream::MqttConnector;
use statusbridge::utils::{logging, signals};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "statusbridge", version, about)]
struct Cli {
    /// Log level: error, warn, info, debug or trace
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Relay broker messages to WebSocket clients
    Serve {
        /// Configuration file, extension optional
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,
    },
    /// Print every envelope pushed by a running bridge
    Watch {
        /// WebSocket URL of the bridge
        #[arg(long, default_value = "ws://127.0.0.1:3000")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let result = match cli.command {
        Command::Serve { config } => run_server(&config).await,
        Command::Watch { url } => run_watch(&url).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let settings = load_config_from(config_path)?;
    let connector = MqttConnector::new(&settings.upstream);

    Bridge::new(settings)
        .run_until(connector, async {
            if let Err(e) = signals::wait_for_shutdown_signal().await {
                error!("failed to listen for shutdown signals: {e}");
            }
        })
        .await?;
    Ok(())
}

async fn run_watch(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (mut ws_stream, _response) = connect_async(url).await?;
    info!("watching {url}");

    loop {
        tokio::select! {
            frame = ws_stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => println!("{}", text.as_str()),
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}
