//! CLI for nsgate
//!
//! Subcommands:
//! - `server`: run the gateway
//! - `client`: connect to a gateway and log the upgrade, handshake and events

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use nsgate::config::load_config;
use nsgate::harness::{self, HarnessOptions};
use nsgate::server::Supervisor;
use nsgate::utils::{GatewayError, logging};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "nsgate")]
enum Command {
    /// Start the gateway
    Server,
    /// Connect to a namespace and log what the gateway sends
    Client {
        /// Gateway URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        /// Namespace to join
        #[arg(long, default_value = "/")]
        namespace: String,
        /// Emit the restart event after the handshake
        #[arg(long)]
        restart: bool,
        /// Event name sent by `--restart`
        #[arg(long, default_value = "restart_server")]
        restart_event: String,
        /// Close after this long if the server has not
        #[arg(long, default_value_t = 5000)]
        linger_ms: u64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cmd = Command::parse();

    let result = match cmd {
        Command::Server => run_server().await,
        Command::Client {
            url,
            namespace,
            restart,
            restart_event,
            linger_ms,
        } => {
            logging::init("info");
            let options = HarnessOptions {
                url,
                namespace,
                emit: restart.then_some(restart_event),
                linger: Duration::from_millis(linger_ms),
            };
            harness::run(&options).await.map(|report| {
                info!(
                    status = report.status,
                    sid = ?report.sid,
                    messages = report.messages.len(),
                    closed_by_server = report.closed_by_server,
                    "client finished"
                );
            })
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // no-op when already initialised
            logging::init("info");
            error!("nsgate failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server() -> Result<(), GatewayError> {
    let settings = load_config()?;
    logging::init(&settings.logging.level);

    let mut supervisor = Supervisor::from_settings(&settings);
    supervisor.start(settings.server.port).await?;

    supervisor
        .run(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received. Exiting gracefully."),
                Err(e) => {
                    error!("Unable to listen for shutdown signal: {e}");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
}
