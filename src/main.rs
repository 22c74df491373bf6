//! LotteryClient - Main Entry Point
//!
//! Reads the agency's bets, submits them to the lottery server in batches and
//! waits for the agency's winners.

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use lottery_client::config::load_config;
use lottery_client::{
    AgencyFileSource, ClientSettings, LotteryClient, ProtocolDriver, Session, StopFlag,
    TcpConnector, TokioSleeper, WinnersQuery,
};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Agency identifier; overrides the config file
    #[arg(long, env = "CLI_ID")]
    agency: Option<u32>,

    /// Lottery server address (host:port); overrides the config file
    #[arg(long, env = "CLI_SERVER_ADDRESS")]
    server: Option<String>,

    /// Path of the agency bet file; overrides the config file
    #[arg(long)]
    data: Option<String>,
}

fn parse_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let mut config = load_config(Some(&args.config))?;
    if let Some(agency) = args.agency {
        config.client.id = agency;
    }
    if let Some(server) = args.server {
        config.client.server_address = server;
    }
    if let Some(data) = args.data {
        config.data.path = data;
    }

    // Initialize logging; RUST_LOG wins over the configured level
    let level = parse_level(args.log_level.as_deref().unwrap_or(&config.settings.log_level));
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(
        action = "config",
        result = "success",
        client_id = config.client.id,
        server_address = %config.client.server_address,
        loop_amount = config.client.loop_amount,
        loop_period_ms = config.client.loop_period_ms,
        max_amount = config.batch.max_amount,
        log_level = %level
    );

    let stop = StopFlag::new();
    let signal_stop = stop.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!(action = "stop_client", result = "in_progress");
        signal_stop.stop();
    });

    let session = Session::new(
        TcpConnector::new(config.client.server_address.clone()),
        config.batch.max_amount,
    )?;
    let driver = ProtocolDriver::new(TokioSleeper).with_backoff(config.settings.winners_backoff());
    let mut client =
        LotteryClient::new(ClientSettings::from(&config), session, driver).with_stop_flag(stop);
    let mut source = AgencyFileSource::new(&config.data.path, config.batch.max_amount);

    let outcome = client.run(&mut source).await;
    client.close().await;

    match outcome {
        Ok(report) => {
            match &report.winners {
                Some(WinnersQuery::Drawn(winners)) => {
                    info!(
                        action = "consulta_ganadores",
                        result = "success",
                        client_id = config.client.id,
                        cant_ganadores = winners.len()
                    );
                }
                _ => info!(
                    action = "loop_finished",
                    result = "success",
                    client_id = config.client.id,
                    batches = report.batches_sent,
                    stopped = report.stopped
                ),
            }
            Ok(())
        }
        Err(e) => {
            error!(action = "client_run", result = "fail", client_id = config.client.id, error = %e);
            Err(e.into())
        }
    }
}
