use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing::{error, info};

use rf_alert::config::AppConfig;
use rf_alert::listener::SignalListener;
use rf_alert::notification::AlertDispatcher;
use rf_alert::receiver::{self, ReceiverGuard};
use rf_alert::shutdown::Shutdown;
use rf_alert::{logging, panic_hook};

/// Send alerts to media center hosts and by mail when a 433 MHz code is received.
#[derive(Parser, Debug)]
#[command(name = "rf-alert", version, about, long_about = None)]
struct Args {
    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Write logs to this file instead of stdout
    #[arg(short = 'l', long = "logfile", value_name = "PATH")]
    logfile: Option<PathBuf>,

    /// Configuration file (default: ./rf-alert.toml, then the user config dir)
    #[arg(short, long, value_name = "PATH", env = "RF_ALERT_CONFIG")]
    config: Option<PathBuf>,

    /// Addon to execute on media hosts; an empty value disables it
    #[arg(short = 'a', long = "addonid", value_name = "ID")]
    addon_id: Option<String>,

    /// Dispatch one test alert for the first configured code and exit
    #[arg(short, long)]
    test: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let _log_guard = match logging::init_logging(args.debug, args.logfile.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    panic_hook::install();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = AppConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?
        .with_addon_id(args.addon_id);
    let config = Arc::new(config);
    let dispatcher = AlertDispatcher::new(config.clone());

    if args.test {
        let code = config.alerts.first();
        info!(code = %code, "Sending test alert");
        let report = dispatcher.dispatch(Local::now(), code).await;
        for outcome in &report.outcomes {
            info!("{} {}: {}", outcome.channel, outcome.target, outcome.status);
        }
        return Ok(());
    }

    let source = receiver::open_hardware(&config.receiver).context("Failed to open receiver")?;
    let guard = ReceiverGuard::acquire(source).context("Failed to enable receiver")?;

    let shutdown = Shutdown::new();
    shutdown.watch_signals();

    let mut listener = SignalListener::new(config);
    let stats = listener
        .run_guarded(guard, &dispatcher, &shutdown)
        .await
        .context("Listener stopped unexpectedly")?;
    info!(
        polls = stats.polls,
        signals = stats.signals,
        matched = stats.matched,
        ignored = stats.ignored,
        dropped_while_busy = stats.dropped_while_busy,
        "Listener stopped"
    );
    Ok(())
}
