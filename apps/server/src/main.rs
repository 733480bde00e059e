use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use rd_core::{
	config::AppConfig,
	infra::daemon::bootstrap::{initialize_tracing_with_file_logging, start_default_server},
	ops::reset::ChannelTrigger,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod executor;

use executor::ResetExecutor;

const EXECUTOR_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "rd-server", about = "Factory reset daemon")]
struct Args {
	/// Path to the daemon data directory
	#[arg(long, env = "RESETD_DATA_DIR")]
	data_dir: Option<PathBuf>,

	/// Configuration file to use instead of the one in the data directory
	#[arg(long)]
	config: Option<PathBuf>,

	/// Address to listen on, overriding the configuration
	#[arg(long)]
	listen: Option<String>,

	/// Refuse zero-fill requests
	#[arg(long, default_value_t = false)]
	zero_fill_unsupported: bool,

	/// Refuse factory OS reinstall requests
	#[arg(long, default_value_t = false)]
	factory_os_unsupported: bool,
}

impl Args {
	fn load_config(&self) -> Result<AppConfig> {
		let mut config = match (&self.config, &self.data_dir) {
			(Some(path), _) => AppConfig::load_file(path)?,
			(None, Some(data_dir)) => AppConfig::load_from(data_dir)?,
			(None, None) => AppConfig::load()?,
		};

		if let Some(data_dir) = &self.data_dir {
			config.data_dir.clone_from(data_dir);
		}
		if let Some(listen) = &self.listen {
			config.listen_addr.clone_from(listen);
		}
		// Flags can only take capabilities away
		config.reset.zero_fill_unsupported |= self.zero_fill_unsupported;
		config.reset.factory_os_unsupported |= self.factory_os_unsupported;

		Ok(config)
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	let config = args.load_config().context("Failed to load configuration")?;

	initialize_tracing_with_file_logging(&config.data_dir, &config.log_level)?;

	let (trigger, resets) = ChannelTrigger::new();
	let executor = tokio::spawn(ResetExecutor::new(config.reset.command.clone()).run(resets));

	let shutdown = CancellationToken::new();

	// Set up signal handling for graceful shutdown
	tokio::spawn({
		let shutdown = shutdown.clone();
		async move {
			wait_for_signal().await;
			shutdown.cancel();
		}
	});

	start_default_server(config, trigger, shutdown).await?;

	// Resets already queued get a bounded chance to be handed off
	if tokio::time::timeout(EXECUTOR_DRAIN_TIMEOUT, executor).await.is_err() {
		tracing::warn!("Reset executor still busy, exiting anyway");
	}

	Ok(())
}

async fn wait_for_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			tracing::error!("Failed to install Ctrl+C handler: {e}");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut sigterm) => {
				sigterm.recv().await;
			}
			Err(e) => {
				tracing::error!("Failed to install SIGTERM handler: {e}");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => info!("Received Ctrl+C, shutting down gracefully..."),
		() = terminate => info!("Received SIGTERM, shutting down gracefully..."),
	}
}
