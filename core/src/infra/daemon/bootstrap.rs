use std::path::Path;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
	config::AppConfig,
	infra::daemon::rpc::RpcServer,
	ops::reset::ResetTrigger,
	Core,
};

/// Start a daemon server for `config`, running until `shutdown` is cancelled
pub async fn start_default_server(
	config: AppConfig,
	trigger: impl ResetTrigger + 'static,
	shutdown: CancellationToken,
) -> anyhow::Result<()> {
	info!("Starting reset daemon");
	info!("Data directory: {:?}", config.data_dir);
	info!("Listen address: {}", config.listen_addr);

	let max_connections = config.max_connections;
	let listen_addr = config.listen_addr.clone();
	let core = Core::new(config, trigger);

	let server = RpcServer::bind(&listen_addr, core)
		.await
		.with_context(|| format!("Failed to bind RPC server to {listen_addr}"))?
		.with_max_connections(max_connections)
		.with_shutdown(shutdown);

	server.run().await.context("RPC server failed")?;

	info!("Reset daemon stopped");

	Ok(())
}

/// Initialize tracing with stdout and file logging to {data_dir}/logs/daemon.log
pub fn initialize_tracing_with_file_logging(
	data_dir: &Path,
	log_level: &str,
) -> anyhow::Result<()> {
	use std::sync::Once;
	use tracing_appender::rolling::{RollingFileAppender, Rotation};
	use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

	static INIT: Once = Once::new();
	let mut result = Ok(());

	INIT.call_once(|| {
		// Ensure logs directory exists
		let logs_dir = data_dir.join("logs");
		if let Err(e) = std::fs::create_dir_all(&logs_dir) {
			result = Err(anyhow::anyhow!("Failed to create logs directory: {e}"));
			return;
		}

		// RUST_LOG wins over the configured level
		let default_filter = format!("rd_core={log_level},rd_server={log_level}");

		// Create file appender that rotates daily
		let file_appender = RollingFileAppender::new(Rotation::DAILY, logs_dir, "daemon.log");

		// Set up layered subscriber with both stdout and file output
		if let Err(e) = tracing_subscriber::registry()
			.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
			.with(
				fmt::layer()
					.with_target(true)
					.with_thread_ids(true)
					.with_writer(std::io::stdout),
			)
			.with(
				fmt::layer()
					.with_target(true)
					.with_thread_ids(true)
					.with_ansi(false) // No ANSI colors in log files
					.with_writer(file_appender),
			)
			.try_init()
		{
			result = Err(anyhow::anyhow!("Failed to initialize tracing: {e}"));
		}
	});

	result
}
