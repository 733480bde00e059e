use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rd_core::{config::DEFAULT_LISTEN_ADDR, infra::daemon::client::DaemonClient};

mod context;
mod domains;
mod util;

use context::{Context, OutputFormat};
use domains::reset::StartArgs;

#[derive(Parser, Debug)]
#[command(name = "resetctl", about = "Factory reset daemon client")]
struct Cli {
	/// Address of the reset daemon
	#[arg(long, global = true, env = "RESETD_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
	addr: String,

	/// Output format
	#[arg(long, global = true, value_enum, default_value = "human")]
	format: OutputFormat,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Request a factory reset
	Start(StartArgs),
	/// Show which reset operations the daemon supports
	Capabilities,
	/// Check that the daemon is reachable
	Ping,
	/// Stream reset decisions as they happen
	Watch {
		/// Event types to show (all when empty)
		event_types: Vec<String>,
	},
	/// Stop the daemon
	Shutdown,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
	let cli = Cli::parse();
	let ctx = Context::new(DaemonClient::new(cli.addr), cli.format);

	match cli.command {
		Commands::Start(args) => domains::reset::start(&ctx, args).await,
		Commands::Capabilities => domains::reset::capabilities(&ctx).await,
		Commands::Ping => domains::daemon::ping(&ctx).await,
		Commands::Watch { event_types } => domains::daemon::watch(&ctx, event_types).await,
		Commands::Shutdown => domains::daemon::shutdown(&ctx).await,
	}
}
