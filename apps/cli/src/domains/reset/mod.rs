use std::{process::ExitCode, time::Duration};

use anyhow::Result;
use clap::Args;
use rd_core::ops::reset::{Settings, StartRequest, StartResponse};

use crate::{context::Context, print_output, util::output::yes_no};

#[derive(Args, Debug, Clone)]
pub struct StartArgs {
	/// Securely wipe persistent storage with zeroes
	#[arg(long, default_value_t = false)]
	pub zero_fill: bool,

	/// Reinstall the factory OS image
	#[arg(long, default_value_t = false)]
	pub factory_os: bool,

	/// Give up if the daemon has not decided within this many milliseconds
	#[arg(long)]
	pub timeout_ms: Option<u64>,
}

impl StartArgs {
	fn to_request(&self) -> StartRequest {
		StartRequest::new(self.zero_fill, self.factory_os)
	}
}

/// Ask the daemon to reset; a refusal is reported and turned into a failing exit code
pub async fn start(ctx: &Context, args: StartArgs) -> Result<ExitCode> {
	let response = ctx
		.client
		.start_reset(args.to_request(), args.timeout_ms.map(Duration::from_millis))
		.await?;

	print_output!(ctx, response, |response: StartResponse| match response {
		StartResponse::ResetSuccess {} => println!("Reset accepted"),
		StartResponse::ResetError(e) => println!("Reset rejected: {e}"),
	});

	Ok(if response.is_success() {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	})
}

pub async fn capabilities(ctx: &Context) -> Result<ExitCode> {
	let settings = ctx.client.capabilities().await?;

	print_output!(ctx, settings, |settings: Settings| {
		println!("Zero-fill supported:  {}", yes_no(!settings.zero_fill_unsupported));
		println!("Factory OS supported: {}", yes_no(!settings.factory_os_unsupported));
	});

	Ok(ExitCode::SUCCESS)
}
