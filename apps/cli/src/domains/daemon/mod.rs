use std::process::ExitCode;

use anyhow::Result;
use rd_core::infra::event::Event;
use tokio::sync::mpsc;

use crate::{context::Context, print_output};

pub async fn ping(ctx: &Context) -> Result<ExitCode> {
	ctx.client.ping().await?;
	println!("Daemon at {} is alive", ctx.client.addr());
	Ok(ExitCode::SUCCESS)
}

pub async fn shutdown(ctx: &Context) -> Result<ExitCode> {
	ctx.client.shutdown().await?;
	println!("Daemon at {} is shutting down", ctx.client.addr());
	Ok(ExitCode::SUCCESS)
}

/// Print daemon events until the daemon goes away
pub async fn watch(ctx: &Context, event_types: Vec<String>) -> Result<ExitCode> {
	let (event_tx, mut event_rx) = mpsc::unbounded_channel();

	let stream = tokio::spawn({
		let client = ctx.client.clone();
		async move { client.stream(event_types, event_tx).await }
	});

	while let Some(event) = event_rx.recv().await {
		print_output!(ctx, event, print_event);
	}

	stream.await??;

	Ok(ExitCode::SUCCESS)
}

fn print_event(event: Event) {
	match event {
		Event::ResetAccepted {
			timestamp,
			request_id,
			zero_fill,
			factory_os,
		} => println!(
			"{timestamp} reset accepted <id='{request_id}'> zero_fill={zero_fill} factory_os={factory_os}"
		),
		Event::ResetRejected {
			timestamp,
			request_id,
			zero_fill_unsupported,
			factory_os_unsupported,
		} => println!(
			"{timestamp} reset rejected <id='{request_id}'> zero_fill_unsupported={zero_fill_unsupported} factory_os_unsupported={factory_os_unsupported}"
		),
		Event::ShutdownRequested { timestamp } => println!("{timestamp} daemon shutting down"),
	}
}
