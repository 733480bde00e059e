//! Hands accepted resets to the configured reset command

use async_channel::Receiver;
use rd_core::ops::reset::StartRequest;
use tokio::{process::Command, task::JoinHandle};
use tracing::{error, info, warn};

/// Consumes accepted resets queued by the daemon's reset trigger
pub struct ResetExecutor {
	command: Option<Vec<String>>,
}

impl ResetExecutor {
	pub fn new(command: Option<Vec<String>>) -> Self {
		Self { command }
	}

	/// Execute resets until every sender is gone
	pub async fn run(self, resets: Receiver<StartRequest>) {
		while let Ok(request) = resets.recv().await {
			// Not awaited: a long running reset must not hold up the queue
			let _ = self.execute(request);
		}

		info!("Reset queue closed, executor stopping");
	}

	/// Spawn the reset command for `request`, returning a handle to its completion
	pub fn execute(&self, request: StartRequest) -> Option<JoinHandle<()>> {
		info!(
			zero_fill = request.zero_fill,
			factory_os = request.factory_os,
			"Executing reset"
		);

		let Some((program, args)) = self.command.as_ref().and_then(|c| c.split_first()) else {
			warn!("No reset command configured, nothing to execute");
			return None;
		};

		let spawned = Command::new(program)
			.args(args)
			.env("RESET_ZERO_FILL", request.zero_fill.to_string())
			.env("RESET_FACTORY_OS", request.factory_os.to_string())
			.spawn();

		match spawned {
			Ok(mut child) => {
				let program = program.clone();
				Some(tokio::spawn(async move {
					match child.wait().await {
						Ok(status) if status.success() => {
							info!("Reset command {program} finished");
						}
						Ok(status) => warn!("Reset command {program} exited with {status}"),
						Err(e) => error!("Failed to wait for reset command {program}: {e}"),
					}
				}))
			}
			Err(e) => {
				error!("Failed to spawn reset command {program}: {e}");
				None
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tracing_test::traced_test;

	#[tokio::test]
	#[traced_test]
	async fn nothing_to_execute_without_command() {
		assert!(ResetExecutor::new(None)
			.execute(StartRequest::new(true, true))
			.is_none());
		assert!(ResetExecutor::new(Some(vec![]))
			.execute(StartRequest::new(true, true))
			.is_none());
	}

	#[tokio::test]
	async fn missing_program_is_not_fatal() {
		let executor = ResetExecutor::new(Some(vec!["/nonexistent/reset-hook".to_string()]));

		assert!(executor.execute(StartRequest::default()).is_none());
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn command_sees_requested_operations() {
		let dir = tempfile::tempdir().unwrap();
		let out = dir.path().join("reset.out");

		let executor = ResetExecutor::new(Some(vec![
			"sh".to_string(),
			"-c".to_string(),
			format!(
				"printf '%s %s' \"$RESET_ZERO_FILL\" \"$RESET_FACTORY_OS\" > '{}'",
				out.display()
			),
		]));

		executor
			.execute(StartRequest::new(true, false))
			.expect("command should spawn")
			.await
			.unwrap();

		assert_eq!(std::fs::read_to_string(&out).unwrap(), "true false");
	}

	#[tokio::test]
	async fn run_drains_queue_until_closed() {
		let (tx, rx) = async_channel::unbounded();
		tx.send(StartRequest::default()).await.unwrap();
		drop(tx);

		tokio::time::timeout(
			std::time::Duration::from_secs(5),
			ResetExecutor::new(None).run(rx),
		)
		.await
		.expect("executor did not stop");
	}
}
