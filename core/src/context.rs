//! Per-request context carried through every RPC call

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::RpcError;

/// Identity, cancellation and deadline of a single in-flight request
#[derive(Debug, Clone)]
pub struct RequestContext {
	id: Uuid,
	cancel: CancellationToken,
	deadline: Option<Instant>,
}

impl RequestContext {
	/// A context that is never cancelled and has no deadline
	pub fn background() -> Self {
		Self {
			id: Uuid::new_v4(),
			cancel: CancellationToken::new(),
			deadline: None,
		}
	}

	/// A context cancelled together with `parent`
	pub fn child_of(parent: &CancellationToken) -> Self {
		Self {
			id: Uuid::new_v4(),
			cancel: parent.child_token(),
			deadline: None,
		}
	}

	#[must_use]
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.deadline = Some(Instant::now() + timeout);
		self
	}

	pub fn id(&self) -> Uuid {
		self.id
	}

	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Fails if the request was cancelled or has outlived its deadline
	pub fn check(&self) -> Result<(), RpcError> {
		if self.cancel.is_cancelled() {
			return Err(RpcError::Cancelled);
		}

		match self.deadline {
			Some(deadline) if Instant::now() >= deadline => Err(RpcError::DeadlineExceeded),
			_ => Ok(()),
		}
	}
}

impl Default for RequestContext {
	fn default() -> Self {
		Self::background()
	}
}
