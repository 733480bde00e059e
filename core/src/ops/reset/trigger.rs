use tracing::{debug, warn};

use super::input::StartRequest;

/// Performs an accepted reset.
///
/// Triggers are fire-and-forget: they must hand the work off and return
/// promptly, the service does not wait for the reset itself.
pub trait ResetTrigger: Send + Sync {
	fn trigger(&self, request: StartRequest);
}

impl<F> ResetTrigger for F
where
	F: Fn(StartRequest) + Send + Sync,
{
	fn trigger(&self, request: StartRequest) {
		self(request);
	}
}

/// Queues accepted resets for whoever owns the receiving end
#[derive(Debug, Clone)]
pub struct ChannelTrigger {
	tx: async_channel::Sender<StartRequest>,
}

impl ChannelTrigger {
	/// Unbounded so that queueing never blocks the RPC path
	pub fn new() -> (Self, async_channel::Receiver<StartRequest>) {
		let (tx, rx) = async_channel::unbounded();
		(Self { tx }, rx)
	}
}

impl From<async_channel::Sender<StartRequest>> for ChannelTrigger {
	fn from(tx: async_channel::Sender<StartRequest>) -> Self {
		Self { tx }
	}
}

impl ResetTrigger for ChannelTrigger {
	fn trigger(&self, request: StartRequest) {
		match self.tx.try_send(request) {
			Ok(()) => debug!(?request, "Reset queued"),
			Err(e) => warn!(?request, "Failed to queue reset: {e}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn channel_trigger_queues_request() {
		let (trigger, rx) = ChannelTrigger::new();

		trigger.trigger(StartRequest::new(true, false));

		assert_eq!(rx.try_recv().unwrap(), StartRequest::new(true, false));
	}

	#[test]
	fn closed_channel_does_not_panic() {
		let (tx, rx) = async_channel::bounded::<StartRequest>(1);
		drop(rx);

		ChannelTrigger::from(tx).trigger(StartRequest::default());
	}
}
