//! Event bus for decoupled communication

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// Something that happened inside the daemon and that clients may stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum::AsRefStr)]
pub enum Event {
	/// A reset passed capability checks and was handed to the trigger
	ResetAccepted {
		timestamp: DateTime<Utc>,
		request_id: Uuid,
		zero_fill: bool,
		factory_os: bool,
	},
	/// A reset asked for at least one unsupported operation
	ResetRejected {
		timestamp: DateTime<Utc>,
		request_id: Uuid,
		zero_fill_unsupported: bool,
		factory_os_unsupported: bool,
	},
	/// A client asked the daemon to stop
	ShutdownRequested { timestamp: DateTime<Utc> },
}

impl Event {
	/// Get the variant name of this event
	pub fn variant_name(&self) -> &str {
		self.as_ref()
	}

	/// Whether this event is selected by a subscription's type list.
	///
	/// An empty list selects everything.
	pub fn matches_types(&self, event_types: &[String]) -> bool {
		event_types.is_empty() || event_types.iter().any(|t| t == self.variant_name())
	}
}

/// Broadcast bus; slow subscribers lag and lose the oldest events
#[derive(Debug, Clone)]
pub struct EventBus {
	sender: broadcast::Sender<Event>,
}

impl EventBus {
	/// Create a new event bus with specified capacity
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Emit an event to all subscribers
	pub fn emit(&self, event: Event) {
		// An error only means nobody is listening right now
		if let Ok(count) = self.sender.send(event) {
			trace!("Event emitted to {count} subscribers");
		}
	}

	pub fn subscribe(&self) -> EventSubscriber {
		EventSubscriber {
			receiver: self.sender.subscribe(),
		}
	}

	pub fn subscriber_count(&self) -> usize {
		self.sender.receiver_count()
	}
}

/// Event subscriber for receiving events
#[derive(Debug)]
pub struct EventSubscriber {
	receiver: broadcast::Receiver<Event>,
}

impl EventSubscriber {
	/// Receive the next event
	pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
		self.receiver.recv().await
	}

	/// Try to receive an event without blocking
	pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
		self.receiver.try_recv()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn shutdown_event() -> Event {
		Event::ShutdownRequested {
			timestamp: Utc::now(),
		}
	}

	#[test]
	fn variant_names() {
		assert_eq!(shutdown_event().variant_name(), "ShutdownRequested");
	}

	#[test]
	fn type_filter() {
		let event = shutdown_event();

		assert!(event.matches_types(&[]));
		assert!(event.matches_types(&["ShutdownRequested".to_string()]));
		assert!(!event.matches_types(&["ResetAccepted".to_string()]));
	}

	#[tokio::test]
	async fn subscribers_receive_emitted_events() {
		let bus = EventBus::new(8);
		let mut first = bus.subscribe();
		let mut second = bus.subscribe();
		assert_eq!(bus.subscriber_count(), 2);

		let event = shutdown_event();
		bus.emit(event.clone());

		assert_eq!(first.recv().await.unwrap(), event);
		assert_eq!(second.recv().await.unwrap(), event);
	}

	#[test]
	fn emit_without_subscribers_is_fine() {
		EventBus::new(8).emit(shutdown_event());
	}
}
