//! Factory reset daemon core
//!
//! Hosts the reset service that decides whether a factory reset / zero-fill
//! request is accepted against the capability flags configured for this
//! device, plus the plumbing that exposes it to clients:
//!
//! - [`ops::reset`]: the reset service, its request/response types and triggers
//! - [`infra::daemon`]: JSON-lines RPC server, client, method dispatch and tracing bootstrap
//! - [`infra::event`]: broadcast bus for reset decisions
//! - [`config`]: persisted application configuration

pub mod config;
pub mod context;
pub mod error;
pub mod infra;
pub mod ops;

use std::sync::Arc;

use tracing::info;

use crate::{
	config::AppConfig,
	infra::{daemon::dispatch::DispatchRegistry, event::EventBus},
	ops::reset::{ResetService, ResetTrigger},
};

pub use context::RequestContext;
pub use error::RpcError;

/// Capacity of the broadcast channel backing the event bus
const EVENT_BUS_CAPACITY: usize = 1024;

/// Everything a running daemon needs, wired together
pub struct Core {
	pub config: AppConfig,
	pub events: Arc<EventBus>,
	pub reset: Arc<ResetService>,
	pub dispatcher: Arc<DispatchRegistry>,
}

impl Core {
	/// Build the core from a loaded configuration and the trigger that performs accepted resets
	pub fn new(config: AppConfig, trigger: impl ResetTrigger + 'static) -> Arc<Self> {
		let events = Arc::new(EventBus::new(EVENT_BUS_CAPACITY));

		let reset = Arc::new(
			ResetService::new(config.reset.settings(), trigger).with_events(Arc::clone(&events)),
		);

		let dispatcher = DispatchRegistry::new();
		ops::reset::register(&dispatcher, Arc::clone(&reset));

		info!(
			zero_fill_unsupported = config.reset.zero_fill_unsupported,
			factory_os_unsupported = config.reset.factory_os_unsupported,
			methods = ?dispatcher.methods(),
			"Reset core initialized"
		);

		Arc::new(Self {
			config,
			events,
			reset,
			dispatcher,
		})
	}
}
