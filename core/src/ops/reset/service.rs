use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::{
	input::StartRequest,
	output::StartResponse,
	settings::Settings,
	trigger::ResetTrigger,
};
use crate::{
	context::RequestContext,
	error::RpcError,
	infra::event::{Event, EventBus},
};

/// Accepts or refuses reset requests against the device's capability flags.
///
/// Holds no mutable state, so one instance can serve any number of
/// concurrent callers.
pub struct ResetService {
	settings: Settings,
	trigger: Arc<dyn ResetTrigger>,
	events: Option<Arc<EventBus>>,
}

impl ResetService {
	pub fn new(settings: Settings, trigger: impl ResetTrigger + 'static) -> Self {
		Self {
			settings,
			trigger: Arc::new(trigger),
			events: None,
		}
	}

	/// Publish every decision on `events`
	#[must_use]
	pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
		self.events = Some(events);
		self
	}

	/// The capability flags this service decides with
	pub fn capabilities(&self) -> Settings {
		self.settings
	}

	/// Decide a reset request.
	///
	/// Refusals come back as [`StartResponse::ResetError`]; the `Err` side is
	/// reserved for a cancelled or expired request. On acceptance the reset
	/// trigger has fired exactly once by the time this returns.
	pub fn start(
		&self,
		ctx: &RequestContext,
		request: StartRequest,
	) -> Result<StartResponse, RpcError> {
		ctx.check()?;

		match self.settings.evaluate(request) {
			Ok(accepted) => {
				let request = accepted.commit(self.trigger.as_ref());

				info!(
					request_id = %ctx.id(),
					zero_fill = request.zero_fill,
					factory_os = request.factory_os,
					"Reset accepted"
				);
				self.emit(Event::ResetAccepted {
					timestamp: Utc::now(),
					request_id: ctx.id(),
					zero_fill: request.zero_fill,
					factory_os: request.factory_os,
				});

				Ok(StartResponse::success())
			}
			Err(e) => {
				warn!(request_id = %ctx.id(), ?request, "Reset rejected: {e}");
				self.emit(Event::ResetRejected {
					timestamp: Utc::now(),
					request_id: ctx.id(),
					zero_fill_unsupported: e.zero_fill_unsupported,
					factory_os_unsupported: e.factory_os_unsupported,
				});

				Ok(StartResponse::ResetError(e))
			}
		}
	}

	fn emit(&self, event: Event) {
		if let Some(events) = &self.events {
			events.emit(event);
		}
	}
}
