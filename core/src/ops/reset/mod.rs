//! Factory reset operation
//!
//! `reset.start` decides a [`StartRequest`] against the device's [`Settings`]
//! and either hands it to the [`ResetTrigger`] or explains which requested
//! operations are unsupported. `reset.capabilities` reports those settings.

pub mod input;
pub mod output;
pub mod service;
pub mod settings;
pub mod trigger;

use std::sync::Arc;

use serde_json::Value;

use crate::{
	context::RequestContext,
	error::RpcError,
	infra::daemon::dispatch::{make_method_handler, DispatchRegistry},
};

pub use input::StartRequest;
pub use output::{ResetError, StartResponse};
pub use service::ResetService;
pub use settings::{AcceptedReset, Settings};
pub use trigger::{ChannelTrigger, ResetTrigger};

pub const START_METHOD: &str = "reset.start";
pub const CAPABILITIES_METHOD: &str = "reset.capabilities";

/// Expose the reset service through `registry`
pub fn register(registry: &DispatchRegistry, service: Arc<ResetService>) {
	registry.register(
		START_METHOD,
		make_method_handler(START_METHOD, {
			let service = Arc::clone(&service);
			// A call without a payload asks for neither operation
			move |request: Option<StartRequest>, ctx: RequestContext| {
				let service = Arc::clone(&service);
				async move { service.start(&ctx, request.unwrap_or_default()) }
			}
		}),
	);

	registry.register(
		CAPABILITIES_METHOD,
		make_method_handler(
			CAPABILITIES_METHOD,
			move |_: Value, ctx: RequestContext| {
				let service = Arc::clone(&service);
				async move {
					ctx.check()?;
					Ok::<_, RpcError>(service.capabilities())
				}
			},
		),
	);
}
