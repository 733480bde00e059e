use serde::{Deserialize, Serialize};

use super::{input::StartRequest, output::ResetError};

/// Capability flags of this device, fixed for the lifetime of the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
	pub zero_fill_unsupported: bool,
	pub factory_os_unsupported: bool,
}

impl Settings {
	pub fn new(zero_fill_unsupported: bool, factory_os_unsupported: bool) -> Self {
		Self {
			zero_fill_unsupported,
			factory_os_unsupported,
		}
	}

	/// Decide a request against these capabilities.
	///
	/// Accepted requests come back as an [`AcceptedReset`] that has to be
	/// committed to fire the reset trigger.
	pub fn evaluate(&self, request: StartRequest) -> Result<AcceptedReset, ResetError> {
		let blocked = ResetError {
			zero_fill_unsupported: request.zero_fill && self.zero_fill_unsupported,
			factory_os_unsupported: request.factory_os && self.factory_os_unsupported,
		};

		if blocked.zero_fill_unsupported || blocked.factory_os_unsupported {
			Err(blocked)
		} else {
			Ok(AcceptedReset { request })
		}
	}
}

/// A reset that passed capability checks but has not been triggered yet.
///
/// Committing consumes the value, so one accepted request fires the trigger once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an accepted reset does nothing until it is committed"]
pub struct AcceptedReset {
	request: StartRequest,
}

impl AcceptedReset {
	pub fn commit(self, trigger: &dyn super::ResetTrigger) -> StartRequest {
		trigger.trigger(self.request);
		self.request
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const REQUESTS: [StartRequest; 4] = [
		StartRequest {
			zero_fill: true,
			factory_os: false,
		},
		StartRequest {
			zero_fill: true,
			factory_os: true,
		},
		StartRequest {
			zero_fill: false,
			factory_os: true,
		},
		StartRequest {
			zero_fill: false,
			factory_os: false,
		},
	];

	const SETTINGS: [Settings; 4] = [
		Settings {
			zero_fill_unsupported: false,
			factory_os_unsupported: false,
		},
		Settings {
			zero_fill_unsupported: false,
			factory_os_unsupported: true,
		},
		Settings {
			zero_fill_unsupported: true,
			factory_os_unsupported: false,
		},
		Settings {
			zero_fill_unsupported: true,
			factory_os_unsupported: true,
		},
	];

	#[test]
	fn decision_table() {
		for settings in SETTINGS {
			for request in REQUESTS {
				let zero_fill_blocked = request.zero_fill && settings.zero_fill_unsupported;
				let factory_os_blocked = request.factory_os && settings.factory_os_unsupported;

				match settings.evaluate(request) {
					Ok(accepted) => {
						assert!(
							!zero_fill_blocked && !factory_os_blocked,
							"{settings:?} accepted {request:?}"
						);
						let noop = |_: StartRequest| {};
						assert_eq!(accepted.commit(&noop), request);
					}
					Err(e) => {
						assert_eq!(e.zero_fill_unsupported, zero_fill_blocked, "{settings:?} {request:?}");
						assert_eq!(e.factory_os_unsupported, factory_os_blocked, "{settings:?} {request:?}");
					}
				}
			}
		}
	}

	#[test]
	fn empty_request_is_always_accepted() {
		for settings in SETTINGS {
			assert!(settings.evaluate(StartRequest::default()).is_ok());
		}
	}

	#[test]
	fn both_unsupported_reports_both() {
		let err = Settings::new(true, true)
			.evaluate(StartRequest::new(true, true))
			.unwrap_err();

		assert_eq!(
			err,
			ResetError {
				zero_fill_unsupported: true,
				factory_os_unsupported: true,
			}
		);
	}
}
