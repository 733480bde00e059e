use serde::{Deserialize, Serialize};

/// Request to start a factory reset.
///
/// Both operations are independent; a request asking for neither is valid
/// and always accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
	/// Securely wipe persistent storage with zeroes
	#[serde(default)]
	pub zero_fill: bool,
	/// Reinstall the factory OS image
	#[serde(default)]
	pub factory_os: bool,
}

impl StartRequest {
	pub fn new(zero_fill: bool, factory_os: bool) -> Self {
		Self {
			zero_fill,
			factory_os,
		}
	}
}
