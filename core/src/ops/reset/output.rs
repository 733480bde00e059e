use serde::{Deserialize, Serialize};

/// Outcome of a reset request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartResponse {
	/// The reset was accepted and handed to the reset trigger
	ResetSuccess {},
	/// At least one requested operation is not supported here
	ResetError(ResetError),
}

impl StartResponse {
	pub fn success() -> Self {
		Self::ResetSuccess {}
	}

	pub fn is_success(&self) -> bool {
		matches!(self, Self::ResetSuccess {})
	}

	pub fn error(&self) -> Option<&ResetError> {
		match self {
			Self::ResetSuccess {} => None,
			Self::ResetError(e) => Some(e),
		}
	}
}

/// Which of the requested operations were refused.
///
/// A flag is only set when the operation was both requested and unsupported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetError {
	pub zero_fill_unsupported: bool,
	pub factory_os_unsupported: bool,
}

impl std::fmt::Display for ResetError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match (self.zero_fill_unsupported, self.factory_os_unsupported) {
			(true, true) => write!(f, "zero-fill and factory OS reset are unsupported"),
			(true, false) => write!(f, "zero-fill is unsupported"),
			(false, true) => write!(f, "factory OS reset is unsupported"),
			(false, false) => write!(f, "reset rejected"),
		}
	}
}
