//! Wire types of the daemon's JSON-lines protocol

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{error::RpcError, infra::event::Event};

/// One request line sent by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DaemonRequest {
	Ping,
	/// Invoke a registered method
	Call {
		method: String,
		#[serde(default)]
		payload: Value,
		/// Give up on the request after this many milliseconds
		#[serde(default)]
		timeout_ms: Option<u64>,
	},
	/// Keep the connection open and stream events, all of them if `event_types` is empty
	Subscribe {
		#[serde(default)]
		event_types: Vec<String>,
	},
	Unsubscribe,
	Shutdown,
}

/// One response line sent by the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DaemonResponse {
	Pong,
	Ok,
	JsonOk(Value),
	Error(DaemonError),
	Subscribed,
	Unsubscribed,
	Event(Event),
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DaemonError {
	#[error("request cancelled")]
	Cancelled,
	#[error("request deadline exceeded")]
	DeadlineExceeded,
	#[error("unknown method: {0}")]
	UnknownMethod(String),
	#[error("invalid request: {0}")]
	InvalidRequest(String),
	#[error("serialization error: {0}")]
	SerializationError(String),
	#[error("daemon is at its connection limit")]
	ConnectionLimit,
}

impl From<RpcError> for DaemonError {
	fn from(e: RpcError) -> Self {
		match e {
			RpcError::Cancelled => Self::Cancelled,
			RpcError::DeadlineExceeded => Self::DeadlineExceeded,
			RpcError::UnknownMethod(method) => Self::UnknownMethod(method),
			e @ RpcError::InvalidPayload { .. } => Self::InvalidRequest(e.to_string()),
			RpcError::Serialization(e) => Self::SerializationError(e.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn call_defaults_optional_fields() {
		let request: DaemonRequest =
			serde_json::from_value(json!({ "Call": { "method": "reset.start" } })).unwrap();

		match request {
			DaemonRequest::Call {
				method,
				payload,
				timeout_ms,
			} => {
				assert_eq!(method, "reset.start");
				assert_eq!(payload, Value::Null);
				assert_eq!(timeout_ms, None);
			}
			other => panic!("unexpected request: {other:?}"),
		}
	}

	#[test]
	fn unit_requests_are_bare_strings() {
		assert_eq!(
			serde_json::to_string(&DaemonRequest::Ping).unwrap(),
			r#""Ping""#
		);
	}

	#[test]
	fn rpc_errors_map_onto_wire_errors() {
		assert_eq!(DaemonError::from(RpcError::Cancelled), DaemonError::Cancelled);
		assert_eq!(
			DaemonError::from(RpcError::UnknownMethod("x".into())),
			DaemonError::UnknownMethod("x".into())
		);
	}
}
