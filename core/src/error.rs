use thiserror::Error;

/// Transport-level failure of an RPC call.
///
/// An unsupported reset is not one of these: it travels as a
/// [`StartResponse::ResetError`](crate::ops::reset::StartResponse::ResetError)
/// inside a successful response.
#[derive(Debug, Error)]
pub enum RpcError {
	#[error("request cancelled")]
	Cancelled,
	#[error("request deadline exceeded")]
	DeadlineExceeded,
	#[error("unknown method: {0}")]
	UnknownMethod(String),
	#[error("invalid payload for <method='{method}'>: {source}")]
	InvalidPayload {
		method: String,
		#[source]
		source: serde_json::Error,
	},
	#[error("failed to serialize response: {0}")]
	Serialization(#[from] serde_json::Error),
}
