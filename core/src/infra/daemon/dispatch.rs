use std::{
	collections::HashMap,
	future::Future,
	sync::{Arc, RwLock},
};

use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{context::RequestContext, error::RpcError};

/// Signature for a generic method handler: takes a JSON payload, returns a JSON result
pub type MethodHandler = Arc<
	dyn Fn(Value, RequestContext) -> BoxFuture<'static, Result<Value, RpcError>> + Send + Sync,
>;

/// Registry that maps method names to handlers. The daemon remains agnostic of concrete types.
pub struct DispatchRegistry {
	methods: RwLock<HashMap<String, MethodHandler>>,
}

impl DispatchRegistry {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			methods: RwLock::new(HashMap::new()),
		})
	}

	pub fn register(&self, method: impl Into<String>, handler: MethodHandler) {
		self.methods
			.write()
			.unwrap_or_else(std::sync::PoisonError::into_inner)
			.insert(method.into(), handler);
	}

	/// Names of every registered method, sorted
	pub fn methods(&self) -> Vec<String> {
		let mut names = self
			.methods
			.read()
			.unwrap_or_else(std::sync::PoisonError::into_inner)
			.keys()
			.cloned()
			.collect::<Vec<_>>();
		names.sort();
		names
	}

	pub async fn dispatch(
		&self,
		method: &str,
		payload: Value,
		ctx: RequestContext,
	) -> Result<Value, RpcError> {
		// Clone the handler out so the lock is not held across the await
		let handler = self
			.methods
			.read()
			.unwrap_or_else(std::sync::PoisonError::into_inner)
			.get(method)
			.cloned()
			.ok_or_else(|| RpcError::UnknownMethod(method.to_string()))?;

		handler(payload, ctx).await
	}
}

/// Build a method handler that decodes `I` from the payload, executes, and encodes `O`
pub fn make_method_handler<I, O, F, Fut>(method: &'static str, exec: F) -> MethodHandler
where
	I: DeserializeOwned + Send + 'static,
	O: Serialize + Send + 'static,
	F: Fn(I, RequestContext) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<O, RpcError>> + Send + 'static,
{
	let exec = Arc::new(exec);
	Arc::new(move |payload, ctx| {
		let exec = Arc::clone(&exec);
		Box::pin(async move {
			let input: I = serde_json::from_value(payload).map_err(|source| {
				RpcError::InvalidPayload {
					method: method.to_string(),
					source,
				}
			})?;
			let output = exec(input, ctx).await?;
			Ok(serde_json::to_value(output)?)
		})
	})
}
