use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::{
	io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
	net::TcpStream,
	sync::mpsc,
};

use crate::{
	infra::{
		daemon::types::{DaemonError, DaemonRequest, DaemonResponse},
		event::Event,
	},
	ops::reset::{Settings, StartRequest, StartResponse, CAPABILITIES_METHOD, START_METHOD},
};

#[derive(Debug, Error)]
pub enum ClientError {
	#[error("failed to connect to daemon at {addr}: {source}")]
	Connect {
		addr: String,
		#[source]
		source: std::io::Error,
	},
	#[error("daemon connection error: {0}")]
	Io(#[from] std::io::Error),
	#[error("failed to encode request: {0}")]
	Encode(#[source] serde_json::Error),
	#[error("failed to decode daemon response: {0}")]
	Decode(#[source] serde_json::Error),
	#[error("daemon error: {0}")]
	Daemon(#[from] DaemonError),
	#[error("unexpected daemon response: {0:?}")]
	Unexpected(Box<DaemonResponse>),
}

#[derive(Debug, Clone)]
pub struct DaemonClient {
	socket_addr: String,
}

impl DaemonClient {
	pub fn new(socket_addr: impl Into<String>) -> Self {
		Self {
			socket_addr: socket_addr.into(),
		}
	}

	pub fn addr(&self) -> &str {
		&self.socket_addr
	}

	async fn connect(&self) -> Result<TcpStream, ClientError> {
		TcpStream::connect(&self.socket_addr)
			.await
			.map_err(|source| ClientError::Connect {
				addr: self.socket_addr.clone(),
				source,
			})
	}

	/// Send a single request and wait for its response
	pub async fn send(&self, req: &DaemonRequest) -> Result<DaemonResponse, ClientError> {
		let mut stream = self.connect().await?;

		let mut payload = serde_json::to_vec(req).map_err(ClientError::Encode)?;
		payload.push(b'\n');

		stream.write_all(&payload).await?;
		stream.shutdown().await?;

		let mut buf = Vec::new();
		stream.read_to_end(&mut buf).await?;

		serde_json::from_slice(&buf).map_err(ClientError::Decode)
	}

	pub async fn ping(&self) -> Result<(), ClientError> {
		match self.send(&DaemonRequest::Ping).await? {
			DaemonResponse::Pong => Ok(()),
			other => Err(unexpected(other)),
		}
	}

	/// Invoke `method` and decode its result as `O`
	pub async fn call<O: DeserializeOwned>(
		&self,
		method: &str,
		payload: Value,
		timeout: Option<Duration>,
	) -> Result<O, ClientError> {
		let request = DaemonRequest::Call {
			method: method.to_string(),
			payload,
			timeout_ms: timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
		};

		match self.send(&request).await? {
			DaemonResponse::JsonOk(value) => serde_json::from_value(value).map_err(ClientError::Decode),
			DaemonResponse::Error(e) => Err(e.into()),
			other => Err(unexpected(other)),
		}
	}

	pub async fn start_reset(
		&self,
		request: StartRequest,
		timeout: Option<Duration>,
	) -> Result<StartResponse, ClientError> {
		let payload = serde_json::to_value(request).map_err(ClientError::Encode)?;
		self.call(START_METHOD, payload, timeout).await
	}

	pub async fn capabilities(&self) -> Result<Settings, ClientError> {
		self.call(CAPABILITIES_METHOD, Value::Null, None).await
	}

	pub async fn shutdown(&self) -> Result<(), ClientError> {
		match self.send(&DaemonRequest::Shutdown).await? {
			DaemonResponse::Ok => Ok(()),
			DaemonResponse::Error(e) => Err(e.into()),
			other => Err(unexpected(other)),
		}
	}

	/// Start a streaming connection for real-time events.
	///
	/// Returns once the daemon closes the stream or `event_tx` is dropped.
	pub async fn stream(
		&self,
		event_types: Vec<String>,
		event_tx: mpsc::UnboundedSender<Event>,
	) -> Result<(), ClientError> {
		let mut stream = self.connect().await?;

		// Send subscription request
		let mut payload = serde_json::to_vec(&DaemonRequest::Subscribe { event_types })
			.map_err(ClientError::Encode)?;
		payload.push(b'\n');
		stream.write_all(&payload).await?;

		// Split stream for reading responses, keeping the write half open
		let (reader, _writer) = stream.into_split();
		let mut buf_reader = BufReader::new(reader);
		let mut line = String::new();

		loop {
			line.clear();
			if buf_reader.read_line(&mut line).await? == 0 {
				break; // EOF
			}

			match serde_json::from_str::<DaemonResponse>(line.trim()).map_err(ClientError::Decode)? {
				DaemonResponse::Event(event) => {
					if event_tx.send(event).is_err() {
						break; // Receiver dropped
					}
				}
				DaemonResponse::Subscribed => {
					// Subscription confirmed, continue listening
				}
				DaemonResponse::Error(e) => return Err(e.into()),
				other => return Err(unexpected(other)),
			}
		}

		Ok(())
	}
}

fn unexpected(response: DaemonResponse) -> ClientError {
	ClientError::Unexpected(Box::new(response))
}
