use std::{
	io,
	net::SocketAddr,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
	time::Duration,
};

use chrono::Utc;
use tokio::{
	io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
	net::{TcpListener, TcpStream, ToSocketAddrs},
	sync::broadcast::error::RecvError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
	context::RequestContext,
	infra::{
		daemon::types::{DaemonError, DaemonRequest, DaemonResponse},
		event::{Event, EventSubscriber},
	},
	Core,
};

/// Default cap on concurrently open client connections
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;

/// Event stream attached to a connection after `Subscribe`
struct Subscription {
	events: EventSubscriber,
	event_types: Vec<String>,
}

/// Minimal JSON-lines over TCP RPC server with event streaming support
pub struct RpcServer {
	listener: TcpListener,
	core: Arc<Core>,
	shutdown: CancellationToken,
	/// Connection counter for monitoring
	connection_count: Arc<AtomicUsize>,
	/// Maximum number of concurrent connections
	max_connections: usize,
}

impl RpcServer {
	pub async fn bind(addr: impl ToSocketAddrs, core: Arc<Core>) -> io::Result<Self> {
		let listener = TcpListener::bind(addr).await?;
		info!("RPC server bound to {}", listener.local_addr()?);

		Ok(Self {
			listener,
			core,
			shutdown: CancellationToken::new(),
			connection_count: Arc::new(AtomicUsize::new(0)),
			max_connections: DEFAULT_MAX_CONNECTIONS,
		})
	}

	/// Stop when `shutdown` is cancelled instead of the server's own token
	#[must_use]
	pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
		self.shutdown = shutdown;
		self
	}

	#[must_use]
	pub fn with_max_connections(mut self, max_connections: usize) -> Self {
		self.max_connections = max_connections;
		self
	}

	pub fn local_addr(&self) -> io::Result<SocketAddr> {
		self.listener.local_addr()
	}

	/// Cancelling this token stops the accept loop and cancels in-flight requests
	pub fn shutdown_token(&self) -> CancellationToken {
		self.shutdown.clone()
	}

	/// Get current connection statistics
	pub fn get_connection_stats(&self) -> (usize, usize) {
		(
			self.connection_count.load(Ordering::Relaxed),
			self.max_connections,
		)
	}

	/// Accept connections until shutdown is requested
	pub async fn run(self) -> io::Result<()> {
		loop {
			tokio::select! {
				// Handle new connections
				result = self.listener.accept() => {
					match result {
						Ok((mut stream, addr)) => {
							// Check connection limit
							let current_connections = self.connection_count.load(Ordering::Relaxed);
							if current_connections >= self.max_connections {
								warn!(
									"Connection limit reached ({}), rejecting connection from {addr}",
									self.max_connections
								);
								let _ = write_response(
									&mut stream,
									&DaemonResponse::Error(DaemonError::ConnectionLimit),
								)
								.await;
								let _ = stream.shutdown().await;
								continue;
							}

							let core = Arc::clone(&self.core);
							let shutdown = self.shutdown.clone();
							let connection_count = Arc::clone(&self.connection_count);

							connection_count.fetch_add(1, Ordering::Relaxed);

							// Spawn task for concurrent request handling
							tokio::spawn(async move {
								debug!("Accepted connection from {addr}");
								if let Err(e) = Self::handle_connection(stream, core, shutdown).await {
									warn!("Connection error <addr='{addr}'>: {e}");
								}
								connection_count.fetch_sub(1, Ordering::Relaxed);
							});
						}
						Err(e) => {
							error!("Accept error: {e}");
							continue;
						}
					}
				}

				// Handle shutdown signal
				() = self.shutdown.cancelled() => {
					let (open, _) = self.get_connection_stats();
					info!("Shutdown signal received, stopping RPC server ({open} connections open)");
					break;
				}
			}
		}

		Ok(())
	}

	/// Handle individual client connection concurrently
	async fn handle_connection(
		stream: TcpStream,
		core: Arc<Core>,
		shutdown: CancellationToken,
	) -> io::Result<()> {
		let (reader, mut writer) = stream.into_split();
		let mut buf_reader = BufReader::new(reader);
		let mut line = String::new();
		let mut subscription = None;

		loop {
			tokio::select! {
				// Handle incoming requests from client.
				// Partially read bytes stay in `line` if another branch wins.
				result = buf_reader.read_line(&mut line) => {
					if result? == 0 {
						// EOF - client closed connection
						break;
					}

					let response = match serde_json::from_str::<DaemonRequest>(line.trim()) {
						Ok(request) => {
							Self::process_request(request, &core, &shutdown, &mut subscription).await
						}
						Err(e) => {
							error!("Failed to parse daemon request: {e}");
							debug!("Raw request: {}", line.trim());
							write_response(
								&mut writer,
								&DaemonResponse::Error(DaemonError::SerializationError(e.to_string())),
							)
							.await?;
							break; // Close connection after error
						}
					};
					line.clear();

					write_response(&mut writer, &response).await?;

					// Only subscriptions keep the connection open
					if !matches!(response, DaemonResponse::Subscribed) {
						break;
					}
				}

				// Handle outgoing events to client
				event = next_event(&mut subscription) => {
					match event {
						Some(event) => {
							write_response(&mut writer, &DaemonResponse::Event(event)).await?;
						}
						None => break,
					}
				}

				() = shutdown.cancelled(), if subscription.is_some() => {
					break;
				}
			}
		}

		let _ = writer.shutdown().await;

		Ok(())
	}

	/// Process a parsed daemon request
	async fn process_request(
		request: DaemonRequest,
		core: &Arc<Core>,
		shutdown: &CancellationToken,
		subscription: &mut Option<Subscription>,
	) -> DaemonResponse {
		match request {
			DaemonRequest::Ping => DaemonResponse::Pong,

			DaemonRequest::Call {
				method,
				payload,
				timeout_ms,
			} => {
				let mut ctx = RequestContext::child_of(shutdown);
				if let Some(timeout_ms) = timeout_ms {
					ctx = ctx.with_timeout(Duration::from_millis(timeout_ms));
				}

				debug!(request_id = %ctx.id(), "[RPC Call]: method={method}");

				match core.dispatcher.dispatch(&method, payload, ctx).await {
					Ok(json_result) => DaemonResponse::JsonOk(json_result),
					Err(e) => {
						warn!("Call to {method} failed: {e}");
						DaemonResponse::Error(e.into())
					}
				}
			}

			DaemonRequest::Subscribe { event_types } => {
				debug!(?event_types, "Client subscribed to events");
				*subscription = Some(Subscription {
					events: core.events.subscribe(),
					event_types,
				});
				DaemonResponse::Subscribed
			}

			DaemonRequest::Unsubscribe => {
				*subscription = None;
				DaemonResponse::Unsubscribed
			}

			DaemonRequest::Shutdown => {
				info!("Shutdown requested by client");
				core.events.emit(Event::ShutdownRequested {
					timestamp: Utc::now(),
				});
				shutdown.cancel();
				DaemonResponse::Ok
			}
		}
	}
}

/// Next event selected by the subscription; never resolves while unsubscribed
async fn next_event(subscription: &mut Option<Subscription>) -> Option<Event> {
	let Some(subscription) = subscription else {
		return std::future::pending().await;
	};

	loop {
		match subscription.events.recv().await {
			Ok(event) if event.matches_types(&subscription.event_types) => return Some(event),
			Ok(_) => continue,
			Err(RecvError::Lagged(skipped)) => {
				warn!("Event subscriber lagged, {skipped} events dropped");
			}
			Err(RecvError::Closed) => return None,
		}
	}
}

async fn write_response<W>(writer: &mut W, response: &DaemonResponse) -> io::Result<()>
where
	W: AsyncWrite + Unpin,
{
	let mut response_json = serde_json::to_string(response)
		.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
	response_json.push('\n');
	writer.write_all(response_json.as_bytes()).await
}
