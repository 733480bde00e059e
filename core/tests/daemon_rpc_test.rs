//! End-to-end tests of the daemon's JSON-lines RPC surface over a real socket

use rd_core::{
	config::AppConfig,
	infra::{
		daemon::{
			client::{ClientError, DaemonClient},
			rpc::RpcServer,
			types::{DaemonError, DaemonRequest, DaemonResponse},
		},
		event::Event,
	},
	ops::reset::{ChannelTrigger, ResetError, Settings, StartRequest, StartResponse},
	Core,
};

use std::{net::SocketAddr, time::Duration};

use async_channel::Receiver;
use serde_json::json;
use tempfile::{tempdir, TempDir};
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::TcpStream,
	sync::mpsc,
	task::JoinHandle,
	time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

struct TestDaemon {
	client: DaemonClient,
	addr: SocketAddr,
	resets: Receiver<StartRequest>,
	shutdown: CancellationToken,
	server: JoinHandle<std::io::Result<()>>,
	_data_dir: TempDir,
}

async fn spawn_daemon(settings: Settings) -> TestDaemon {
	let data_dir = tempdir().unwrap();
	let mut config = AppConfig::default_with_dir(data_dir.path().to_path_buf());
	config.reset.zero_fill_unsupported = settings.zero_fill_unsupported;
	config.reset.factory_os_unsupported = settings.factory_os_unsupported;

	let (trigger, resets) = ChannelTrigger::new();
	let core = Core::new(config, trigger);

	let server = RpcServer::bind("127.0.0.1:0", core).await.unwrap();
	let addr = server.local_addr().unwrap();
	let shutdown = server.shutdown_token();

	TestDaemon {
		client: DaemonClient::new(addr.to_string()),
		addr,
		resets,
		shutdown,
		server: tokio::spawn(server.run()),
		_data_dir: data_dir,
	}
}

#[tokio::test]
#[traced_test]
async fn ping() {
	let daemon = spawn_daemon(Settings::default()).await;

	daemon.client.ping().await.unwrap();

	daemon.shutdown.cancel();
	daemon.server.await.unwrap().unwrap();
}

#[tokio::test]
#[traced_test]
async fn accepted_reset_triggers() {
	let daemon = spawn_daemon(Settings::new(false, true)).await;

	let response = daemon
		.client
		.start_reset(StartRequest::new(true, false), None)
		.await
		.unwrap();

	assert_eq!(response, StartResponse::success());
	assert_eq!(
		timeout(Duration::from_millis(100), daemon.resets.recv())
			.await
			.expect("reset never triggered")
			.unwrap(),
		StartRequest::new(true, false)
	);

	daemon.shutdown.cancel();
}

#[tokio::test]
#[traced_test]
async fn rejected_reset_is_a_successful_call() {
	let daemon = spawn_daemon(Settings::new(false, true)).await;

	let response = daemon
		.client
		.start_reset(StartRequest::new(true, true), Some(Duration::from_secs(5)))
		.await
		.unwrap();

	assert_eq!(
		response,
		StartResponse::ResetError(ResetError {
			zero_fill_unsupported: false,
			factory_os_unsupported: true,
		})
	);
	assert!(daemon.resets.try_recv().is_err());

	daemon.shutdown.cancel();
}

#[tokio::test]
#[traced_test]
async fn start_without_payload_is_an_empty_request() {
	let daemon = spawn_daemon(Settings::new(true, true)).await;
	let raw = DaemonRequest::Call {
		method: "reset.start".to_string(),
		payload: serde_json::Value::Null,
		timeout_ms: None,
	};

	match daemon.client.send(&raw).await.unwrap() {
		DaemonResponse::JsonOk(value) => assert_eq!(
			serde_json::from_value::<StartResponse>(value).unwrap(),
			StartResponse::success()
		),
		other => panic!("unexpected response: {other:?}"),
	}
	assert_eq!(
		timeout(Duration::from_millis(100), daemon.resets.recv())
			.await
			.expect("reset never triggered")
			.unwrap(),
		StartRequest::default()
	);

	daemon.shutdown.cancel();
}

#[tokio::test]
async fn capabilities_report_settings() {
	let daemon = spawn_daemon(Settings::new(true, false)).await;

	assert_eq!(
		daemon.client.capabilities().await.unwrap(),
		Settings::new(true, false)
	);

	daemon.shutdown.cancel();
}

#[tokio::test]
async fn unknown_method_is_reported() {
	let daemon = spawn_daemon(Settings::default()).await;

	let result = daemon
		.client
		.call::<serde_json::Value>("reset.explode", json!({}), None)
		.await;

	assert!(matches!(
		result,
		Err(ClientError::Daemon(DaemonError::UnknownMethod(method))) if method == "reset.explode"
	));

	daemon.shutdown.cancel();
}

#[tokio::test]
async fn invalid_payload_is_reported() {
	let daemon = spawn_daemon(Settings::default()).await;

	let result = daemon
		.client
		.call::<StartResponse>("reset.start", json!({ "zero_fill": "yes" }), None)
		.await;

	assert!(matches!(
		result,
		Err(ClientError::Daemon(DaemonError::InvalidRequest(_)))
	));
	assert!(daemon.resets.try_recv().is_err());

	daemon.shutdown.cancel();
}

#[tokio::test]
async fn malformed_line_gets_serialization_error() {
	let daemon = spawn_daemon(Settings::default()).await;

	let mut stream = TcpStream::connect(daemon.addr).await.unwrap();
	stream.write_all(b"{not json\n").await.unwrap();
	stream.shutdown().await.unwrap();

	let mut buf = Vec::new();
	stream.read_to_end(&mut buf).await.unwrap();

	assert!(matches!(
		serde_json::from_slice::<DaemonResponse>(&buf).unwrap(),
		DaemonResponse::Error(DaemonError::SerializationError(_))
	));

	daemon.shutdown.cancel();
}

#[tokio::test]
#[traced_test]
async fn subscribers_see_reset_decisions() {
	let daemon = spawn_daemon(Settings::new(true, false)).await;

	let (event_tx, mut event_rx) = mpsc::unbounded_channel();
	let streaming = tokio::spawn({
		let client = daemon.client.clone();
		async move {
			client
				.stream(vec!["ResetRejected".to_string()], event_tx)
				.await
		}
	});

	// Give the subscription a moment to register before producing events
	let mut event = None;
	for _ in 0..50 {
		daemon
			.client
			.start_reset(StartRequest::new(false, false), None)
			.await
			.unwrap();
		daemon
			.client
			.start_reset(StartRequest::new(true, false), None)
			.await
			.unwrap();

		if let Ok(Some(e)) = timeout(Duration::from_millis(20), event_rx.recv()).await {
			event = Some(e);
			break;
		}
	}

	match event.expect("no event received") {
		Event::ResetRejected {
			zero_fill_unsupported,
			factory_os_unsupported,
			..
		} => {
			assert!(zero_fill_unsupported);
			assert!(!factory_os_unsupported);
		}
		other => panic!("unexpected event: {other:?}"),
	}

	daemon.shutdown.cancel();
	// The stream ends when the daemon drops subscribed connections on shutdown
	timeout(Duration::from_secs(5), streaming)
		.await
		.unwrap()
		.unwrap()
		.unwrap();
}

#[tokio::test]
#[traced_test]
async fn shutdown_request_stops_server() {
	let daemon = spawn_daemon(Settings::default()).await;

	daemon.client.shutdown().await.unwrap();

	timeout(Duration::from_secs(5), daemon.server)
		.await
		.expect("server did not stop")
		.unwrap()
		.unwrap();
	assert!(daemon.shutdown.is_cancelled());
}

#[tokio::test]
async fn expired_call_is_not_handled() {
	let daemon = spawn_daemon(Settings::default()).await;
	let raw = DaemonRequest::Call {
		method: "reset.start".to_string(),
		payload: json!({ "zero_fill": true }),
		timeout_ms: Some(0),
	};

	// A zero timeout expires before the handler looks at the request
	assert!(matches!(
		daemon.client.send(&raw).await.unwrap(),
		DaemonResponse::Error(DaemonError::DeadlineExceeded)
	));
	assert!(daemon.resets.try_recv().is_err());

	daemon.shutdown.cancel();
}

#[tokio::test]
async fn connection_limit_is_enforced() {
	let data_dir = tempdir().unwrap();
	let (trigger, _resets) = ChannelTrigger::new();
	let core = Core::new(
		AppConfig::default_with_dir(data_dir.path().to_path_buf()),
		trigger,
	);
	let server = RpcServer::bind("127.0.0.1:0", core)
		.await
		.unwrap()
		.with_max_connections(0);
	let addr = server.local_addr().unwrap();
	let shutdown = server.shutdown_token();
	tokio::spawn(server.run());

	// Rejected before any request is read, so only listen
	let mut stream = TcpStream::connect(addr).await.unwrap();
	let mut buf = Vec::new();
	stream.read_to_end(&mut buf).await.unwrap();

	assert!(matches!(
		serde_json::from_slice::<DaemonResponse>(&buf).unwrap(),
		DaemonResponse::Error(DaemonError::ConnectionLimit)
	));

	shutdown.cancel();
}
