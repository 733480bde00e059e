use rd_core::infra::daemon::client::DaemonClient;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
	Human,
	Json,
}

#[derive(Clone)]
pub struct Context {
	pub client: DaemonClient,
	pub format: OutputFormat,
}

impl Context {
	pub fn new(client: DaemonClient, format: OutputFormat) -> Self {
		Self { client, format }
	}
}
