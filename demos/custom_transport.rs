//! Demonstrates plugging a non-reqwest transport into the console client.
//!
//! 1. Implement [`ApiHttpClient`] so the transport buffers whole responses and reports failures
//!    to obtain one as [`TransportError`].
//! 2. Pass the transport to [`ConsoleClient::with_http_client`] along with a [`Navigator`].
//! 3. Observe how the client separates transport failures, passthrough statuses, and an
//!    unrecoverable session that escapes to the login route.

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::Arc,
};
// crates.io
use color_eyre::Result;
use http::StatusCode;
use url::Url;
// self
use console_session::{
	client::ConsoleClient,
	config::ClientConfig,
	error::{Error, TransportError},
	http::{ApiHttpClient, HttpRequest, HttpResponse, TransportFuture},
	navigation::{Navigator, RecordingNavigator},
	store::{MemoryMirror, TokenMirror},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::builder(Url::parse("https://console.example.com/api/")?)
		.login_route("/signin")
		.build()?;
	let mirror = Arc::new(MemoryMirror::default());

	mirror.save(&config.storage_key, "expired-token").await?;

	let navigator = Arc::new(RecordingNavigator::default());
	let client: ConsoleClient<MockHttpClient> = ConsoleClient::open(
		config.clone(),
		mirror.clone(),
		MockHttpClient::default(),
		Arc::clone(&navigator) as Arc<dyn Navigator>,
	)
	.await?;

	match client.get("/maintenance").await {
		Ok(response) => println!("Unexpected success: {}.", response.status()),
		Err(e) => println!("Server errors pass through untouched: {e} (status {:?}).", e.status()),
	}
	match client.get("/users").await {
		Ok(response) => println!("Unexpected success: {}.", response.status()),
		Err(e) => println!(
			"Session could not be recovered: {e}; navigations so far: {:?}.",
			navigator.routes()
		),
	}

	let offline: ConsoleClient<MockHttpClient> = ConsoleClient::open(
		config,
		mirror,
		MockHttpClient::offline("console.example.com"),
		navigator.clone(),
	)
	.await?;

	match offline.get("/users").await {
		Err(Error::Transport(e)) => println!("Transport failures are never retried: {e}."),
		other => println!("Unexpected outcome: {other:?}."),
	}

	println!("Refresh exchanges attempted: {}.", client.refresh_metrics().attempts());

	Ok(())
}

#[derive(Clone, Debug)]
struct MockDnsFailure {
	host: &'static str,
}
impl Display for MockDnsFailure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "DNS lookup failed for {}", self.host)
	}
}
impl StdError for MockDnsFailure {}

/// Answers like a console whose refresh cookie has already expired.
#[derive(Clone, Debug, Default)]
struct MockHttpClient {
	offline: Option<MockDnsFailure>,
}
impl MockHttpClient {
	fn offline(host: &'static str) -> Self {
		Self { offline: Some(MockDnsFailure { host }) }
	}
}
impl ApiHttpClient for MockHttpClient {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			if let Some(failure) = &self.offline {
				return Err(TransportError::network(failure.clone()));
			}

			let (status, body): (StatusCode, &[u8]) = match request.uri().path() {
				"/api/maintenance" => (StatusCode::SERVICE_UNAVAILABLE, &b"down for maintenance"[..]),
				"/api/auth/refresh" => (StatusCode::UNAUTHORIZED, &br#"{"error":"session_expired"}"#[..]),
				_ => (StatusCode::UNAUTHORIZED, &br#"{"error":"token_expired"}"#[..]),
			};
			let mut response = HttpResponse::new(body.to_vec());

			*response.status_mut() = status;

			Ok(response)
		})
	}
}
