//! Demonstrates a console session over the default reqwest transport: sign in through a login
//! endpoint that sets the refresh cookie, let the access token expire, and watch three
//! concurrent calls share a single refresh.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use console_session::{
	auth::AccessToken,
	client::ReqwestConsoleClient,
	config::ClientConfig,
	http::ReqwestHttpClient,
	reqwest::Client,
	store::{MemoryMirror, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(200)
				.header("set-cookie", "refresh=demo-refresh; Path=/; HttpOnly")
				.json_body(serde_json::json!({ "token": "expired-token" }));
		})
		.await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer expired-token");
			then.status(401).json_body(serde_json::json!({ "error": "token_expired" }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").header("cookie", "refresh=demo-refresh");
			then.status(200).json_body(serde_json::json!({ "token": "fresh-token" }));
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer fresh-token");
			then.status(200).json_body(serde_json::json!({ "data": "ok" }));
		})
		.await;
	let config = ClientConfig::builder(Url::parse(&server.base_url())?)
		.timeout(Duration::from_secs(5))
		.build()?;
	let tokens = Arc::new(TokenStore::open(Arc::new(MemoryMirror::default()), "access_token").await?);
	// The mock server presents a self-signed certificate.
	let http_client = ReqwestHttpClient::with_builder(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.timeout(Duration::from_secs(5)),
	)?;
	let client = ReqwestConsoleClient::with_http_client(
		config,
		tokens,
		http_client,
		Arc::new(|route: &str| println!("Navigating to {route}.")),
	)?;
	let issued = client
		.post_json("/auth/login", &serde_json::json!({ "user": "ops", "password": "demo" }))
		.await?
		.json::<serde_json::Value>()?;

	if let Some(token) = issued["token"].as_str() {
		client.sign_in(AccessToken::new(token)).await?;
	}

	let (users, audit, settings) =
		tokio::join!(client.get("/users"), client.get("/audit"), client.get("/settings"));

	for (path, response) in [("/users", users?), ("/audit", audit?), ("/settings", settings?)] {
		println!("{path} answered {} with {}.", response.status(), response.text());
	}

	let metrics = client.refresh_metrics();

	println!(
		"Refresh exchanges: {} attempted, {} succeeded, {} callers joined an exchange.",
		metrics.attempts(),
		metrics.successes(),
		metrics.joined()
	);

	login.assert_async().await;
	refresh.assert_calls_async(1).await;
	stale.assert_calls_async(3).await;
	fresh.assert_calls_async(3).await;

	Ok(())
}
