//! Bearer-token HTTP access layer for admin consoles.
//!
//! Every call carries the current access token. An expired session is recovered with a single
//! refresh per failure storm, and the user is sent to the login screen once when recovery is
//! impossible.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod navigation;
pub mod obs;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::ClientConfig,
		store::{MemoryMirror, TokenMirror, TokenStore},
	};
	#[cfg(feature = "reqwest")]
	use crate::{client::ConsoleClient, http::ReqwestHttpClient, navigation::RecordingNavigator};

	/// Storage key used by test fixtures.
	pub const TEST_STORAGE_KEY: &str = "access_token";

	/// Console client type alias used by reqwest-backed tests.
	#[cfg(feature = "reqwest")]
	pub type ReqwestTestClient = ConsoleClient<ReqwestHttpClient>;

	/// Builds a cookie-carrying reqwest client that accepts the self-signed certificates produced
	/// by `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_http_client(timeout: Option<std::time::Duration>) -> ReqwestHttpClient {
		let mut builder = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true);

		if let Some(timeout) = timeout {
			builder = builder.timeout(timeout);
		}

		ReqwestHttpClient::with_builder(builder)
			.expect("Failed to build insecure reqwest client for tests.")
	}

	/// Builds a validated config rooted at `base_url` with default routes.
	pub fn test_config(base_url: &str) -> ClientConfig {
		ClientConfig::builder(Url::parse(base_url).expect("Test base URL should parse."))
			.build()
			.expect("Test client config should validate.")
	}

	/// Opens a token store over a fresh in-memory mirror, optionally seeded with `token`.
	pub async fn seeded_token_store(token: Option<&str>) -> (Arc<TokenStore>, Arc<MemoryMirror>) {
		let mirror = Arc::new(MemoryMirror::default());

		if let Some(value) = token {
			mirror
				.save(TEST_STORAGE_KEY, value)
				.await
				.expect("Seeding the in-memory mirror should succeed.");
		}

		let store = TokenStore::open(mirror.clone(), TEST_STORAGE_KEY)
			.await
			.expect("Opening a token store over the in-memory mirror should succeed.");

		(Arc::new(store), mirror)
	}

	/// Constructs a reqwest-backed [`ConsoleClient`] with an in-memory mirror and a recording
	/// navigator.
	#[cfg(feature = "reqwest")]
	pub async fn build_reqwest_test_client(
		base_url: &str,
		token: Option<&str>,
	) -> (ReqwestTestClient, Arc<MemoryMirror>, Arc<RecordingNavigator>) {
		let (tokens, mirror) = seeded_token_store(token).await;
		let navigator = Arc::new(RecordingNavigator::default());
		let http_client = test_reqwest_http_client(None);
		let client =
			ConsoleClient::with_http_client(test_config(base_url), tokens, http_client, navigator.clone())
				.expect("Test console client should build.");

		(client, mirror, navigator)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
