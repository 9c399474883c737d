//! Console client facade: authenticates every call and recovers expired sessions.

pub mod recovery;
pub mod refresh;
pub mod request;

pub use recovery::*;
pub use refresh::*;
pub use request::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, RequestAuthenticator},
	config::ClientConfig,
	error::{AuthRejected, ConfigError, HttpError},
	http::{ApiHttpClient, HttpResponse},
	navigation::{NavigationEscape, Navigator},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{StoreError, TokenMirror, TokenStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Console client specialized for the crate's default reqwest transport stack.
pub type ReqwestConsoleClient = ConsoleClient<ReqwestHttpClient>;

/// Sends console API calls with the current bearer token and recovers from session expiry.
///
/// The client owns the transport, the shared [`TokenStore`], the [`RefreshCoordinator`], and the
/// [`NavigationEscape`]. Clones share all of them, so every clone participates in the same
/// refresh storms and fires at most one login redirect per failed refresh.
pub struct ConsoleClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	http_client: Arc<C>,
	config: Arc<ClientConfig>,
	tokens: Arc<TokenStore>,
	authenticator: RequestAuthenticator,
	coordinator: Arc<RefreshCoordinator<C>>,
	escape: Arc<NavigationEscape>,
}
impl<C> ConsoleClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(
		config: ClientConfig,
		tokens: Arc<TokenStore>,
		http_client: impl Into<Arc<C>>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self, ConfigError> {
		config.validate()?;

		let http_client = http_client.into();
		let coordinator = RefreshCoordinator::new(http_client.clone(), tokens.clone(), &config)?;
		let escape = NavigationEscape::new(navigator, config.login_route.clone());

		Ok(Self {
			http_client,
			authenticator: RequestAuthenticator::new(tokens.clone()),
			tokens,
			coordinator: Arc::new(coordinator),
			escape: Arc::new(escape),
			config: Arc::new(config),
		})
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Shared token store.
	pub fn tokens(&self) -> &Arc<TokenStore> {
		&self.tokens
	}

	/// Refresh coordinator shared by every clone of this client.
	pub fn coordinator(&self) -> &RefreshCoordinator<C> {
		&self.coordinator
	}

	/// Refresh exchange counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		self.coordinator.metrics()
	}

	/// Current access token, if the session holds one.
	pub fn token(&self) -> Option<AccessToken> {
		self.tokens.get()
	}

	/// Stores a token issued by the login screen.
	pub async fn sign_in(&self, token: AccessToken) -> Result<(), StoreError> {
		self.tokens.set(token).await
	}

	/// Ends the session by dropping the token and its durable copy.
	pub async fn sign_out(&self) -> Result<(), StoreError> {
		self.tokens.clear().await
	}

	/// Sends `GET path`.
	pub async fn get(&self, path: &str) -> Result<ApiResponse> {
		self.send(ApiRequest::get(path)).await
	}

	/// Sends `DELETE path`.
	pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
		self.send(ApiRequest::delete(path)).await
	}

	/// Sends `POST path` with a JSON body.
	pub async fn post_json<T>(&self, path: &str, body: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.send(ApiRequest::post(path).with_json(body)?).await
	}

	/// Sends `PUT path` with a JSON body.
	pub async fn put_json<T>(&self, path: &str, body: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.send(ApiRequest::put(path).with_json(body)?).await
	}

	/// Sends `PATCH path` with a JSON body.
	pub async fn patch_json<T>(&self, path: &str, body: &T) -> Result<ApiResponse>
	where
		T: ?Sized + Serialize,
	{
		self.send(ApiRequest::patch(path).with_json(body)?).await
	}

	/// Sends `request`, refreshing the session and replaying once when the token has expired.
	///
	/// Resolves with the response for any 2xx status. Other statuses surface as
	/// [`Error::Http`], a second authorization failure or a failed refresh as
	/// [`Error::AuthRejected`], and transport failures as [`Error::Transport`].
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.send_with_recovery(&request)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn send_with_recovery(&self, request: &ApiRequest) -> Result<ApiResponse> {
		let mut attempt = Attempt::new(request);

		loop {
			// Snapshot before the token is read so a refresh that lands mid-flight is reused.
			let observed_epoch = self.coordinator.epoch();
			let response = self.dispatch(attempt.request()).await?;
			let status = response.status();
			let decision =
				RecoveryDecision::decide(status, attempt.marker(), self.coordinator.state());

			obs::record_recovery(decision);

			match decision {
				RecoveryDecision::Deliver => return Ok(ApiResponse::from_http(response)),
				RecoveryDecision::Propagate =>
					return Err(HttpError { status: status.as_u16(), body: response.into_body() }.into()),
				RecoveryDecision::Reject =>
					return Err(AuthRejected::RetryExhausted { status: status.as_u16() }.into()),
				RecoveryDecision::StartRefresh | RecoveryDecision::JoinRefresh => {
					let settlement = self.coordinator.settle(observed_epoch).await;

					if let Err(e) = settlement.outcome {
						self.escape.escape(settlement.epoch);

						return Err(AuthRejected::RefreshFailed(e).into());
					}

					attempt.mark_replayed();
				},
			}
		}
	}

	async fn dispatch(&self, request: &ApiRequest) -> Result<HttpResponse> {
		let mut wire = request.to_http(&self.config)?;

		self.authenticator.authenticate(&mut wire);

		Ok(self.http_client.execute(wire).await?)
	}
}
impl<C> ConsoleClient<C>
where
	C: ApiHttpClient,
{
	/// Opens the token store over `mirror` and builds a client around `http_client`.
	pub async fn open(
		config: ClientConfig,
		mirror: Arc<dyn TokenMirror>,
		http_client: C,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self> {
		let tokens = TokenStore::open(mirror, config.storage_key.clone()).await?;

		Ok(Self::with_http_client(config, Arc::new(tokens), http_client, navigator)?)
	}
}
#[cfg(feature = "reqwest")]
impl ConsoleClient<ReqwestHttpClient> {
	/// Creates a client with its own cookie-carrying reqwest transport.
	///
	/// The transport honors [`ClientConfig::timeout`].
	pub fn new(
		config: ClientConfig,
		tokens: Arc<TokenStore>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::with_cookie_store(config.timeout)?;

		Self::with_http_client(config, tokens, http_client, navigator)
	}
}
impl<C> Clone for ConsoleClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			config: self.config.clone(),
			tokens: self.tokens.clone(),
			authenticator: self.authenticator.clone(),
			coordinator: self.coordinator.clone(),
			escape: self.escape.clone(),
		}
	}
}
impl<C> Debug for ConsoleClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConsoleClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("tokens", &self.tokens)
			.field("coordinator", &self.coordinator)
			.field("escape", &self.escape)
			.finish()
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// crates.io
	use httpmock::prelude::*;
	// self
	use super::*;
	use crate::_preludet::*;

	#[tokio::test]
	async fn sign_in_and_sign_out_drive_the_bearer_header() {
		let server = MockServer::start_async().await;
		let (client, mirror, _navigator) = build_reqwest_test_client(&server.base_url(), None).await;
		let signed = server
			.mock_async(|when, then| {
				when.method(GET).path("/me").header("authorization", "Bearer T9");
				then.status(200).json_body(serde_json::json!({ "name": "ops" }));
			})
			.await;

		client.sign_in(AccessToken::new("T9")).await.expect("Sign-in should mirror the token.");

		let response = client.get("/me").await.expect("Signed-in call should succeed.");

		assert_eq!(response.status(), 200);
		signed.assert_async().await;
		assert_eq!(
			mirror.load(TEST_STORAGE_KEY).await.expect("Mirror load should succeed."),
			Some("T9".into())
		);

		client.sign_out().await.expect("Sign-out should clear the mirror.");

		assert!(client.token().is_none());
		assert!(mirror.is_empty());
	}

	#[tokio::test]
	async fn json_helpers_encode_bodies() {
		let server = MockServer::start_async().await;
		let (client, _mirror, _navigator) =
			build_reqwest_test_client(&server.base_url(), Some("T0")).await;
		let created = server
			.mock_async(|when, then| {
				when.method(POST)
					.path("/users")
					.header("content-type", "application/json")
					.json_body(serde_json::json!({ "name": "Ada" }));
				then.status(201).json_body(serde_json::json!({ "id": 7 }));
			})
			.await;
		let response = client
			.post_json("/users", &serde_json::json!({ "name": "Ada" }))
			.await
			.expect("Create call should succeed.");

		assert_eq!(response.status(), 201);
		assert_eq!(
			response.json::<serde_json::Value>().expect("Body should decode.")["id"],
			serde_json::json!(7)
		);
		created.assert_async().await;
	}

	#[tokio::test]
	async fn transport_failures_are_not_retried() {
		// Nothing listens on the discard port.
		let (client, _mirror, navigator) =
			build_reqwest_test_client("http://127.0.0.1:9/", Some("T0")).await;
		let err = client.get("/anything").await.expect_err("Unreachable hosts should fail.");

		assert!(matches!(err, Error::Transport(_)), "{err:?}");
		assert_eq!(client.refresh_metrics().attempts(), 0);
		assert_eq!(navigator.count(), 0);
	}
}
