//! Refresh exchange orchestration with a singleflight guard and settlement sharing.
//!
//! Every caller that observes an authorization failure records the refresh epoch it saw
//! before dispatching, then calls [`RefreshCoordinator::settle`]. Callers queue on one async
//! lock; the first caller whose observed epoch is still current performs the exchange, and
//! everyone queued behind it finds a newer settlement and reuses it. A failure storm therefore
//! produces exactly one exchange, and one settlement that every waiter receives.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
// crates.io
use http::Method;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	config::ClientConfig,
	error::{ConfigError, RefreshError},
	http::ApiHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::TokenStore,
};

/// Whether a refresh exchange is currently in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RefreshState {
	/// No exchange in flight.
	#[default]
	Idle,
	/// An exchange is in flight; new authorization failures join it.
	Refreshing,
}

/// Outcome of one refresh exchange, shared by every caller of the same storm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
	/// Epoch produced by the exchange (1 for the first exchange).
	pub epoch: u64,
	/// New token, or the reason the session is gone.
	pub outcome: Result<AccessToken, RefreshError>,
}

/// Exchanges the ambient refresh credential for a new access token, once per failure storm.
pub struct RefreshCoordinator<C>
where
	C: ?Sized + ApiHttpClient,
{
	http_client: Arc<C>,
	tokens: Arc<TokenStore>,
	endpoint: Url,
	token_field: String,
	last: AsyncMutex<Option<Settlement>>,
	epoch: AtomicU64,
	refreshing: AtomicBool,
	metrics: RefreshMetrics,
}
impl<C> RefreshCoordinator<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a coordinator for the refresh endpoint described by `config`.
	pub fn new(
		http_client: Arc<C>,
		tokens: Arc<TokenStore>,
		config: &ClientConfig,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			http_client,
			tokens,
			endpoint: config.refresh_endpoint()?,
			token_field: config.token_field.clone(),
			last: AsyncMutex::new(None),
			epoch: AtomicU64::new(0),
			refreshing: AtomicBool::new(false),
			metrics: RefreshMetrics::default(),
		})
	}

	/// Number of settled exchanges so far.
	pub fn epoch(&self) -> u64 {
		self.epoch.load(Ordering::Acquire)
	}

	/// Current refresh state.
	pub fn state(&self) -> RefreshState {
		if self.refreshing.load(Ordering::Acquire) {
			RefreshState::Refreshing
		} else {
			RefreshState::Idle
		}
	}

	/// Exchange counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Refreshes the session now, joining any exchange that settles while this call waits.
	pub async fn refresh(&self) -> Result<AccessToken, RefreshError> {
		self.settle(self.epoch()).await.outcome
	}

	/// Returns the first settlement newer than `observed_epoch`, performing the exchange when
	/// none exists yet.
	pub async fn settle(&self, observed_epoch: u64) -> Settlement {
		let span = FlowSpan::new(FlowKind::Refresh, "settle");

		span.instrument(async move {
			let mut last = self.last.lock().await;

			if let Some(settled) = last.as_ref().filter(|settled| settled.epoch > observed_epoch) {
				self.metrics.record_join();

				return settled.clone();
			}

			let outcome = {
				let _refreshing = RefreshingGuard::enter(&self.refreshing);

				self.exchange().await
			};
			let settlement = Settlement { epoch: self.epoch.load(Ordering::Acquire) + 1, outcome };

			*last = Some(settlement.clone());
			self.epoch.store(settlement.epoch, Ordering::Release);

			settlement
		})
		.await
	}

	async fn exchange(&self) -> Result<AccessToken, RefreshError> {
		const KIND: FlowKind = FlowKind::Refresh;

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_attempt();

		let result = self.request_token().await;

		match &result {
			Ok(token) => {
				// Memory is updated even when the mirror write fails; the store logs the lag.
				let _ = self.tokens.set(token.clone()).await;

				self.metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(_) => {
				let _ = self.tokens.clear().await;

				self.metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	async fn request_token(&self) -> Result<AccessToken, RefreshError> {
		let request = http::Request::builder()
			.method(Method::POST)
			.uri(self.endpoint.as_str())
			.body(Vec::new())
			.map_err(|e| RefreshError::Network { message: e.to_string() })?;
		let response = self
			.http_client
			.execute(request)
			.await
			.map_err(|e| RefreshError::Network { message: e.to_string() })?;

		if !response.status().is_success() {
			return Err(RefreshError::Rejected { status: response.status().as_u16() });
		}

		parse_token(response.body(), &self.token_field)
	}
}
impl<C> Debug for RefreshCoordinator<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("endpoint", &self.endpoint.as_str())
			.field("epoch", &self.epoch())
			.field("state", &self.state())
			.finish()
	}
}

struct RefreshingGuard<'a>(&'a AtomicBool);
impl<'a> RefreshingGuard<'a> {
	fn enter(flag: &'a AtomicBool) -> Self {
		flag.store(true, Ordering::Release);

		Self(flag)
	}
}
impl Drop for RefreshingGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

fn parse_token(body: &[u8], field: &str) -> Result<AccessToken, RefreshError> {
	let payload: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
		RefreshError::MalformedResponse { message: format!("body is not JSON ({e})") }
	})?;
	let token = payload
		.get(field)
		.and_then(serde_json::Value::as_str)
		.map(AccessToken::new)
		.ok_or_else(|| RefreshError::MalformedResponse {
			message: format!("missing string field `{field}`"),
		})?;

	if !token.is_header_safe() {
		return Err(RefreshError::MalformedResponse {
			message: format!("field `{field}` is not a usable bearer token"),
		});
	}

	Ok(token)
}
