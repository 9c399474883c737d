#![allow(dead_code)]

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use async_lock::Barrier;
use http::{StatusCode, header::AUTHORIZATION};
use parking_lot::Mutex;
// self
use console_session::{
	client::ConsoleClient,
	config::ClientConfig,
	http::{ApiHttpClient, HttpRequest, HttpResponse, TransportFuture},
	navigation::RecordingNavigator,
	store::{MemoryMirror, TokenMirror, TokenStore},
	url::Url,
};

pub const BASE_URL: &str = "https://console.example.com/api/";
pub const STORAGE_KEY: &str = "access_token";

/// In-process console API: `/auth/refresh` rotates tokens, every other path requires the
/// current one.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
	accepted: Mutex<Option<String>>,
	authorizations: Mutex<Vec<Option<String>>>,
	refresh_calls: AtomicUsize,
	resource_calls: AtomicUsize,
	refresh_delay_ms: AtomicU64,
	refresh_fails: AtomicBool,
	reject_all: AtomicBool,
	stale_gate: Mutex<Option<(Arc<Barrier>, usize)>>,
	gated: AtomicUsize,
}
impl ScriptedConsole {
	pub fn accepting(token: &str) -> Self {
		let console = Self::default();

		*console.accepted.lock() = Some(token.to_owned());

		console
	}

	pub fn refresh_delay(self, delay: Duration) -> Self {
		self.refresh_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);

		self
	}

	pub fn failing_refresh(self) -> Self {
		self.refresh_fails.store(true, Ordering::SeqCst);

		self
	}

	pub fn rejecting_everything(self) -> Self {
		self.reject_all.store(true, Ordering::SeqCst);

		self
	}

	/// Holds the first `callers` rejected resource calls until all of them have arrived, so
	/// every caller observes the failure before any refresh can settle.
	pub fn gate_stale_callers(self, callers: usize) -> Self {
		*self.stale_gate.lock() = Some((Arc::new(Barrier::new(callers)), callers));

		self
	}

	/// Invalidates every token issued so far.
	pub fn revoke(&self) {
		self.accepted.lock().take();
	}

	pub fn refresh_calls(&self) -> usize {
		self.refresh_calls.load(Ordering::SeqCst)
	}

	pub fn resource_calls(&self) -> usize {
		self.resource_calls.load(Ordering::SeqCst)
	}

	pub fn authorizations(&self) -> Vec<Option<String>> {
		self.authorizations.lock().clone()
	}

	async fn refresh(&self) -> HttpResponse {
		let issued = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
		let delay = self.refresh_delay_ms.load(Ordering::SeqCst);

		if delay > 0 {
			tokio::time::sleep(Duration::from_millis(delay)).await;
		}
		if self.refresh_fails.load(Ordering::SeqCst) {
			return respond(StatusCode::UNAUTHORIZED, br#"{"error":"session_expired"}"#.to_vec());
		}

		let token = format!("T{issued}");

		*self.accepted.lock() = Some(token.clone());

		let body = serde_json::to_vec(&serde_json::json!({ "token": token }))
			.expect("Refresh body should encode.");

		respond(StatusCode::OK, body)
	}

	async fn resource(&self, request: &HttpRequest) -> HttpResponse {
		self.resource_calls.fetch_add(1, Ordering::SeqCst);

		let authorization = request
			.headers()
			.get(AUTHORIZATION)
			.map(|value| value.to_str().expect("Authorization header should be ASCII.").to_owned());

		self.authorizations.lock().push(authorization.clone());

		let expected = self.accepted.lock().as_ref().map(|token| format!("Bearer {token}"));
		let authorized = !self.reject_all.load(Ordering::SeqCst)
			&& expected.is_some()
			&& authorization == expected;

		if authorized {
			return respond(StatusCode::OK, br#"{"data":"ok"}"#.to_vec());
		}

		let gate = self.stale_gate.lock().clone();

		if let Some((barrier, callers)) = gate {
			if self.gated.fetch_add(1, Ordering::SeqCst) < callers {
				barrier.wait().await;
			}
		}

		respond(StatusCode::UNAUTHORIZED, br#"{"error":"token_expired"}"#.to_vec())
	}
}

/// Shares one [`ScriptedConsole`] between the test and the client under test.
#[derive(Clone, Debug)]
pub struct ScriptedTransport(pub Arc<ScriptedConsole>);
impl ApiHttpClient for ScriptedTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			if request.uri().path().ends_with("/auth/refresh") {
				assert!(
					request.headers().get(AUTHORIZATION).is_none(),
					"Refresh calls must not carry a bearer token."
				);

				Ok(self.0.refresh().await)
			} else {
				Ok(self.0.resource(&request).await)
			}
		})
	}
}

pub struct Harness {
	pub client: ConsoleClient<ScriptedTransport>,
	pub console: Arc<ScriptedConsole>,
	pub mirror: Arc<MemoryMirror>,
	pub navigator: Arc<RecordingNavigator>,
}

pub fn config() -> ClientConfig {
	ClientConfig::builder(Url::parse(BASE_URL).expect("Base URL fixture should parse."))
		.build()
		.expect("Default config should validate.")
}

pub async fn harness(console: ScriptedConsole, token: Option<&str>) -> Harness {
	let mirror = Arc::new(MemoryMirror::default());

	if let Some(token) = token {
		mirror.save(STORAGE_KEY, token).await.expect("Seeding the mirror should succeed.");
	}

	let tokens = TokenStore::open(mirror.clone(), STORAGE_KEY)
		.await
		.expect("Opening the token store should succeed.");
	let console = Arc::new(console);
	let navigator = Arc::new(RecordingNavigator::default());
	let client: ConsoleClient<ScriptedTransport> = ConsoleClient::with_http_client(
		config(),
		Arc::new(tokens),
		ScriptedTransport(console.clone()),
		navigator.clone(),
	)
	.expect("Scripted client should build.");

	Harness { client, console, mirror, navigator }
}

pub async fn mirrored(mirror: &MemoryMirror) -> Option<String> {
	mirror.load(STORAGE_KEY).await.expect("Mirror load should succeed.")
}

fn respond(status: StatusCode, body: Vec<u8>) -> HttpResponse {
	let mut response = HttpResponse::new(body);

	*response.status_mut() = status;

	response
}
