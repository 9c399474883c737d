mod common;

// std
use std::time::Duration;
// crates.io
use tokio::task::JoinSet;
// self
use common::{ScriptedConsole, harness, mirrored};
use console_session::{
	client::RefreshState,
	error::{AuthRejected, Error, RefreshError},
};

#[tokio::test]
async fn unauthenticated_call_refreshes_then_replays_with_the_new_token() {
	let h = harness(ScriptedConsole::default(), None).await;
	let response = h.client.get("/resource").await.expect("Recovered call should succeed.");
	let body: serde_json::Value = response.json().expect("Resource body should decode.");

	assert_eq!(body, serde_json::json!({ "data": "ok" }));
	assert_eq!(h.console.authorizations(), vec![None, Some("Bearer T1".to_owned())]);
	assert_eq!(h.console.refresh_calls(), 1);
	assert_eq!(mirrored(&h.mirror).await.as_deref(), Some("T1"));
	assert_eq!(h.navigator.count(), 0);
}

#[tokio::test]
async fn replayed_authorization_failure_is_final() {
	let h = harness(ScriptedConsole::default().rejecting_everything(), Some("T0")).await;
	let err = h.client.get("/resource").await.expect_err("Second rejection should be final.");

	assert!(
		matches!(err, Error::AuthRejected(AuthRejected::RetryExhausted { status: 401 })),
		"{err:?}"
	);
	assert_eq!(h.console.resource_calls(), 2);
	assert_eq!(h.console.refresh_calls(), 1);
	assert_eq!(
		h.console.authorizations(),
		vec![Some("Bearer T0".to_owned()), Some("Bearer T1".to_owned())]
	);
	assert_eq!(h.navigator.count(), 0);
	assert_eq!(h.client.token().map(|token| token.expose().to_owned()).as_deref(), Some("T1"));
}

#[tokio::test]
async fn concurrent_pair_shares_one_refresh() {
	let console =
		ScriptedConsole::default().gate_stale_callers(2).refresh_delay(Duration::from_millis(20));
	let h = harness(console, Some("T0")).await;
	let (a, b) = tokio::join!(h.client.get("/a"), h.client.get("/b"));

	assert_eq!(a.expect("Caller A should recover.").status(), 200);
	assert_eq!(b.expect("Caller B should recover.").status(), 200);
	assert_eq!(h.console.refresh_calls(), 1);
	assert_eq!(h.client.refresh_metrics().attempts(), 1);
	assert_eq!(h.client.refresh_metrics().joined(), 1);
	assert_eq!(h.client.coordinator().epoch(), 1);
	assert_eq!(h.client.coordinator().state(), RefreshState::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn storm_of_callers_triggers_exactly_one_exchange() {
	const CALLERS: usize = 16;

	let console = ScriptedConsole::default()
		.gate_stale_callers(CALLERS)
		.refresh_delay(Duration::from_millis(20));
	let h = harness(console, Some("T0")).await;
	let mut set = JoinSet::new();

	for i in 0..CALLERS {
		let client = h.client.clone();

		set.spawn(async move { client.get(&format!("/items/{i}")).await });
	}

	let mut delivered = 0;

	while let Some(joined) = set.join_next().await {
		let response = joined.expect("Caller task should not panic.").expect("Caller should recover.");

		assert_eq!(response.status(), 200);

		delivered += 1;
	}

	assert_eq!(delivered, CALLERS);
	assert_eq!(h.console.refresh_calls(), 1);
	assert_eq!(h.console.resource_calls(), CALLERS * 2);
	assert_eq!(h.client.refresh_metrics().attempts(), 1);
	assert_eq!(h.client.refresh_metrics().successes(), 1);
	assert_eq!(h.client.refresh_metrics().joined(), (CALLERS - 1) as u64);
	assert_eq!(mirrored(&h.mirror).await.as_deref(), Some("T1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_refresh_rejects_every_caller_and_navigates_once() {
	const CALLERS: usize = 8;

	let console = ScriptedConsole::default()
		.failing_refresh()
		.gate_stale_callers(CALLERS)
		.refresh_delay(Duration::from_millis(20));
	let h = harness(console, Some("T0")).await;
	let mut set = JoinSet::new();

	for _ in 0..CALLERS {
		let client = h.client.clone();

		set.spawn(async move { client.get("/resource").await });
	}

	while let Some(joined) = set.join_next().await {
		let err = joined
			.expect("Caller task should not panic.")
			.expect_err("Every caller should be rejected.");

		assert!(
			matches!(
				err,
				Error::AuthRejected(AuthRejected::RefreshFailed(RefreshError::Rejected { status: 401 }))
			),
			"{err:?}"
		);
	}

	assert_eq!(h.console.refresh_calls(), 1);
	assert_eq!(h.console.resource_calls(), CALLERS);
	assert_eq!(h.navigator.routes(), vec!["/login".to_owned()]);
	assert_eq!(h.client.refresh_metrics().failures(), 1);
	assert!(h.client.token().is_none());
	assert_eq!(mirrored(&h.mirror).await, None);
}

#[tokio::test]
async fn each_storm_settles_separately() {
	let h = harness(ScriptedConsole::default(), Some("T0")).await;

	h.client.get("/resource").await.expect("First storm should recover.");
	h.console.revoke();
	h.client.get("/resource").await.expect("Second storm should recover.");

	assert_eq!(h.console.refresh_calls(), 2);
	assert_eq!(h.client.coordinator().epoch(), 2);
	assert_eq!(mirrored(&h.mirror).await.as_deref(), Some("T2"));
}

#[tokio::test]
async fn each_failed_storm_navigates_once() {
	let h = harness(ScriptedConsole::default().failing_refresh(), Some("T0")).await;

	h.client.get("/a").await.expect_err("First storm should fail.");
	h.client.get("/b").await.expect_err("Second storm should fail.");

	assert_eq!(h.console.refresh_calls(), 2);
	assert_eq!(h.navigator.count(), 2);
	// The second call had no token left to send.
	assert_eq!(h.console.authorizations(), vec![Some("Bearer T0".to_owned()), None]);
}

#[tokio::test]
async fn dropped_leader_hands_the_exchange_to_the_next_caller() {
	let console = ScriptedConsole::default().refresh_delay(Duration::from_millis(200));
	let h = harness(console, Some("T0")).await;
	let abandoned = tokio::time::timeout(Duration::from_millis(20), h.client.get("/a")).await;

	assert!(abandoned.is_err(), "The first call should be cancelled mid-exchange.");
	assert_eq!(h.client.coordinator().state(), RefreshState::Idle);
	assert_eq!(h.client.coordinator().epoch(), 0);

	h.client.get("/b").await.expect("The next caller should perform its own exchange.");

	assert_eq!(h.console.refresh_calls(), 2);
	assert_eq!(h.client.coordinator().epoch(), 1);
	assert_eq!(h.client.token().map(|token| token.expose().to_owned()).as_deref(), Some("T2"));
}
