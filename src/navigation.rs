//! Login escape: the single redirect issued when a session cannot be recovered.
//!
//! The router is an injected [`Navigator`]; the transport layer never reaches for a globally
//! captured callback. [`NavigationEscape`] guarantees one redirect per failed refresh storm even
//! when many callers observe the same failure.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::_prelude::*;

/// Performs a client-side route change.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Navigates to `route`.
	fn navigate(&self, route: &str);
}
impl<F> Navigator for F
where
	F: Fn(&str) + Send + Sync,
{
	fn navigate(&self, route: &str) {
		self(route)
	}
}

/// Navigator that records every route it is asked to visit.
///
/// Useful for headless hosts that poll for a pending redirect, and for tests.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
	routes: Mutex<Vec<String>>,
}
impl RecordingNavigator {
	/// Returns every route visited so far, oldest first.
	pub fn routes(&self) -> Vec<String> {
		self.routes.lock().clone()
	}

	/// Returns the number of navigations performed.
	pub fn count(&self) -> usize {
		self.routes.lock().len()
	}
}
impl Navigator for RecordingNavigator {
	fn navigate(&self, route: &str) {
		self.routes.lock().push(route.to_owned());
	}
}

/// Fires the login redirect at most once per settled refresh epoch.
pub struct NavigationEscape {
	navigator: Arc<dyn Navigator>,
	login_route: String,
	escaped_epoch: AtomicU64,
}
impl NavigationEscape {
	/// Creates an escape that sends the user to `login_route`.
	pub fn new(navigator: Arc<dyn Navigator>, login_route: impl Into<String>) -> Self {
		Self { navigator, login_route: login_route.into(), escaped_epoch: AtomicU64::new(0) }
	}

	/// Redirects to the login route unless the storm that settled at `epoch` already did.
	///
	/// Returns `true` when this call performed the navigation.
	pub fn escape(&self, epoch: u64) -> bool {
		let previous = self.escaped_epoch.fetch_max(epoch, Ordering::AcqRel);

		if previous >= epoch {
			return false;
		}

		self.navigator.navigate(&self.login_route);

		true
	}

	/// Route used for the redirect.
	pub fn login_route(&self) -> &str {
		&self.login_route
	}
}
impl Debug for NavigationEscape {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("NavigationEscape")
			.field("login_route", &self.login_route)
			.field("escaped_epoch", &self.escaped_epoch.load(Ordering::Relaxed))
			.finish()
	}
}
