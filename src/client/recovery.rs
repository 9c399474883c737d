//! Pure recovery decision applied to every response the client observes.
//!
//! The decision depends only on the response status, the caller's [`RetriedMarker`], and the
//! coordinator's [`RefreshState`], so the whole protocol can be exercised without a network.

// crates.io
use http::StatusCode;
// self
use crate::{
	_prelude::*,
	client::{RefreshState, RetriedMarker},
	error::AuthRejected,
};

/// Status the server uses for both invalid and expired access tokens.
pub const AUTHORIZATION_FAILURE: StatusCode = StatusCode::UNAUTHORIZED;

/// What the client does with a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecoveryDecision {
	/// Success; hand the response to the caller.
	Deliver,
	/// First authorization failure while no refresh is running; start one.
	StartRefresh,
	/// First authorization failure while a refresh is running; wait for its settlement.
	JoinRefresh,
	/// Authorization failure on a replayed request; final.
	Reject,
	/// Any other failure status; passed through unchanged.
	Propagate,
}
impl RecoveryDecision {
	/// Decides how to handle a response.
	pub fn decide(status: StatusCode, marker: RetriedMarker, state: RefreshState) -> Self {
		if status.is_success() {
			return Self::Deliver;
		}
		if status != AUTHORIZATION_FAILURE {
			return Self::Propagate;
		}

		match (marker, state) {
			(RetriedMarker::Replayed, _) => Self::Reject,
			(RetriedMarker::Fresh, RefreshState::Idle) => Self::StartRefresh,
			(RetriedMarker::Fresh, RefreshState::Refreshing) => Self::JoinRefresh,
		}
	}

	/// Returns `true` when the caller must wait for a refresh settlement.
	pub const fn needs_refresh(self) -> bool {
		matches!(self, Self::StartRefresh | Self::JoinRefresh)
	}

	/// Failure class of the response, or `None` for delivered responses.
	pub const fn failure_class(self) -> Option<FailureClass> {
		match self {
			Self::Deliver => None,
			Self::StartRefresh | Self::JoinRefresh => Some(FailureClass::AuthExpired),
			Self::Reject => Some(FailureClass::AuthRejected),
			Self::Propagate => Some(FailureClass::OtherHttp),
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Deliver => "deliver",
			Self::StartRefresh => "start_refresh",
			Self::JoinRefresh => "join_refresh",
			Self::Reject => "reject",
			Self::Propagate => "propagate",
		}
	}
}
impl Display for RecoveryDecision {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Failure taxonomy seen by callers and the recovery protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureClass {
	/// Network or timeout failure; never retried.
	Transport,
	/// Authorization failure on a fresh request; recoverable by refreshing.
	AuthExpired,
	/// Authorization failure that cannot be recovered.
	AuthRejected,
	/// Any other non-success status.
	OtherHttp,
}
impl FailureClass {
	/// Classifies an error returned by the client. Only terminal classes can reach callers.
	pub fn of(error: &Error) -> Option<Self> {
		match error {
			Error::Transport(_) => Some(Self::Transport),
			Error::AuthRejected(AuthRejected::RetryExhausted { .. } | AuthRejected::RefreshFailed(_)) =>
				Some(Self::AuthRejected),
			Error::Http(_) => Some(Self::OtherHttp),
			Error::Storage(_) | Error::Config(_) | Error::Decode(_) => None,
		}
	}
}
