//! Client-level error types shared across the transport, recovery, and storage layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Durable mirror failure surfaced by explicit session operations.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout); never retried.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Session could not be recovered; the login escape has been triggered.
	#[error(transparent)]
	AuthRejected(#[from] AuthRejected),
	/// Server answered with a non-success, non-authorization status.
	#[error(transparent)]
	Http(#[from] HttpError),
	/// Response body did not match the expected shape.
	#[error(transparent)]
	Decode(#[from] DecodeError),
}
impl Error {
	/// Returns `true` when the caller's session is gone and the user must sign in again.
	pub fn is_auth_rejected(&self) -> bool {
		matches!(self, Self::AuthRejected(_))
	}

	/// Returns the HTTP status attached to the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Http(err) => Some(err.status),
			Self::AuthRejected(AuthRejected::RetryExhausted { status }) => Some(*status),
			Self::AuthRejected(AuthRejected::RefreshFailed(RefreshError::Rejected { status })) =>
				Some(*status),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// A URL could not be parsed.
	#[error("URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL cannot host API paths.
	#[error("Base URL `{url}` must be an absolute http(s) URL.")]
	InvalidBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// A path or route does not start with `/`.
	#[error("The {field} `{value}` must start with `/`.")]
	InvalidRoute {
		/// Config field that failed validation.
		field: &'static str,
		/// Offending value.
		value: String,
	},
	/// A required text setting is empty.
	#[error("The {field} setting must not be empty.")]
	EmptySetting {
		/// Config field that failed validation.
		field: &'static str,
	},
	/// Request header name or value is invalid.
	#[error("Request header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name as supplied by the caller.
		name: String,
	},
	/// Request body could not be encoded as JSON.
	#[error("Request body could not be encoded as JSON.")]
	BodyEncode {
		/// Underlying serializer failure.
		#[source]
		source: serde_json::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, timeout, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request did not complete in time.
	#[error("The API call timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Terminal authorization failures handed back to callers.
#[derive(Debug, ThisError)]
pub enum AuthRejected {
	/// The request was replayed with a refreshed token and still failed authorization.
	#[error("Request was rejected again after a session refresh (HTTP {status}).")]
	RetryExhausted {
		/// Status returned by the replay.
		status: u16,
	},
	/// The refresh exchange itself failed.
	#[error("Session refresh failed.")]
	RefreshFailed(#[source] RefreshError),
}

/// Failure of a single refresh exchange.
///
/// Cloneable so one settlement can be handed to every caller waiting on the same refresh.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// The refresh call never produced a response.
	#[error("Refresh endpoint could not be reached: {message}.")]
	Network {
		/// Rendered transport failure.
		message: String,
	},
	/// The server refused the ambient refresh credential.
	#[error("Refresh endpoint refused the session (HTTP {status}).")]
	Rejected {
		/// Status returned by the refresh endpoint.
		status: u16,
	},
	/// The refresh endpoint answered with an unusable body.
	#[error("Refresh endpoint returned a malformed response: {message}.")]
	MalformedResponse {
		/// What was wrong with the payload.
		message: String,
	},
}

/// Non-success, non-authorization response passed through unchanged.
#[derive(Clone, Debug, ThisError)]
#[error("API call failed with HTTP {status}.")]
pub struct HttpError {
	/// Response status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpError {
	/// Returns the body as UTF-8 text, replacing invalid sequences.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Response body decoding failure with the JSON path that failed.
#[derive(Debug, ThisError)]
#[error("Response body could not be decoded at `{path}`.")]
pub struct DecodeError {
	/// JSON path of the failing value (`.` for the root).
	pub path: String,
	/// Structured parsing failure.
	#[source]
	pub source: serde_json::Error,
}
impl From<serde_path_to_error::Error<serde_json::Error>> for DecodeError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self { path, source: e.into_inner() }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn status_is_exposed_for_http_and_auth_failures() {
		let http: Error = HttpError { status: 500, body: b"boom".to_vec() }.into();
		let exhausted: Error = AuthRejected::RetryExhausted { status: 401 }.into();
		let refused: Error = AuthRejected::RefreshFailed(RefreshError::Rejected { status: 403 }).into();
		let network: Error =
			AuthRejected::RefreshFailed(RefreshError::Network { message: "reset".into() }).into();

		assert_eq!(http.status(), Some(500));
		assert_eq!(exhausted.status(), Some(401));
		assert_eq!(refused.status(), Some(403));
		assert_eq!(network.status(), None);
		assert!(!http.is_auth_rejected());
		assert!(network.is_auth_rejected());
	}

	#[test]
	fn refresh_failure_keeps_its_source() {
		let err: Error = AuthRejected::RefreshFailed(RefreshError::Rejected { status: 401 }).into();
		// `AuthRejected` is transparent, so the first source is the refresh error itself.
		let source = StdError::source(&err)
			.expect("Refresh failures should expose the refresh error as a source.");

		assert_eq!(source.to_string(), "Refresh endpoint refused the session (HTTP 401).");
	}
}
