//! Redacted bearer token wrapper keeping session material out of logs.

// self
use crate::_prelude::*;

/// Opaque, short-lived bearer credential authorizing API calls.
///
/// `Debug` and `Display` never print the value; call [`AccessToken::expose`] only when writing
/// the token onto the wire or into the durable mirror.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);
impl AccessToken {
	/// Wraps a new token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the token is non-empty and can be carried in an HTTP header.
	pub fn is_header_safe(&self) -> bool {
		!self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_graphic())
	}
}
impl AsRef<str> for AccessToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AccessToken").field(&"<redacted>").finish()
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
