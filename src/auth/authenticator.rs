//! Attaches the current bearer token to outgoing API requests.

// crates.io
use http::{
	HeaderValue,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{_prelude::*, auth::AccessToken, http::HttpRequest, store::TokenStore};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Reads the [`TokenStore`] for every outbound request and signs it when a token is held.
#[derive(Clone, Debug)]
pub struct RequestAuthenticator {
	tokens: Arc<TokenStore>,
}
impl RequestAuthenticator {
	/// Creates an authenticator over the shared token store.
	pub fn new(tokens: Arc<TokenStore>) -> Self {
		Self { tokens }
	}

	/// Signs `request` with the token currently held, returning the token that was attached.
	pub fn authenticate(&self, request: &mut HttpRequest) -> Option<AccessToken> {
		let token = self.tokens.get();

		if apply_bearer(request, token.as_ref()) { token } else { None }
	}
}

/// Sets `Authorization: Bearer <token>` and a JSON content type when `token` is present.
///
/// Returns `false` and leaves the request untouched when no token is held or the token cannot be
/// carried in a header.
pub fn apply_bearer(request: &mut HttpRequest, token: Option<&AccessToken>) -> bool {
	let Some(token) = token.filter(|token| token.is_header_safe()) else {
		return false;
	};
	let Ok(mut value) = HeaderValue::try_from(format!("Bearer {}", token.expose())) else {
		return false;
	};

	value.set_sensitive(true);

	let headers = request.headers_mut();

	headers.insert(AUTHORIZATION, value);
	headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

	true
}
