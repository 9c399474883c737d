//! Validated client configuration: where the API lives, where the session is refreshed, and
//! where the user is sent when it cannot be.

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, error::ConfigError};

/// Immutable client configuration consumed by [`ConsoleClient`](crate::client::ConsoleClient).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Absolute base URL every API path is resolved under.
	pub base_url: Url,
	/// Path of the refresh exchange endpoint.
	pub refresh_path: String,
	/// Client-side route of the login screen.
	pub login_route: String,
	/// Durable storage key the access token is mirrored under.
	pub storage_key: String,
	/// JSON field of the refresh response carrying the new token.
	pub token_field: String,
	/// Per-request transport timeout; timeouts surface as transport errors.
	pub timeout: Option<StdDuration>,
}
impl ClientConfig {
	/// Default refresh exchange path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh";
	/// Default login route.
	pub const DEFAULT_LOGIN_ROUTE: &'static str = "/login";
	/// Default storage key.
	pub const DEFAULT_STORAGE_KEY: &'static str = "access_token";
	/// Default refresh response field.
	pub const DEFAULT_TOKEN_FIELD: &'static str = "token";

	/// Creates a builder rooted at `base_url`.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves an API path (e.g. `/users/7`) under the base URL's path.
	///
	/// A base of `https://host/api/` and a path of `/users` yield `https://host/api/users`.
	/// Percent-escapes already present in `path` are kept as they are.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		if self.base_url.cannot_be_a_base() {
			return Err(ConfigError::InvalidBaseUrl { url: self.base_url.to_string() });
		}

		let mut url = self.base_url.clone();
		let joined =
			format!("{}/{}", self.base_url.path().trim_end_matches('/'), path.trim_start_matches('/'));

		url.set_path(&joined);

		Ok(url)
	}

	/// Absolute URL of the refresh exchange endpoint.
	pub fn refresh_endpoint(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.refresh_path)
	}

	/// Validates invariants for the config.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") || self.base_url.cannot_be_a_base() {
			return Err(ConfigError::InvalidBaseUrl { url: self.base_url.to_string() });
		}

		validate_route("refresh path", &self.refresh_path)?;
		validate_route("login route", &self.login_route)?;
		validate_non_empty("storage key", &self.storage_key)?;
		validate_non_empty("token field", &self.token_field)?;

		Ok(())
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	base_url: Url,
	refresh_path: String,
	login_route: String,
	storage_key: String,
	token_field: String,
	timeout: Option<StdDuration>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_path: ClientConfig::DEFAULT_REFRESH_PATH.into(),
			login_route: ClientConfig::DEFAULT_LOGIN_ROUTE.into(),
			storage_key: ClientConfig::DEFAULT_STORAGE_KEY.into(),
			token_field: ClientConfig::DEFAULT_TOKEN_FIELD.into(),
			timeout: None,
		}
	}

	/// Parses `base_url` and creates a builder.
	pub fn parse(base_url: &str) -> Result<Self, ConfigError> {
		let url = Url::parse(base_url).map_err(|source| ConfigError::InvalidUrl { source })?;

		Ok(Self::new(url))
	}

	/// Overrides the refresh exchange path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the login route.
	pub fn login_route(mut self, route: impl Into<String>) -> Self {
		self.login_route = route.into();

		self
	}

	/// Overrides the durable storage key.
	pub fn storage_key(mut self, key: impl Into<String>) -> Self {
		self.storage_key = key.into();

		self
	}

	/// Overrides the refresh response token field.
	pub fn token_field(mut self, field: impl Into<String>) -> Self {
		self.token_field = field.into();

		self
	}

	/// Sets a per-request transport timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let config = ClientConfig {
			base_url: self.base_url,
			refresh_path: self.refresh_path,
			login_route: self.login_route,
			storage_key: self.storage_key,
			token_field: self.token_field,
			timeout: self.timeout,
		};

		config.validate()?;

		Ok(config)
	}
}

fn validate_route(field: &'static str, value: &str) -> Result<(), ConfigError> {
	if value.starts_with('/') {
		Ok(())
	} else {
		Err(ConfigError::InvalidRoute { field, value: value.to_owned() })
	}
}

fn validate_non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
	if value.trim().is_empty() { Err(ConfigError::EmptySetting { field }) } else { Ok(()) }
}
