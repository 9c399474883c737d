//! Immutable request descriptors, buffered responses, and the per-call retry marker.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use http::{
	HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
	header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	error::{ConfigError, DecodeError},
	http::{HttpRequest, HttpResponse},
};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one logical API call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);
impl RequestId {
	fn next() -> Self {
		Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
	}

	/// Returns the raw identifier.
	pub const fn get(self) -> u64 {
		self.0
	}
}
impl Display for RequestId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "req-{}", self.0)
	}
}

/// Verb, path, query, headers, and JSON body of one API call.
///
/// The descriptor never changes once handed to the client; replay state lives in [`Attempt`].
#[derive(Debug)]
pub struct ApiRequest {
	id: RequestId,
	method: Method,
	path: String,
	query: Vec<(String, String)>,
	headers: HeaderMap,
	body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request for `method` and an API path relative to the configured base URL.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			id: RequestId::next(),
			method,
			path: path.into(),
			query: Vec::new(),
			headers: HeaderMap::new(),
			body: None,
		}
	}

	/// `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Appends a query pair.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Adds a header, replacing any previous value for the same name.
	pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ConfigError> {
		let invalid = || ConfigError::InvalidHeader { name: name.to_owned() };
		let header_name = HeaderName::try_from(name).map_err(|_| invalid())?;
		let header_value = HeaderValue::try_from(value).map_err(|_| invalid())?;

		self.headers.insert(header_name, header_value);

		Ok(self)
	}

	/// Serializes `body` as the JSON payload.
	pub fn with_json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body).map_err(|source| ConfigError::BodyEncode { source })?;

		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		self.body = Some(bytes);

		Ok(self)
	}

	/// Identifier of this call.
	pub fn id(&self) -> RequestId {
		self.id
	}

	/// HTTP verb.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// API path relative to the base URL.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Encoded body, if any.
	pub fn body(&self) -> Option<&[u8]> {
		self.body.as_deref()
	}

	/// Builds a fresh wire request; called once per dispatch so a replay never reuses state.
	pub(crate) fn to_http(&self, config: &ClientConfig) -> Result<HttpRequest, ConfigError> {
		let mut url = config.endpoint(&self.path)?;

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(self.query.iter());
		}

		let mut request = http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.body(self.body.clone().unwrap_or_default())?;

		request.headers_mut().extend(self.headers.clone());

		Ok(request)
	}
}

/// Records whether a call has already been replayed after an authorization failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetriedMarker {
	/// Not replayed yet; an authorization failure may trigger recovery.
	#[default]
	Fresh,
	/// Already replayed once; a further authorization failure is final.
	Replayed,
}

/// One caller's progress through the recovery protocol for a single [`ApiRequest`].
#[derive(Debug)]
pub struct Attempt<'a> {
	request: &'a ApiRequest,
	marker: RetriedMarker,
}
impl<'a> Attempt<'a> {
	/// Starts a fresh attempt.
	pub fn new(request: &'a ApiRequest) -> Self {
		Self { request, marker: RetriedMarker::Fresh }
	}

	/// Underlying request descriptor.
	pub fn request(&self) -> &'a ApiRequest {
		self.request
	}

	/// Current retry marker.
	pub fn marker(&self) -> RetriedMarker {
		self.marker
	}

	pub(crate) fn mark_replayed(&mut self) {
		self.marker = RetriedMarker::Replayed;
	}
}

/// Successful (2xx) response with a buffered body.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	status: StatusCode,
	headers: HeaderMap,
	body: Vec<u8>,
}
impl ApiResponse {
	pub(crate) fn from_http(response: HttpResponse) -> Self {
		let (parts, body) = response.into_parts();

		Self { status: parts.status, headers: parts.headers, body }
	}

	/// Response status.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Raw body bytes.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Consumes the response and returns the body bytes.
	pub fn into_body(self) -> Vec<u8> {
		self.body
	}

	/// Body as UTF-8 text, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the JSON body, reporting the path of the first mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de).map_err(|e| Error::Decode(DecodeError::from(e)))
	}
}
