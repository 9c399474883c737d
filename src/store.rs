//! Process-wide access-token cell and the durable mirrors that back it across restarts.

pub mod file;
pub mod memory;

pub use file::FileMirror;
pub use memory::MemoryMirror;

// self
use crate::{_prelude::*, auth::AccessToken, obs};

/// Boxed future returned by [`TokenMirror`] operations.
pub type MirrorFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable key/value storage holding the mirrored access token.
pub trait TokenMirror
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`, if present.
	fn load<'a>(&'a self, key: &'a str) -> MirrorFuture<'a, Option<String>>;

	/// Persists or replaces the value stored under `key`.
	fn save<'a>(&'a self, key: &'a str, value: &'a str) -> MirrorFuture<'a, ()>;

	/// Removes the value stored under `key`; removing a missing key succeeds.
	fn remove<'a>(&'a self, key: &'a str) -> MirrorFuture<'a, ()>;
}

/// Error type produced by [`TokenMirror`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Holder of the current access token, mirrored to a [`TokenMirror`].
///
/// Reads are served from memory. Writes update memory first and then the mirror, so a mirror
/// failure leaves the process authenticated while the durable copy lags behind; the mirror is
/// authoritative again on the next [`TokenStore::open`].
pub struct TokenStore {
	current: RwLock<Option<AccessToken>>,
	mirror: Arc<dyn TokenMirror>,
	key: String,
}
impl TokenStore {
	/// Opens the store and seeds the in-memory token from the mirror.
	pub async fn open(mirror: Arc<dyn TokenMirror>, key: impl Into<String>) -> Result<Self, StoreError> {
		let key = key.into();
		let seeded =
			mirror.load(&key).await?.filter(|value| !value.is_empty()).map(AccessToken::new);

		Ok(Self { current: RwLock::new(seeded), mirror, key })
	}

	/// Returns the current token, if any.
	pub fn get(&self) -> Option<AccessToken> {
		self.current.read().clone()
	}

	/// Returns `true` when a token is held.
	pub fn is_authenticated(&self) -> bool {
		self.current.read().is_some()
	}

	/// Replaces the current token and mirrors it to durable storage.
	pub async fn set(&self, token: AccessToken) -> Result<(), StoreError> {
		let value = token.expose().to_owned();

		*self.current.write() = Some(token);

		self.mirror.save(&self.key, &value).await.inspect_err(obs::record_mirror_failure)
	}

	/// Drops the current token and removes its durable copy.
	pub async fn clear(&self) -> Result<(), StoreError> {
		self.current.write().take();

		self.mirror.remove(&self.key).await.inspect_err(obs::record_mirror_failure)
	}

	/// Storage key the token is mirrored under.
	pub fn storage_key(&self) -> &str {
		&self.key
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore")
			.field("key", &self.key)
			.field("authenticated", &self.is_authenticated())
			.finish()
	}
}
