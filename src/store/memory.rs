//! Thread-safe in-memory [`TokenMirror`] for headless hosts and tests.

// self
use crate::{
	_prelude::*,
	store::{MirrorFuture, StoreError, TokenMirror},
};

type MirrorMap = Arc<RwLock<HashMap<String, String>>>;

/// Mirror that keeps values in-process; nothing survives a restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryMirror(MirrorMap);
impl MemoryMirror {
	/// Returns the number of stored keys.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn save_now(map: MirrorMap, key: String, value: String) -> Result<(), StoreError> {
		map.write().insert(key, value);

		Ok(())
	}
}
impl TokenMirror for MemoryMirror {
	fn load<'a>(&'a self, key: &'a str) -> MirrorFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(key).cloned()) })
	}

	fn save<'a>(&'a self, key: &'a str, value: &'a str) -> MirrorFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.to_owned();
		let value = value.to_owned();

		Box::pin(async move { Self::save_now(map, key, value) })
	}

	fn remove<'a>(&'a self, key: &'a str) -> MirrorFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().remove(key);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn save_replace_and_remove() {
		let mirror = MemoryMirror::default();

		mirror.save("access_token", "one").await.expect("First save should succeed.");
		mirror.save("access_token", "two").await.expect("Replacing save should succeed.");

		assert_eq!(mirror.len(), 1);
		assert_eq!(
			mirror.load("access_token").await.expect("Load should succeed."),
			Some("two".into())
		);

		mirror.remove("access_token").await.expect("Remove should succeed.");
		mirror.remove("access_token").await.expect("Removing a missing key should succeed.");

		assert!(mirror.is_empty());
	}
}
