//! File-backed [`TokenMirror`] so a console host keeps its session across restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{MirrorFuture, StoreError, TokenMirror},
};

/// Stored value plus the instant it was written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorEntry {
	/// Mirrored value.
	pub value: String,
	/// Write instant.
	#[serde(with = "time::serde::rfc3339")]
	pub written_at: OffsetDateTime,
}

/// Persists mirrored values to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileMirror {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<String, MirrorEntry>>>,
}
impl FileMirror {
	/// Opens (or creates) a mirror at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Returns the stored entry, including its write instant.
	pub fn entry(&self, key: &str) -> Option<MirrorEntry> {
		self.inner.read().get(key).cloned()
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<String, MirrorEntry>, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create mirror directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &HashMap<String, MirrorEntry>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize mirror snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenMirror for FileMirror {
	fn load<'a>(&'a self, key: &'a str) -> MirrorFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.inner.read().get(key).map(|entry| entry.value.clone())) })
	}

	fn save<'a>(&'a self, key: &'a str, value: &'a str) -> MirrorFuture<'a, ()> {
		Box::pin(async move {
			let entry =
				MirrorEntry { value: value.to_owned(), written_at: OffsetDateTime::now_utc() };
			let mut guard = self.inner.write();

			guard.insert(key.to_owned(), entry);
			self.persist_locked(&guard)
		})
	}

	fn remove<'a>(&'a self, key: &'a str) -> MirrorFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if guard.remove(key).is_some() {
				self.persist_locked(&guard)?;
			}

			Ok(())
		})
	}
}
