//! Thread-safe in-memory [`CacheStorage`] implementation for hosts without browser storage and
//! for tests.

// self
use crate::{_prelude::*, storage::CacheStorage};

type StorageMap = Arc<RwLock<BTreeMap<String, String>>>;

/// Storage backend that keeps entries in-process, ordered by key.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(StorageMap);
impl MemoryStorage {
	/// Number of stored entries.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Copies the current contents.
	pub fn snapshot(&self) -> BTreeMap<String, String> {
		self.0.read().clone()
	}
}
impl CacheStorage for MemoryStorage {
	fn get_item(&self, key: &str) -> Option<String> {
		self.0.read().get(key).cloned()
	}

	fn set_item(&self, key: &str, value: &str) {
		self.0.write().insert(key.to_owned(), value.to_owned());
	}

	fn remove_item(&self, key: &str) {
		self.0.write().remove(key);
	}

	fn contains_key(&self, key: &str) -> bool {
		self.0.read().contains_key(key)
	}

	fn get_keys(&self) -> Vec<String> {
		self.0.read().keys().cloned().collect()
	}

	fn clear(&self) {
		self.0.write().clear();
	}
}
