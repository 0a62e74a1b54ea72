//! Write journal that restores the store when a multi-step build fails.

// self
use crate::{_prelude::*, storage::CacheStorage};

/// [`CacheStorage`] decorator remembering the prior value of every key it touches.
///
/// Only the first write to a key is journaled, so [`rollback`](Self::rollback) restores the
/// state observed when the journal was created.
pub struct CacheJournal {
	inner: Arc<dyn CacheStorage>,
	entries: Mutex<Vec<(String, Option<String>)>>,
}
impl CacheJournal {
	/// Starts journaling writes made through the returned value.
	pub fn new(inner: Arc<dyn CacheStorage>) -> Self {
		Self { inner, entries: Mutex::new(Vec::new()) }
	}

	/// Number of distinct keys written so far.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns true when nothing has been written.
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	/// Restores every touched key to its prior value, newest first.
	pub fn rollback(&self) {
		let entries = std::mem::take(&mut *self.entries.lock());

		for (key, previous) in entries.into_iter().rev() {
			match previous {
				Some(value) => self.inner.set_item(&key, &value),
				None => self.inner.remove_item(&key),
			}
		}
	}

	/// Keeps all writes and stops journaling.
	pub fn commit(&self) {
		self.entries.lock().clear();
	}

	fn record(&self, key: &str) {
		let mut entries = self.entries.lock();

		if !entries.iter().any(|(k, _)| k == key) {
			entries.push((key.to_owned(), self.inner.get_item(key)));
		}
	}
}
impl CacheStorage for CacheJournal {
	fn get_item(&self, key: &str) -> Option<String> {
		self.inner.get_item(key)
	}

	fn set_item(&self, key: &str, value: &str) {
		self.record(key);
		self.inner.set_item(key, value);
	}

	fn remove_item(&self, key: &str) {
		self.record(key);
		self.inner.remove_item(key);
	}

	fn contains_key(&self, key: &str) -> bool {
		self.inner.contains_key(key)
	}

	fn get_keys(&self) -> Vec<String> {
		self.inner.get_keys()
	}

	fn clear(&self) {
		for key in self.inner.get_keys() {
			self.remove_item(&key);
		}
	}
}
impl Debug for CacheJournal {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CacheJournal").field("entries", &self.len()).finish()
	}
}
