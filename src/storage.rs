//! Key-value storage capability and the built-in adapters.
//!
//! The client never assumes exclusive access to storage: other tabs may mutate the same
//! keys, so every read tolerates absence and every multi-step update is safe to retry.

pub mod browser;
pub mod memory;

pub use browser::*;
pub use memory::MemoryStorage;

/// Key-value contract consumed by the cache layer.
pub trait CacheStorage
where
	Self: Send + Sync,
{
	/// Returns the stored value, if any.
	fn get_item(&self, key: &str) -> Option<String>;

	/// Stores or replaces a value.
	fn set_item(&self, key: &str, value: &str);

	/// Removes a value; missing keys are ignored.
	fn remove_item(&self, key: &str);

	/// Returns true when a value is stored under `key`.
	fn contains_key(&self, key: &str) -> bool {
		self.get_item(key).is_some()
	}

	/// Lists every key visible through this storage.
	fn get_keys(&self) -> Vec<String>;

	/// Removes every key visible through this storage.
	fn clear(&self);
}
