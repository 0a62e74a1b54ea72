//! Cache key model and the helpers that read and write request, account, and token
//! entries through a [`CacheStorage`](crate::storage::CacheStorage).
//!
//! Three families share one store:
//!
//! - temporary entries scoped to one authorization request and suffixed with its state,
//! - access-token entries keyed by a JSON [`AccessTokenKey`],
//! - persistent single-slot entries such as the last ID token or error.

pub mod helpers;
pub mod journal;
pub mod keys;

pub use helpers::*;
pub use journal::*;
pub use keys::*;

/// Prefix applied to every key written by browser storage adapters.
pub const CACHE_PREFIX: &str = "msal";
/// Separator between a temporary key and the id it is scoped to.
pub const RESOURCE_DELIM: &str = "|";
/// Placeholder account id used when the account has no home account identifier.
pub const NO_ACCOUNT: &str = "NO_ACCOUNT";
/// Value of [`TemporaryCacheKey::InteractionStatus`] while a popup is open.
pub const INTERACTION_IN_PROGRESS: &str = "interaction_in_progress";
