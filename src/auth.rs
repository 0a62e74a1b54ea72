//! Identity models: scope sets, client info, ID tokens, and accounts.

pub mod account;
pub mod client_info;
pub mod id_token;
pub mod scope;

pub use account::*;
pub use client_info::*;
pub use id_token::*;
pub use scope::*;
