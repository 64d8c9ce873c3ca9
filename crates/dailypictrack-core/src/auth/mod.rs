//! Authentication module for the session credential.
//!
//! This module provides:
//! - `TokenStore`: the single shared bearer credential, with in-memory,
//!   file, and OS keychain backends
//! - `SessionInspector`: decodes the stored token's claims and judges
//!   whether the session is still live

pub mod keychain;
pub mod session;
pub mod store;

pub use keychain::KeyringTokenStore;
pub use session::{decode_claims, Identity, SessionInspector, SessionState};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
