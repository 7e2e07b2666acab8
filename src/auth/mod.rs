//! Session and credential storage.
//!
//! This module provides:
//! - `SessionStore`: durable per-key storage under a data directory
//! - `Session`: the in-memory session held by the API client, backed by
//!   the store
//!
//! The presence of a non-empty access token in the store is the sole
//! "authenticated" signal; no expiry timestamp is tracked client-side.

pub mod session;
pub mod store;

pub use session::Session;
pub use store::SessionStore;
