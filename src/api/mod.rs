//! HTTP client module for the reelstream API.
//!
//! This module provides the `ApiClient` for issuing authenticated requests
//! against the backend. The client attaches the session's bearer access
//! token to every request and runs a one-shot refresh-and-retry when the
//! backend rejects a token as expired.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
