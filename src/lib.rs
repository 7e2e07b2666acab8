//! Client library for the reelstream API.
//!
//! This crate owns the authenticated side of talking to a reelstream
//! backend: issuing requests with a bearer access token attached,
//! persisting the credential pair and user profile across restarts, and
//! transparently recovering from access-token expiry with a one-shot
//! refresh-and-retry.
//!
//! UI concerns (rendering, routing, redirecting to a sign-in screen on
//! [`ApiError::SessionExpired`]) belong to the consumer.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{Session, SessionStore};
pub use config::Config;
pub use models::{TokenPair, UserProfile};
