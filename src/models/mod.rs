//! Wire and domain types for the reelstream API.

pub mod tokens;
pub mod user;

pub use tokens::{AuthResponse, RefreshResponse, TokenPair};
pub use user::UserProfile;
