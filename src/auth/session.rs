//! In-memory session backed by the durable store.
//!
//! The `Session` is an explicit object held by (or injected into) the API
//! client. Every write goes to the store first, then updates the in-memory
//! copy, so the store is the source of truth across restarts. Reads never
//! touch the filesystem or await.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use tracing::debug;

use crate::models::{TokenPair, UserProfile};

use super::store::{SessionStore, KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_USER};

#[derive(Debug, Default)]
struct SessionState {
    access: Option<String>,
    refresh: Option<String>,
    user: Option<UserProfile>,
}

/// Session state shared by all requests of one client.
#[derive(Debug)]
pub struct Session {
    store: SessionStore,
    state: RwLock<SessionState>,
}

impl Session {
    /// Open a session, loading whatever the store holds from a previous run.
    ///
    /// A stored profile that no longer parses is discarded rather than
    /// failing the open; the tokens decide authentication state, not the
    /// profile.
    pub fn open(store: SessionStore) -> Result<Self> {
        let access = store.read(KEY_ACCESS_TOKEN)?.filter(|t| !t.is_empty());
        let refresh = store.read(KEY_REFRESH_TOKEN)?.filter(|t| !t.is_empty());
        let user = match store.read(KEY_USER)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    debug!(error = %e, "Discarding unparseable stored profile");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            store,
            state: RwLock::new(SessionState {
                access,
                refresh,
                user,
            }),
        })
    }

    /// True iff a non-empty access token is present. No network call, no
    /// validation of token contents.
    pub fn is_authenticated(&self) -> bool {
        self.read_state().access.is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_state().access.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read_state().refresh.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read_state().user.clone()
    }

    /// Persist a freshly issued credential pair and profile. Called on
    /// successful login or registration.
    pub fn establish(&self, tokens: TokenPair, user: UserProfile) -> Result<()> {
        self.store.write(KEY_ACCESS_TOKEN, &tokens.access)?;
        self.store.write(KEY_REFRESH_TOKEN, &tokens.refresh)?;
        let serialized =
            serde_json::to_string(&user).context("Failed to serialize user profile")?;
        self.store.write(KEY_USER, &serialized)?;

        let mut state = self.write_state();
        state.access = Some(tokens.access).filter(|t| !t.is_empty());
        state.refresh = Some(tokens.refresh).filter(|t| !t.is_empty());
        state.user = Some(user);
        Ok(())
    }

    /// Overwrite the access token after a successful refresh.
    pub fn set_access_token(&self, access: String) -> Result<()> {
        self.store.write(KEY_ACCESS_TOKEN, &access)?;
        self.write_state().access = Some(access).filter(|t| !t.is_empty());
        Ok(())
    }

    /// Overwrite the refresh token when the backend rotates it.
    pub fn set_refresh_token(&self, refresh: String) -> Result<()> {
        self.store.write(KEY_REFRESH_TOKEN, &refresh)?;
        self.write_state().refresh = Some(refresh).filter(|t| !t.is_empty());
        Ok(())
    }

    /// Overwrite the stored profile, e.g. after a profile update.
    pub fn set_user(&self, user: UserProfile) -> Result<()> {
        let serialized =
            serde_json::to_string(&user).context("Failed to serialize user profile")?;
        self.store.write(KEY_USER, &serialized)?;
        self.write_state().user = Some(user);
        Ok(())
    }

    /// Destroy the session: every storage key removed, in-memory copy reset.
    pub fn clear(&self) -> Result<()> {
        self.store.clear()?;
        *self.write_state() = SessionState::default();
        Ok(())
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
