//! crates/habit_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete habit store, identity provider and credential
//! cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::attendance::HabitPatch;
use crate::domain::{CachedCredentials, Habit, NewHabit};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    /// A conditional update's precondition no longer holds.
    #[error("Conflicting update: {0}")]
    Conflict(String),
    /// A stored record does not match the habit schema.
    #[error("Could not decode record: {0}")]
    Decode(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A per-user keyed collection of habit records.
#[async_trait]
pub trait HabitStore: Send + Sync {
    /// Adds a habit under the user's collection and returns its id.
    async fn create_habit(
        &self,
        user_id: Uuid,
        habit: NewHabit,
        created_at: DateTime<Utc>,
    ) -> PortResult<Uuid>;

    async fn get_habit(&self, user_id: Uuid, habit_id: Uuid) -> PortResult<Habit>;

    /// All of the user's habits, in whatever order the store keeps them.
    async fn list_habits(&self, user_id: Uuid) -> PortResult<Vec<Habit>>;

    /// Merges `patch` into the stored habit.
    ///
    /// Streak increments are applied as an atomic add on the store's side. When the
    /// patch carries `expect_last_performed` and the stored value differs, nothing
    /// is written and `PortError::Conflict` is returned.
    async fn update_habit(&self, user_id: Uuid, habit_id: Uuid, patch: HabitPatch)
        -> PortResult<()>;
}

/// Authenticates email/password pairs and yields opaque user ids.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Fails with `PortError::Unauthorized` on bad credentials.
    async fn sign_in(&self, email: &str, password: &str) -> PortResult<Uuid>;

    /// Registers a new account and creates its empty user record.
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<Uuid>;
}

/// Server-side login sessions behind the `session` cookie.
#[async_trait]
pub trait AuthSessionStore: Send + Sync {
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user, or `PortError::Unauthorized` if missing or expired.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

/// Local storage for the last successful credentials.
#[async_trait]
pub trait CredentialCache: Send + Sync {
    async fn save(&self, credentials: &CachedCredentials) -> PortResult<()>;
    async fn load(&self) -> PortResult<Option<CachedCredentials>>;
    async fn clear(&self) -> PortResult<()>;
}
