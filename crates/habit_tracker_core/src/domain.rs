//! crates/habit_tracker_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{HabitError, ValidationError};

//=========================================================================================
// Habits
//=========================================================================================

/// A habit name, guaranteed non-empty after trimming surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitName(String);

impl HabitName {
    /// Trims `raw` and rejects the result if nothing is left.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HabitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single habit, owned by exactly one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Habit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: HabitName,
    pub streak: u32,
    pub missed_days_allowed: u32,
    /// Stored and displayed, never advanced by any operation.
    pub num_days_record: u32,
    pub notes: String,
    pub last_performed: DateTime<Utc>,
}

/// Raw, unvalidated input for creating a habit (form fields).
#[derive(Debug, Clone, Default)]
pub struct NewHabitInput {
    pub name: String,
    pub missed_days_allowed: u32,
    pub notes: Option<String>,
}

/// Validated fields for a habit that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHabit {
    pub name: HabitName,
    pub missed_days_allowed: u32,
    pub notes: String,
}

impl NewHabit {
    pub fn validate(input: NewHabitInput) -> Result<Self, ValidationError> {
        Ok(Self {
            name: HabitName::parse(&input.name)?,
            missed_days_allowed: input.missed_days_allowed,
            notes: input.notes.unwrap_or_default().trim().to_string(),
        })
    }

    /// The record a store should hold for this habit when created at `now`.
    pub fn into_habit(self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Habit {
        Habit {
            id,
            user_id,
            name: self.name,
            streak: 0,
            missed_days_allowed: self.missed_days_allowed,
            num_days_record: 0,
            notes: self.notes,
            last_performed: now,
        }
    }
}

//=========================================================================================
// Users and sessions
//=========================================================================================

/// The authenticated identity every habit operation is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
}

impl Session {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Turns an optional session into the one an operation needs, or fails.
pub fn require_session(session: Option<&Session>) -> Result<&Session, HabitError> {
    session.ok_or(HabitError::Unauthenticated)
}

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a server-side login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Canonical form of an account email: trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The email/password pair kept by a local credential cache for silent sign-in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCredentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for CachedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
