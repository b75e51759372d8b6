//! crates/habit_tracker_core/src/error.rs
//!
//! Errors raised by the habit service, above the port layer.

use uuid::Uuid;

use crate::ports::PortError;

/// Input that cannot become a habit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Habit name must not be empty")]
    EmptyName,
    #[error("Email is required")]
    EmptyEmail,
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
}

/// The error type for every `HabitService` operation.
#[derive(Debug, thiserror::Error)]
pub enum HabitError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("No authenticated session")]
    Unauthenticated,

    #[error("Habit {0} not found")]
    NotFound(Uuid),

    /// Another writer changed the habit between our read and our write.
    #[error("Habit {0} was modified concurrently")]
    Conflict(Uuid),

    #[error("Habit store error: {0}")]
    Store(#[from] PortError),
}

pub type HabitResult<T> = Result<T, HabitError>;
