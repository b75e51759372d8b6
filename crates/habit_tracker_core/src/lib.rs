pub mod attendance;
pub mod auth;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

pub use attendance::{
    days_since, is_same_calendar_day, record_completion, Completion, CompletionOutcome,
    DaysSinceLabel, GapPolicy, HabitPatch, StreakChange,
};
pub use auth::{validate_sign_up, MIN_PASSWORD_LEN};
pub use domain::{
    normalize_email, require_session, AuthSession, CachedCredentials, Habit, HabitName, NewHabit, NewHabitInput,
    Session, User, UserCredentials,
};
pub use error::{HabitError, HabitResult, ValidationError};
pub use ports::{
    AuthSessionStore, CredentialCache, HabitStore, IdentityProvider, PortError, PortResult,
};
pub use service::{HabitService, HabitSummary, MarkDone};
