//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use habit_tracker_core::{AuthSessionStore, HabitService, IdentityProvider};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub habits: HabitService,
    pub identity: Arc<dyn IdentityProvider>,
    pub auth_sessions: Arc<dyn AuthSessionStore>,
    pub config: Arc<Config>,
}

#[cfg(test)]
pub(crate) fn test_state() -> (
    Arc<AppState>,
    Arc<habit_tracker_core::memory::InMemoryHabitStore>,
) {
    use habit_tracker_core::memory::{
        InMemoryAuthSessionStore, InMemoryHabitStore, InMemoryIdentityProvider,
    };

    let config = Config::from_source(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/habits_test".to_string()),
        _ => None,
    })
    .expect("test config is valid");
    let store = Arc::new(InMemoryHabitStore::new());
    let state = AppState {
        habits: HabitService::new(store.clone()),
        identity: Arc::new(InMemoryIdentityProvider::new()),
        auth_sessions: Arc::new(InMemoryAuthSessionStore::new()),
        config: Arc::new(config),
    };
    (Arc::new(state), store)
}
