//! crates/habit_tracker_core/src/memory.rs
//!
//! In-process implementations of every port. They back the unit tests here and the
//! handler tests of the api service; passwords are compared in plain text, so they
//! are not meant for production use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::attendance::HabitPatch;
use crate::domain::{CachedCredentials, Habit, NewHabit};
use crate::ports::{
    AuthSessionStore, CredentialCache, HabitStore, IdentityProvider, PortError, PortResult,
};

fn lock<T>(mutex: &Mutex<T>) -> PortResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| PortError::Unexpected("in-memory store lock poisoned".to_string()))
}

//=========================================================================================
// Habits
//=========================================================================================

/// Habits per user, kept in insertion order.
#[derive(Default)]
pub struct InMemoryHabitStore {
    habits: Mutex<HashMap<Uuid, Vec<Habit>>>,
    unavailable: AtomicBool,
}

impl InMemoryHabitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails as if the backend were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> PortResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("habit store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl HabitStore for InMemoryHabitStore {
    async fn create_habit(
        &self,
        user_id: Uuid,
        habit: NewHabit,
        created_at: DateTime<Utc>,
    ) -> PortResult<Uuid> {
        self.check_available()?;
        let habit_id = Uuid::new_v4();
        lock(&self.habits)?
            .entry(user_id)
            .or_default()
            .push(habit.into_habit(habit_id, user_id, created_at));
        Ok(habit_id)
    }

    async fn get_habit(&self, user_id: Uuid, habit_id: Uuid) -> PortResult<Habit> {
        self.check_available()?;
        lock(&self.habits)?
            .get(&user_id)
            .and_then(|habits| habits.iter().find(|h| h.id == habit_id))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Habit {} not found", habit_id)))
    }

    async fn list_habits(&self, user_id: Uuid) -> PortResult<Vec<Habit>> {
        self.check_available()?;
        Ok(lock(&self.habits)?.get(&user_id).cloned().unwrap_or_default())
    }

    async fn update_habit(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        patch: HabitPatch,
    ) -> PortResult<()> {
        self.check_available()?;
        let mut habits = lock(&self.habits)?;
        let habit = habits
            .get_mut(&user_id)
            .and_then(|habits| habits.iter_mut().find(|h| h.id == habit_id))
            .ok_or_else(|| PortError::NotFound(format!("Habit {} not found", habit_id)))?;

        if let Some(expected) = patch.expect_last_performed {
            if habit.last_performed != expected {
                return Err(PortError::Conflict(format!(
                    "habit {} last performed at {}, expected {}",
                    habit_id, habit.last_performed, expected
                )));
            }
        }
        patch.apply_to(habit);
        Ok(())
    }
}

//=========================================================================================
// Identity and auth sessions
//=========================================================================================

#[derive(Default)]
pub struct InMemoryIdentityProvider {
    // email -> (password, user_id)
    accounts: Mutex<HashMap<String, (String, Uuid)>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> PortResult<Uuid> {
        match lock(&self.accounts)?.get(email) {
            Some((stored, user_id)) if stored == password => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> PortResult<Uuid> {
        let mut accounts = lock(&self.accounts)?;
        if accounts.contains_key(email) {
            return Err(PortError::AlreadyExists(email.to_string()));
        }
        let user_id = Uuid::new_v4();
        accounts.insert(email.to_string(), (password.to_string(), user_id));
        Ok(user_id)
    }
}

#[derive(Default)]
pub struct InMemoryAuthSessionStore {
    sessions: Mutex<HashMap<String, (Uuid, DateTime<Utc>)>>,
}

impl InMemoryAuthSessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthSessionStore for InMemoryAuthSessionStore {
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        lock(&self.sessions)?.insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match lock(&self.sessions)?.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        lock(&self.sessions)?.remove(session_id);
        Ok(())
    }
}

//=========================================================================================
// Credential cache
//=========================================================================================

#[derive(Default)]
pub struct InMemoryCredentialCache {
    slot: Mutex<Option<CachedCredentials>>,
}

impl InMemoryCredentialCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialCache for InMemoryCredentialCache {
    async fn save(&self, credentials: &CachedCredentials) -> PortResult<()> {
        *lock(&self.slot)? = Some(credentials.clone());
        Ok(())
    }

    async fn load(&self) -> PortResult<Option<CachedCredentials>> {
        Ok(lock(&self.slot)?.clone())
    }

    async fn clear(&self) -> PortResult<()> {
        *lock(&self.slot)? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::StreakChange;
    use crate::domain::HabitName;
    use chrono::Duration;

    fn new_habit(name: &str) -> NewHabit {
        NewHabit {
            name: HabitName::parse(name).unwrap(),
            missed_days_allowed: 0,
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn guarded_update_rejects_stale_expectation() {
        let store = InMemoryHabitStore::new();
        let user = Uuid::new_v4();
        let created = Utc::now();
        let id = store.create_habit(user, new_habit("Yoga"), created).await.unwrap();

        let stale = HabitPatch {
            streak: Some(StreakChange::Increment(1)),
            last_performed: Some(created + Duration::days(1)),
            expect_last_performed: Some(created - Duration::days(1)),
        };
        let err = store.update_habit(user, id, stale).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
        assert_eq!(store.get_habit(user, id).await.unwrap().streak, 0);
    }

    #[tokio::test]
    async fn unguarded_increments_accumulate() {
        let store = InMemoryHabitStore::new();
        let user = Uuid::new_v4();
        let id = store.create_habit(user, new_habit("Yoga"), Utc::now()).await.unwrap();

        for _ in 0..3 {
            let patch = HabitPatch {
                streak: Some(StreakChange::Increment(1)),
                ..Default::default()
            };
            store.update_habit(user, id, patch).await.unwrap();
        }
        assert_eq!(store.get_habit(user, id).await.unwrap().streak, 3);
    }

    #[tokio::test]
    async fn list_keeps_insertion_order() {
        let store = InMemoryHabitStore::new();
        let user = Uuid::new_v4();
        let first = store.create_habit(user, new_habit("A"), Utc::now()).await.unwrap();
        let second = store.create_habit(user, new_habit("B"), Utc::now()).await.unwrap();

        let ids: Vec<Uuid> = store
            .list_habits(user)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn identity_rejects_wrong_password_and_duplicate_email() {
        let identity = InMemoryIdentityProvider::new();
        let user = identity.sign_up("me@example.com", "pw").await.unwrap();

        assert_eq!(identity.sign_in("me@example.com", "pw").await.unwrap(), user);
        assert!(matches!(
            identity.sign_in("me@example.com", "nope").await,
            Err(PortError::Unauthorized)
        ));
        assert!(matches!(
            identity.sign_up("me@example.com", "pw").await,
            Err(PortError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn expired_auth_session_is_unauthorized() {
        let sessions = InMemoryAuthSessionStore::new();
        let user = Uuid::new_v4();
        sessions
            .create_auth_session("live", user, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        sessions
            .create_auth_session("dead", user, Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(sessions.validate_auth_session("live").await.unwrap(), user);
        assert!(sessions.validate_auth_session("dead").await.is_err());

        sessions.delete_auth_session("live").await.unwrap();
        assert!(sessions.validate_auth_session("live").await.is_err());
    }
}
