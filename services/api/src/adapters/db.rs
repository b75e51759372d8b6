//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! `HabitStore`, `IdentityProvider` and `AuthSessionStore` ports from the core crate.
//! It handles all interactions with the PostgreSQL database using `sqlx`.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use habit_tracker_core::{
    normalize_email, AuthSession, AuthSessionStore, Habit, HabitName, HabitPatch, HabitStore,
    IdentityProvider, NewHabit, PortError, PortResult, StreakChange, User, UserCredentials,
};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the persistence and identity ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) RETURNING user_id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::AlreadyExists(format!("An account for {} already exists", email))
            }
            other => PortError::Unexpected(other.to_string()),
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(record.to_domain())
    }

    async fn habit_exists(&self, user_id: Uuid, habit_id: Uuid) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM habits WHERE user_id = $1 AND id = $2)",
        )
        .bind(user_id)
        .bind(habit_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

/// Builds the `UPDATE` for a non-empty patch. Streak increments are added inside the
/// database so concurrent increments commute; the guard, when present, limits the write
/// to rows whose `last_performed` is unchanged.
fn habit_update_query(
    user_id: Uuid,
    habit_id: Uuid,
    patch: &HabitPatch,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new("UPDATE habits SET ");
    {
        let mut assignments = query.separated(", ");
        match patch.streak {
            Some(StreakChange::Increment(n)) => {
                assignments.push("streak = streak + ");
                assignments.push_bind_unseparated(i64::from(n));
            }
            Some(StreakChange::Reset(n)) => {
                assignments.push("streak = ");
                assignments.push_bind_unseparated(i64::from(n));
            }
            None => {}
        }
        if let Some(at) = patch.last_performed {
            assignments.push("last_performed = ");
            assignments.push_bind_unseparated(at);
        }
    }
    query.push(" WHERE user_id = ");
    query.push_bind(user_id);
    query.push(" AND id = ");
    query.push_bind(habit_id);
    if let Some(expected) = patch.expect_last_performed {
        query.push(" AND last_performed = ");
        query.push_bind(expected);
    }
    query
}

/// Explains an `UPDATE` that touched no rows: either the guard failed or the habit is gone.
fn unmatched_update_error(habit_id: Uuid, habit_exists: bool) -> PortError {
    if habit_exists {
        PortError::Conflict(format!("habit {} changed since it was read", habit_id))
    } else {
        PortError::NotFound(format!("Habit {} not found", habit_id))
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct AuthSessionRecord {
    id: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}
impl AuthSessionRecord {
    fn to_domain(self) -> AuthSession {
        AuthSession {
            id: self.id,
            user_id: self.user_id,
            expires_at: self.expires_at,
        }
    }
}

#[derive(FromRow)]
struct HabitRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    streak: i64,
    missed_days_allowed: i64,
    num_days_record: i64,
    notes: String,
    last_performed: DateTime<Utc>,
}
impl HabitRecord {
    /// Decodes a stored row, rejecting values outside the habit schema.
    fn try_into_domain(self) -> PortResult<Habit> {
        let id = self.id;
        let counter = |field: &str, value: i64| {
            u32::try_from(value).map_err(|_| {
                PortError::Decode(format!("habit {}: {} = {} is out of range", id, field, value))
            })
        };
        Ok(Habit {
            id,
            user_id: self.user_id,
            name: HabitName::parse(&self.name)
                .map_err(|e| PortError::Decode(format!("habit {}: {}", id, e)))?,
            streak: counter("streak", self.streak)?,
            missed_days_allowed: counter("missed_days_allowed", self.missed_days_allowed)?,
            num_days_record: counter("num_days_record", self.num_days_record)?,
            notes: self.notes,
            last_performed: self.last_performed,
        })
    }
}

const HABIT_COLUMNS: &str =
    "id, user_id, name, streak, missed_days_allowed, num_days_record, notes, last_performed";

//=========================================================================================
// `HabitStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl HabitStore for DbAdapter {
    async fn create_habit(
        &self,
        user_id: Uuid,
        habit: NewHabit,
        created_at: DateTime<Utc>,
    ) -> PortResult<Uuid> {
        let habit_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO habits (id, user_id, name, streak, missed_days_allowed, num_days_record, notes, last_performed) \
             VALUES ($1, $2, $3, 0, $4, 0, $5, $6) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(habit.name.as_str())
        .bind(i64::from(habit.missed_days_allowed))
        .bind(&habit.notes)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(habit_id)
    }

    async fn get_habit(&self, user_id: Uuid, habit_id: Uuid) -> PortResult<Habit> {
        let record = sqlx::query_as::<_, HabitRecord>(&format!(
            "SELECT {} FROM habits WHERE user_id = $1 AND id = $2",
            HABIT_COLUMNS
        ))
        .bind(user_id)
        .bind(habit_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Habit {} not found", habit_id)),
            _ => PortError::Unexpected(e.to_string()),
        })?;
        record.try_into_domain()
    }

    async fn list_habits(&self, user_id: Uuid) -> PortResult<Vec<Habit>> {
        let records = sqlx::query_as::<_, HabitRecord>(&format!(
            "SELECT {} FROM habits WHERE user_id = $1",
            HABIT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(HabitRecord::try_into_domain).collect()
    }

    async fn update_habit(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        patch: HabitPatch,
    ) -> PortResult<()> {
        if patch.is_empty() {
            return if self.habit_exists(user_id, habit_id).await? {
                Ok(())
            } else {
                Err(PortError::NotFound(format!("Habit {} not found", habit_id)))
            };
        }

        let result = habit_update_query(user_id, habit_id, &patch)
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            let exists = self.habit_exists(user_id, habit_id).await?;
            return Err(unmatched_update_error(habit_id, exists));
        }
        Ok(())
    }
}

//=========================================================================================
// `IdentityProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for DbAdapter {
    async fn sign_in(&self, email: &str, password: &str) -> PortResult<Uuid> {
        let credentials = match self.get_user_by_email(&normalize_email(email)).await {
            Ok(credentials) => credentials,
            Err(PortError::NotFound(_)) => return Err(PortError::Unauthorized),
            Err(e) => return Err(e),
        };

        let parsed_hash = PasswordHash::new(&credentials.hashed_password)
            .map_err(|e| PortError::Unexpected(format!("Failed to parse password hash: {}", e)))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| PortError::Unauthorized)?;

        Ok(credentials.user_id)
    }

    async fn sign_up(&self, email: &str, password: &str) -> PortResult<Uuid> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PortError::Unexpected(format!("Failed to hash password: {}", e)))?
            .to_string();

        let user = self
            .create_user_with_email(&normalize_email(email), &password_hash)
            .await?;
        info!("Registered user {} ({})", user.user_id, user.email);
        Ok(user.user_id)
    }
}

//=========================================================================================
// `AuthSessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthSessionStore for DbAdapter {
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT id, user_id, expires_at FROM auth_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .ok_or(PortError::Unauthorized)?;

        let session = record.to_domain();
        if session.expires_at <= Utc::now() {
            self.delete_auth_session(&session.id).await?;
            return Err(PortError::Unauthorized);
        }
        Ok(session.user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
