//! crates/habit_tracker_core/src/auth.rs
//!
//! Sign-in flows that keep the local credential cache in step with the identity
//! provider, and silent re-authentication at startup.

use tracing::{info, warn};

use crate::domain::{normalize_email, CachedCredentials, Session};
use crate::error::{HabitResult, ValidationError};
use crate::ports::{CredentialCache, IdentityProvider, PortResult};

/// Shortest password accepted at signup.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Account rules every signup path enforces before reaching the identity provider.
/// Returns the normalized email to register.
pub fn validate_sign_up(email: &str, password: &str) -> Result<String, ValidationError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ValidationError::EmptyEmail);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(email)
}

async fn remember(cache: &dyn CredentialCache, email: &str, password: &str) {
    let credentials = CachedCredentials {
        email: email.to_string(),
        password: password.to_string(),
    };
    if let Err(e) = cache.save(&credentials).await {
        warn!("Could not cache credentials: {:?}", e);
    }
}

/// Signs in and, on success, caches the credentials for the next start.
pub async fn sign_in_and_remember(
    identity: &dyn IdentityProvider,
    cache: &dyn CredentialCache,
    email: &str,
    password: &str,
) -> PortResult<Session> {
    let user_id = identity.sign_in(email, password).await?;
    remember(cache, email, password).await;
    Ok(Session::new(user_id))
}

/// Validates, registers a new account and caches its credentials.
pub async fn sign_up_and_remember(
    identity: &dyn IdentityProvider,
    cache: &dyn CredentialCache,
    email: &str,
    password: &str,
) -> HabitResult<Session> {
    let email = validate_sign_up(email, password)?;
    let user_id = identity.sign_up(&email, password).await?;
    remember(cache, &email, password).await;
    Ok(Session::new(user_id))
}

/// Attempts a silent sign-in with cached credentials.
///
/// Any failure is logged and yields `None`, so the caller falls through to
/// asking for credentials.
pub async fn restore_session(
    identity: &dyn IdentityProvider,
    cache: &dyn CredentialCache,
) -> Option<Session> {
    let credentials = match cache.load().await {
        Ok(Some(credentials)) => credentials,
        Ok(None) => return None,
        Err(e) => {
            warn!("Could not read cached credentials: {:?}", e);
            return None;
        }
    };

    match identity.sign_in(&credentials.email, &credentials.password).await {
        Ok(user_id) => {
            info!("Restored session for {}", credentials.email);
            Some(Session::new(user_id))
        }
        Err(e) => {
            warn!("Silent sign-in for {} failed: {:?}", credentials.email, e);
            None
        }
    }
}

/// Drops cached credentials.
pub async fn forget(cache: &dyn CredentialCache) -> PortResult<()> {
    cache.clear().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryCredentialCache, InMemoryIdentityProvider};
    use crate::error::HabitError;
    use crate::ports::PortError;

    #[tokio::test]
    async fn sign_up_caches_credentials_for_silent_sign_in() {
        let identity = InMemoryIdentityProvider::new();
        let cache = InMemoryCredentialCache::new();

        let session = sign_up_and_remember(&identity, &cache, "a@b.c", "secret1")
            .await
            .unwrap();
        let restored = restore_session(&identity, &cache).await;

        assert_eq!(restored, Some(session));
    }

    #[tokio::test]
    async fn failed_sign_in_does_not_touch_the_cache() {
        let identity = InMemoryIdentityProvider::new();
        let cache = InMemoryCredentialCache::new();
        identity.sign_up("a@b.c", "secret1").await.unwrap();

        let err = sign_in_and_remember(&identity, &cache, "a@b.c", "wrong")
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::Unauthorized));
        assert!(cache.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_cached_credentials_fall_through() {
        let identity = InMemoryIdentityProvider::new();
        let cache = InMemoryCredentialCache::new();
        cache
            .save(&CachedCredentials {
                email: "gone@b.c".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(restore_session(&identity, &cache).await, None);
    }

    #[tokio::test]
    async fn forget_clears_the_cache() {
        let identity = InMemoryIdentityProvider::new();
        let cache = InMemoryCredentialCache::new();
        sign_up_and_remember(&identity, &cache, "a@b.c", "secret1")
            .await
            .unwrap();

        forget(&cache).await.unwrap();
        assert_eq!(restore_session(&identity, &cache).await, None);
    }

    #[tokio::test]
    async fn sign_up_enforces_account_rules_before_the_provider() {
        let identity = InMemoryIdentityProvider::new();
        let cache = InMemoryCredentialCache::new();

        let err = sign_up_and_remember(&identity, &cache, "   ", "secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, HabitError::Validation(ValidationError::EmptyEmail)));

        let err = sign_up_and_remember(&identity, &cache, "a@b.c", "a")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HabitError::Validation(ValidationError::PasswordTooShort { min: MIN_PASSWORD_LEN })
        ));

        assert!(cache.load().await.unwrap().is_none());
        assert!(matches!(
            identity.sign_in("a@b.c", "a").await,
            Err(PortError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn sign_up_registers_the_normalized_email() {
        let identity = InMemoryIdentityProvider::new();
        let cache = InMemoryCredentialCache::new();

        let session = sign_up_and_remember(&identity, &cache, " Me@Example.COM ", "secret1")
            .await
            .unwrap();

        assert_eq!(
            identity.sign_in("me@example.com", "secret1").await.unwrap(),
            session.user_id
        );
        assert_eq!(cache.load().await.unwrap().unwrap().email, "me@example.com");
    }
}
