//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use habit_tracker_core::{normalize_email, validate_sign_up, PortError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{middleware::session_cookie_value, state::AppState};

const SESSION_DAYS: i64 = 30;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Creates a server-side auth session and returns the `Set-Cookie` value for it.
async fn start_auth_session(
    state: &AppState,
    user_id: Uuid,
) -> Result<String, (StatusCode, String)> {
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_DAYS);

    state
        .auth_sessions
        .create_auth_session(&auth_session_id, user_id, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
        })?;

    Ok(format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        auth_session_id,
        Duration::days(SESSION_DAYS).num_seconds()
    ))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let email = validate_sign_up(&req.email, &req.password)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let user_id = state
        .identity
        .sign_up(&email, &req.password)
        .await
        .map_err(|e| match e {
            PortError::AlreadyExists(_) => {
                (StatusCode::CONFLICT, "Email already registered".to_string())
            }
            other => {
                error!("Failed to create user: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user".to_string())
            }
        })?;

    let cookie = start_auth_session(&state, user_id).await?;
    info!("User {} signed up", user_id);

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse { user_id, email }),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let email = normalize_email(&req.email);
    let user_id = state
        .identity
        .sign_in(&email, &req.password)
        .await
        .map_err(|e| match e {
            PortError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string())
            }
            other => {
                error!("Failed to sign in: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
            }
        })?;

    let cookie = start_auth_session(&state, user_id).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse { user_id, email }),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let auth_session_id = session_cookie_value(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .auth_sessions
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
        })?;

    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::state::test_state;
    use axum::http::HeaderValue;
    use axum::response::Response;

    fn signup(email: &str, password: &str) -> Json<SignupRequest> {
        Json(SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    fn login(email: &str, password: &str) -> Json<LoginRequest> {
        Json(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    fn session_id(response: &Response) -> String {
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        cookie
            .split(';')
            .next()
            .and_then(|c| c.strip_prefix("session="))
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn signup_sets_a_valid_session_cookie() {
        let (state, _) = test_state();

        let response = signup_handler(State(state.clone()), signup("me@example.com", "secret1"))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        let id = session_id(&response);
        assert!(state.auth_sessions.validate_auth_session(&id).await.is_ok());
    }

    #[tokio::test]
    async fn signup_rejects_short_password_and_duplicates() {
        let (state, _) = test_state();

        let err = signup_handler(State(state.clone()), signup("me@example.com", "abc"))
            .await
            .err()
            .unwrap();
        assert_eq!(
            err,
            (StatusCode::BAD_REQUEST, "Password must be at least 6 characters".to_string())
        );

        let err = signup_handler(State(state.clone()), signup("  ", "secret1"))
            .await
            .err()
            .unwrap();
        assert_eq!(err, (StatusCode::BAD_REQUEST, "Email is required".to_string()));

        signup_handler(State(state.clone()), signup("me@example.com", "secret1"))
            .await
            .unwrap();
        let err = signup_handler(State(state), signup("me@example.com", "secret1"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_checks_the_password() {
        let (state, _) = test_state();
        signup_handler(State(state.clone()), signup("me@example.com", "secret1"))
            .await
            .unwrap();

        let err = login_handler(State(state.clone()), login("me@example.com", "wrong!!"))
            .await
            .err()
            .unwrap();
        assert_eq!(err, (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string()));

        let response = login_handler(State(state), login("me@example.com", "secret1"))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    async fn body_email(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        json["email"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn auth_responses_carry_the_stored_email() {
        let (state, _) = test_state();

        let response = signup_handler(State(state.clone()), signup(" Me@Example.com ", "secret1"))
            .await
            .unwrap()
            .into_response();
        assert_eq!(body_email(response).await, "me@example.com");

        let response = login_handler(State(state), login("ME@example.COM", "secret1"))
            .await
            .unwrap()
            .into_response();
        assert_eq!(body_email(response).await, "me@example.com");
    }

    #[tokio::test]
    async fn logout_invalidates_the_session() {
        let (state, _) = test_state();
        let response = signup_handler(State(state.clone()), signup("me@example.com", "secret1"))
            .await
            .unwrap()
            .into_response();
        let id = session_id(&response);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("session={}", id)).unwrap(),
        );
        logout_handler(State(state.clone()), headers).await.unwrap();

        assert!(state.auth_sessions.validate_auth_session(&id).await.is_err());
    }

    #[tokio::test]
    async fn logout_without_cookie_is_unauthorized() {
        let (state, _) = test_state();
        let err = logout_handler(State(state), HeaderMap::new())
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }
}
