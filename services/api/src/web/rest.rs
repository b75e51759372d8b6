//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the habit endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    auth,
    protocol::{CreateHabitRequest, HabitView, MarkDoneResponse, OutcomeView},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use habit_tracker_core::{HabitError, Session};
use std::sync::Arc;
use tracing::error;
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        list_habits_handler,
        create_habit_handler,
        get_habit_handler,
        mark_done_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            CreateHabitRequest,
            HabitView,
            OutcomeView,
            MarkDoneResponse
        )
    ),
    tags(
        (name = "Habit Tracker API", description = "Create habits and mark them done to build streaks.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a failed habit operation onto a status and a user-facing message.
/// `action` names what failed, e.g. "create habit".
fn habit_error_response(err: HabitError, action: &str) -> (StatusCode, String) {
    match err {
        HabitError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        HabitError::Unauthenticated => {
            (StatusCode::UNAUTHORIZED, "Please sign in and try again".to_string())
        }
        HabitError::NotFound(_) => (StatusCode::NOT_FOUND, "Habit not found".to_string()),
        HabitError::Conflict(_) => (
            StatusCode::CONFLICT,
            "Habit was updated from another device, please retry".to_string(),
        ),
        HabitError::Store(e) => {
            error!("Habit store failure during {}: {:?}", action, e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Could not {}", action))
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the caller's habits.
#[utoipa::path(
    get,
    path = "/habits",
    responses(
        (status = 200, description = "All habits owned by the caller", body = [HabitView]),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_habits_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let now = Utc::now();
    let habits = state
        .habits
        .list_habits(&session)
        .await
        .map_err(|e| habit_error_response(e, "load habits"))?;

    let views: Vec<HabitView> = habits
        .iter()
        .map(|h| HabitView::new(h, state.habits.describe(h, now)))
        .collect();
    Ok(Json(views))
}

/// Create a habit with a zero streak, last performed now.
#[utoipa::path(
    post,
    path = "/habits",
    request_body = CreateHabitRequest,
    responses(
        (status = 201, description = "Habit created", body = HabitView),
        (status = 400, description = "Habit name is empty"),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_habit_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateHabitRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let now = Utc::now();
    let habit = state
        .habits
        .create_habit(&session, req.into(), now)
        .await
        .map_err(|e| habit_error_response(e, "create habit"))?;

    let view = HabitView::new(&habit, state.habits.describe(&habit, now));
    Ok((StatusCode::CREATED, Json(view)))
}

/// Fetch one of the caller's habits.
#[utoipa::path(
    get,
    path = "/habits/{habit_id}",
    params(("habit_id" = Uuid, Path, description = "The habit to fetch.")),
    responses(
        (status = 200, description = "The habit", body = HabitView),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No such habit for this user"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_habit_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(habit_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let habit = state
        .habits
        .get_habit(&session, habit_id)
        .await
        .map_err(|e| habit_error_response(e, "load habit"))?;

    Ok(Json(HabitView::new(&habit, state.habits.describe(&habit, Utc::now()))))
}

/// Mark a habit done for today.
///
/// A second call on the same calendar day leaves the streak unchanged and reports
/// `already_done_today`.
#[utoipa::path(
    post,
    path = "/habits/{habit_id}/done",
    params(("habit_id" = Uuid, Path, description = "The habit to mark done.")),
    responses(
        (status = 200, description = "Completion recorded or already done today", body = MarkDoneResponse),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No such habit for this user"),
        (status = 409, description = "Concurrent update from another device"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mark_done_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(habit_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let now = Utc::now();
    let done = state
        .habits
        .mark_done(&session, habit_id, now)
        .await
        .map_err(|e| habit_error_response(e, "mark habit done"))?;

    Ok(Json(MarkDoneResponse {
        outcome: done.outcome.into(),
        habit: HabitView::new(&done.habit, state.habits.describe(&done.habit, now)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::state::test_state;
    use axum::body::to_bytes;
    use axum::response::Response;
    use habit_tracker_core::PortError;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(name: &str) -> CreateHabitRequest {
        CreateHabitRequest {
            name: name.to_string(),
            missed_days_allowed: 2,
            notes: Some("evenings".to_string()),
        }
    }

    #[tokio::test]
    async fn created_habit_is_listed_and_fetchable() {
        let (state, _) = test_state();
        let session = Session::new(Uuid::new_v4());

        let created = create_habit_handler(
            State(state.clone()),
            Extension(session),
            Json(request("Stretch")),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(created.status(), StatusCode::CREATED);
        let created = body_json(created).await;
        assert_eq!(created["name"], "Stretch");
        assert_eq!(created["streak"], 0);
        assert_eq!(created["done_today"], true);
        assert_eq!(created["last_performed_label"], "Today");

        let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();
        let fetched = get_habit_handler(State(state.clone()), Extension(session), Path(id))
            .await
            .unwrap()
            .into_response();
        assert_eq!(body_json(fetched).await["missed_days_allowed"], 2);

        let listed = list_habits_handler(State(state), Extension(session))
            .await
            .unwrap()
            .into_response();
        let listed = body_json(listed).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn whitespace_name_is_a_bad_request() {
        let (state, _) = test_state();
        let err = create_habit_handler(
            State(state),
            Extension(Session::new(Uuid::new_v4())),
            Json(request("   ")),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn marking_a_fresh_habit_done_is_a_same_day_noop() {
        let (state, _) = test_state();
        let session = Session::new(Uuid::new_v4());
        let habit = state
            .habits
            .create_habit(&session, request("Read").into(), Utc::now())
            .await
            .unwrap();

        let response = mark_done_handler(State(state), Extension(session), Path(habit.id))
            .await
            .unwrap()
            .into_response();
        let body = body_json(response).await;

        assert_eq!(body["outcome"], "already_done_today");
        assert_eq!(body["habit"]["streak"], 0);
    }

    #[tokio::test]
    async fn marking_yesterdays_habit_done_increments() {
        let (state, _) = test_state();
        let session = Session::new(Uuid::new_v4());
        let habit = state
            .habits
            .create_habit(
                &session,
                request("Read").into(),
                Utc::now() - chrono::Duration::days(2),
            )
            .await
            .unwrap();

        let response = mark_done_handler(State(state), Extension(session), Path(habit.id))
            .await
            .unwrap()
            .into_response();
        let body = body_json(response).await;

        assert_eq!(body["outcome"], "incremented");
        assert_eq!(body["habit"]["streak"], 1);
        assert_eq!(body["habit"]["done_today"], true);
    }

    #[tokio::test]
    async fn another_users_habit_is_not_found() {
        let (state, _) = test_state();
        let owner = Session::new(Uuid::new_v4());
        let habit = state
            .habits
            .create_habit(&owner, request("Read").into(), Utc::now())
            .await
            .unwrap();

        let err = get_habit_handler(
            State(state),
            Extension(Session::new(Uuid::new_v4())),
            Path(habit.id),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn store_outage_is_a_generic_server_error() {
        let (state, store) = test_state();
        store.set_unavailable(true);

        let err = create_habit_handler(
            State(state),
            Extension(Session::new(Uuid::new_v4())),
            Json(request("Read")),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.1, "Could not create habit");
    }

    #[test]
    fn conflicts_map_to_409() {
        let (status, _) = habit_error_response(HabitError::Conflict(Uuid::new_v4()), "mark habit done");
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = habit_error_response(
            HabitError::Store(PortError::Decode("bad row".to_string())),
            "load habits",
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn openapi_document_lists_habit_routes() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("/habits/{habit_id}/done"));
        assert!(json.contains("/auth/login"));
    }
}
