//! services/api/src/web/protocol.rs
//!
//! JSON payloads exchanged between clients and the habit endpoints.

use chrono::{DateTime, Utc};
use habit_tracker_core::{CompletionOutcome, Habit, HabitSummary, NewHabitInput};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Requests
//=========================================================================================

/// Form fields for a new habit.
#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateHabitRequest {
    /// Required; surrounding whitespace is ignored.
    pub name: String,
    #[serde(default)]
    pub missed_days_allowed: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<CreateHabitRequest> for NewHabitInput {
    fn from(req: CreateHabitRequest) -> Self {
        NewHabitInput {
            name: req.name,
            missed_days_allowed: req.missed_days_allowed,
            notes: req.notes,
        }
    }
}

//=========================================================================================
// Responses
//=========================================================================================

/// A habit together with its display facts at the time of the request.
#[derive(Serialize, Debug, ToSchema)]
pub struct HabitView {
    pub id: Uuid,
    pub name: String,
    pub streak: u32,
    pub missed_days_allowed: u32,
    pub num_days_record: u32,
    pub notes: String,
    pub last_performed: DateTime<Utc>,
    pub done_today: bool,
    pub days_since: u32,
    /// "Today", "Yesterday" or "N days ago".
    pub last_performed_label: String,
}

impl HabitView {
    pub fn new(habit: &Habit, summary: HabitSummary) -> Self {
        Self {
            id: habit.id,
            name: habit.name.to_string(),
            streak: habit.streak,
            missed_days_allowed: habit.missed_days_allowed,
            num_days_record: habit.num_days_record,
            notes: habit.notes.clone(),
            last_performed: habit.last_performed,
            done_today: summary.done_today,
            days_since: summary.days_since,
            last_performed_label: summary.label.to_string(),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeView {
    Incremented,
    Restarted,
    AlreadyDoneToday,
}

impl From<CompletionOutcome> for OutcomeView {
    fn from(outcome: CompletionOutcome) -> Self {
        match outcome {
            CompletionOutcome::Incremented => OutcomeView::Incremented,
            CompletionOutcome::Restarted => OutcomeView::Restarted,
            CompletionOutcome::AlreadyDoneToday => OutcomeView::AlreadyDoneToday,
        }
    }
}

/// The response to a "mark done" request.
#[derive(Serialize, Debug, ToSchema)]
pub struct MarkDoneResponse {
    pub outcome: OutcomeView,
    pub habit: HabitView,
}
