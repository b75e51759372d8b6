//! crates/habit_tracker_core/src/service.rs
//!
//! Habit operations bound to a `HabitStore`. Every operation takes the caller's
//! `Session` explicitly and only touches that user's habits.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::attendance::{
    days_since, is_same_calendar_day, record_completion, CompletionOutcome, DaysSinceLabel,
    GapPolicy,
};
use crate::domain::{Habit, NewHabit, NewHabitInput, Session};
use crate::error::{HabitError, HabitResult};
use crate::ports::{HabitStore, PortError};

/// Display facts about a habit at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HabitSummary {
    pub done_today: bool,
    pub days_since: u32,
    pub label: DaysSinceLabel,
}

/// The result of a "mark done" action.
#[derive(Debug, Clone)]
pub struct MarkDone {
    /// The habit as it stands after the action.
    pub habit: Habit,
    pub outcome: CompletionOutcome,
}

#[derive(Clone)]
pub struct HabitService {
    store: Arc<dyn HabitStore>,
    zone: FixedOffset,
    gap_policy: GapPolicy,
}

impl HabitService {
    /// A service comparing calendar days in UTC with the unconditional gap policy.
    pub fn new(store: Arc<dyn HabitStore>) -> Self {
        Self {
            store,
            zone: Utc.fix(),
            gap_policy: GapPolicy::default(),
        }
    }

    pub fn with_calendar_zone(mut self, zone: FixedOffset) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_gap_policy(mut self, gap_policy: GapPolicy) -> Self {
        self.gap_policy = gap_policy;
        self
    }

    /// Validates the form input and stores a new habit created at `now`.
    pub async fn create_habit(
        &self,
        session: &Session,
        input: NewHabitInput,
        now: DateTime<Utc>,
    ) -> HabitResult<Habit> {
        let new_habit = NewHabit::validate(input)?;
        let habit_id = self
            .store
            .create_habit(session.user_id, new_habit, now)
            .await
            .map_err(|e| {
                error!("Failed to create habit for user {}: {:?}", session.user_id, e);
                e
            })?;
        info!("Created habit {} for user {}", habit_id, session.user_id);
        // The store may round timestamps, so hand back what it actually holds.
        self.get_habit(session, habit_id).await
    }

    pub async fn list_habits(&self, session: &Session) -> HabitResult<Vec<Habit>> {
        self.store.list_habits(session.user_id).await.map_err(|e| {
            error!("Failed to list habits for user {}: {:?}", session.user_id, e);
            e.into()
        })
    }

    pub async fn get_habit(&self, session: &Session, habit_id: Uuid) -> HabitResult<Habit> {
        self.store
            .get_habit(session.user_id, habit_id)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => HabitError::NotFound(habit_id),
                other => {
                    error!("Failed to fetch habit {}: {:?}", habit_id, other);
                    other.into()
                }
            })
    }

    /// Records a completion of the habit at `now`.
    ///
    /// The write is guarded on the `last_performed` value that was read. If another
    /// device completed the habit in between, the habit is re-read: a completion for
    /// the same day turns this call into a no-op, anything else is a conflict.
    pub async fn mark_done(
        &self,
        session: &Session,
        habit_id: Uuid,
        now: DateTime<Utc>,
    ) -> HabitResult<MarkDone> {
        let mut habit = self.get_habit(session, habit_id).await?;
        let completion = record_completion(&habit, now, self.zone, self.gap_policy);

        let Some(patch) = completion.patch(habit.last_performed) else {
            info!("Habit {} already done today", habit_id);
            return Ok(MarkDone {
                habit,
                outcome: CompletionOutcome::AlreadyDoneToday,
            });
        };

        match self.store.update_habit(session.user_id, habit_id, patch).await {
            Ok(()) => {
                completion.apply(&mut habit);
                info!("Habit {} marked done, streak now {}", habit_id, habit.streak);
                Ok(MarkDone {
                    habit,
                    outcome: completion.outcome(),
                })
            }
            Err(PortError::Conflict(reason)) => {
                warn!("Concurrent completion of habit {}: {}", habit_id, reason);
                let fresh = self.get_habit(session, habit_id).await?;
                if is_same_calendar_day(fresh.last_performed, now, self.zone) {
                    Ok(MarkDone {
                        habit: fresh,
                        outcome: CompletionOutcome::AlreadyDoneToday,
                    })
                } else {
                    Err(HabitError::Conflict(habit_id))
                }
            }
            Err(PortError::NotFound(_)) => Err(HabitError::NotFound(habit_id)),
            Err(e) => {
                error!("Failed to mark habit {} done: {:?}", habit_id, e);
                Err(e.into())
            }
        }
    }

    pub fn describe(&self, habit: &Habit, now: DateTime<Utc>) -> HabitSummary {
        let days = days_since(habit.last_performed, now);
        HabitSummary {
            done_today: is_same_calendar_day(habit.last_performed, now, self.zone),
            days_since: days,
            label: DaysSinceLabel::from_days(days),
        }
    }
}
