//! crates/habit_tracker_core/src/attendance.rs
//!
//! The habit attendance model: decides whether a "mark done" changes a habit,
//! what the new streak is, and how long ago the habit was last performed.
//!
//! Calendar-day comparisons happen in a single fixed offset supplied by the
//! caller. Instants are never normalized beyond that, so a user who changes
//! timezone may see a day boundary move.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;

use crate::domain::Habit;

//=========================================================================================
// Calendar helpers
//=========================================================================================

fn local_date(instant: DateTime<Utc>, zone: FixedOffset) -> NaiveDate {
    instant.with_timezone(&zone).date_naive()
}

/// True iff year, month and day-of-month of both instants match in `zone`.
pub fn is_same_calendar_day(a: DateTime<Utc>, b: DateTime<Utc>, zone: FixedOffset) -> bool {
    local_date(a, zone) == local_date(b, zone)
}

/// Number of calendar-day boundaries crossed going from `from` to `to` in `zone`.
pub fn calendar_days_between(from: DateTime<Utc>, to: DateTime<Utc>, zone: FixedOffset) -> i64 {
    (local_date(to, zone) - local_date(from, zone)).num_days()
}

/// Whole days elapsed since `last_performed`, rounded down.
///
/// Returns 0 when `now` is earlier than `last_performed` (clock skew between devices).
pub fn days_since(last_performed: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let days = (now - last_performed).num_days().max(0);
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// Display text for how long ago a habit was performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaysSinceLabel {
    Today,
    Yesterday,
    DaysAgo(u32),
}

impl DaysSinceLabel {
    pub fn from_days(days: u32) -> Self {
        match days {
            0 => DaysSinceLabel::Today,
            1 => DaysSinceLabel::Yesterday,
            n => DaysSinceLabel::DaysAgo(n),
        }
    }
}

impl fmt::Display for DaysSinceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaysSinceLabel::Today => f.write_str("Today"),
            DaysSinceLabel::Yesterday => f.write_str("Yesterday"),
            DaysSinceLabel::DaysAgo(n) => write!(f, "{} days ago", n),
        }
    }
}

//=========================================================================================
// Gap policy
//=========================================================================================

/// What a completion does to the streak after one or more missed days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GapPolicy {
    /// Every completion on a new calendar day adds one, however long the gap.
    #[default]
    Unconditional,
    /// A gap of more than `missed_days_allowed` skipped days restarts the streak at 1.
    ResetAfterAllowedMisses,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown gap policy '{0}'")]
pub struct UnknownGapPolicy(String);

impl FromStr for GapPolicy {
    type Err = UnknownGapPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unconditional" => Ok(GapPolicy::Unconditional),
            "reset_after_allowed_misses" => Ok(GapPolicy::ResetAfterAllowedMisses),
            other => Err(UnknownGapPolicy(other.to_string())),
        }
    }
}

//=========================================================================================
// Completions and partial updates
//=========================================================================================

/// How a completion changes the stored streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// Atomic add, performed by the store.
    Increment(u32),
    /// Overwrite with a fixed value.
    Reset(u32),
}

impl StreakChange {
    pub fn apply(self, streak: u32) -> u32 {
        match self {
            StreakChange::Increment(n) => streak.saturating_add(n),
            StreakChange::Reset(n) => n,
        }
    }
}

/// A partial update to a stored habit. Fields left as `None` are untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HabitPatch {
    pub streak: Option<StreakChange>,
    pub last_performed: Option<DateTime<Utc>>,
    /// Compare-and-swap guard: only write if the stored `last_performed` equals this.
    pub expect_last_performed: Option<DateTime<Utc>>,
}

impl HabitPatch {
    pub fn is_empty(&self) -> bool {
        self.streak.is_none() && self.last_performed.is_none()
    }

    /// Applies the field changes to an in-memory habit. Does not check the guard.
    pub fn apply_to(&self, habit: &mut Habit) {
        if let Some(change) = self.streak {
            habit.streak = change.apply(habit.streak);
        }
        if let Some(at) = self.last_performed {
            habit.last_performed = at;
        }
    }
}

/// The decision taken for one "mark done" action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Already performed on this calendar day; nothing changes.
    AlreadyDoneToday,
    Advance {
        change: StreakChange,
        last_performed: DateTime<Utc>,
    },
}

/// The user-facing result of a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Incremented,
    Restarted,
    AlreadyDoneToday,
}

impl Completion {
    pub fn outcome(&self) -> CompletionOutcome {
        match self {
            Completion::AlreadyDoneToday => CompletionOutcome::AlreadyDoneToday,
            Completion::Advance {
                change: StreakChange::Increment(_),
                ..
            } => CompletionOutcome::Incremented,
            Completion::Advance {
                change: StreakChange::Reset(_),
                ..
            } => CompletionOutcome::Restarted,
        }
    }

    /// The store write for this completion, guarded on the `last_performed` value the
    /// decision was based on. `None` when nothing needs writing.
    pub fn patch(&self, read_last_performed: DateTime<Utc>) -> Option<HabitPatch> {
        match *self {
            Completion::AlreadyDoneToday => None,
            Completion::Advance {
                change,
                last_performed,
            } => Some(HabitPatch {
                streak: Some(change),
                last_performed: Some(last_performed),
                expect_last_performed: Some(read_last_performed),
            }),
        }
    }

    pub fn apply(&self, habit: &mut Habit) {
        if let Completion::Advance {
            change,
            last_performed,
        } = *self
        {
            habit.streak = change.apply(habit.streak);
            habit.last_performed = last_performed;
        }
    }
}

/// Decides what marking `habit` done at `now` does.
///
/// Same calendar day as `last_performed` is a no-op. Otherwise the streak advances
/// according to `policy` and `last_performed` moves to `now`.
pub fn record_completion(
    habit: &Habit,
    now: DateTime<Utc>,
    zone: FixedOffset,
    policy: GapPolicy,
) -> Completion {
    if is_same_calendar_day(habit.last_performed, now, zone) {
        return Completion::AlreadyDoneToday;
    }

    let change = match policy {
        GapPolicy::Unconditional => StreakChange::Increment(1),
        GapPolicy::ResetAfterAllowedMisses => {
            let missed = calendar_days_between(habit.last_performed, now, zone) - 1;
            if missed > i64::from(habit.missed_days_allowed) {
                StreakChange::Reset(1)
            } else {
                StreakChange::Increment(1)
            }
        }
    };

    Completion::Advance {
        change,
        last_performed: now,
    }
}
