use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(OutcomeId);

/// Opaque key of a care task. Unique within a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl PartialEq<str> for TaskId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TaskId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Identifiers of the tasks the companion knows how to render.
pub mod task_ids {
    pub const DOXYLAMINE: &str = "doxylamine";
    pub const NAUSEA: &str = "nausea";
    pub const STRETCH: &str = "stretch";
    pub const KEGELS: &str = "kegels";
    pub const STEPS: &str = "steps";
    pub const EXERCISE: &str = "exercise";
    pub const FASTING: &str = "fasting";
    pub const ONBOARDING: &str = "onboarding";
    pub const CHECK_IN: &str = "checkIn";
    pub const RANGE_OF_MOTION_CHECK: &str = "rangeOfMotionCheck";
    pub const MEAL_LINKS: &str = "mealLinks";
    pub const VITAMINS: &str = "vitamins";
    pub const WATER: &str = "water";
    pub const WORKOUT_LINKS: &str = "workoutLinks";

    /// Display order of the care feed and the insights tab.
    pub const ORDERED: [&str; 12] = [
        VITAMINS,
        WATER,
        STEPS,
        MEAL_LINKS,
        WORKOUT_LINKS,
        FASTING,
        CHECK_IN,
        RANGE_OF_MOTION_CHECK,
        DOXYLAMINE,
        KEGELS,
        STRETCH,
        NAUSEA,
    ];
}

/// Sync progress percentage, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncProgress(u8);

impl SyncProgress {
    pub const IDLE: SyncProgress = SyncProgress(0);
    pub const COMPLETE: SyncProgress = SyncProgress(100);

    /// Clamps to 100.
    pub fn new(percent: u8) -> Self {
        Self(percent.min(100))
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

impl fmt::Display for SyncProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One normalized answer of a completed task, tagged with its source field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeValue {
    pub kind: String,
    pub value: f64,
}

impl OutcomeValue {
    pub fn new(kind: impl Into<String>, value: f64) -> Self {
        Self {
            kind: kind.into(),
            value,
        }
    }
}

/// Daily recurrence of a task starting at `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub start: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    pub interval_days: u32,
    pub occurrences_per_day: u32,
}

impl Schedule {
    pub fn daily(start: NaiveDate) -> Self {
        Self {
            start,
            end: None,
            interval_days: 1,
            occurrences_per_day: 1,
        }
    }

    /// Number of events this schedule produces on `date`.
    pub fn occurrences_on(&self, date: NaiveDate) -> u32 {
        if date < self.start || self.end.is_some_and(|end| date > end) {
            return 0;
        }
        let interval = i64::from(self.interval_days.max(1));
        if (date - self.start).num_days() % interval != 0 {
            return 0;
        }
        self.occurrences_per_day
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub schedule: Schedule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub id: OutcomeId,
    pub task_id: TaskId,
    pub date: NaiveDate,
    pub occurrence: u32,
    pub values: Vec<OutcomeValue>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOutcome {
    pub task_id: TaskId,
    pub date: NaiveDate,
    pub occurrence: u32,
    pub values: Vec<OutcomeValue>,
}

/// A scheduled occurrence of a task, with its outcome if one was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub task_id: TaskId,
    pub date: NaiveDate,
    pub occurrence: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OutcomeRecord>,
}

impl EventRecord {
    /// First recorded value tagged `kind`, or 0 when there is none.
    pub fn answer(&self, kind: &str) -> f64 {
        self.outcome
            .as_ref()
            .and_then(|outcome| outcome.values.iter().find(|v| v.kind == kind))
            .map_or(0.0, |v| v.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_ids: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

impl OutcomeQuery {
    pub fn for_task(task_id: impl Into<TaskId>) -> Self {
        Self {
            task_ids: vec![task_id.into()],
            ..Self::default()
        }
    }
}
