use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::SyncProgress;

/// Topics of the in-process event bus. This set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    RequestSync,
    ProgressUpdate,
    ReloadView,
    StoreInitialized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum AppEvent {
    RequestSync,
    ProgressUpdate { progress: SyncProgress },
    ReloadView,
    StoreInitialized,
}

impl AppEvent {
    pub fn topic(&self) -> Topic {
        match self {
            AppEvent::RequestSync => Topic::RequestSync,
            AppEvent::ProgressUpdate { .. } => Topic::ProgressUpdate,
            AppEvent::ReloadView => Topic::ReloadView,
            AppEvent::StoreInitialized => Topic::StoreInitialized,
        }
    }

    pub fn progress(percent: u8) -> Self {
        AppEvent::ProgressUpdate {
            progress: SyncProgress::new(percent),
        }
    }
}

/// Output of a completed survey presentation, as handed back by the survey host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: Vec<StepResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub identifier: String,
    #[serde(default)]
    pub results: Vec<QuestionResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Answer {
    Scale { value: f64 },
    Numeric { value: f64 },
    Boolean { value: bool },
    Text { value: String },
    RangeOfMotion { start: f64, finish: f64, range: f64 },
}

impl TaskResult {
    pub fn step(&self, identifier: &str) -> Option<&StepResult> {
        self.results.iter().find(|step| step.identifier == identifier)
    }
}

impl StepResult {
    pub fn question(&self, identifier: &str) -> Option<&QuestionResult> {
        self.results
            .iter()
            .find(|question| question.identifier == identifier)
    }
}
