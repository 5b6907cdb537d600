use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::TaskId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("task {0} appears more than once in the catalog")]
    Duplicate(TaskId),
}

/// What was wrong with a survey result that could not be turned into outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "identifier", rename_all = "snake_case")]
pub enum MalformedReason {
    MissingStep(String),
    MissingAnswer(String),
    UnexpectedAnswer(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {survey} survey result: {reason:?}")]
pub struct MalformedSurveyResult {
    pub survey: String,
    pub reason: MalformedReason,
}

impl MalformedSurveyResult {
    pub fn new(survey: impl Into<String>, reason: MalformedReason) -> Self {
        Self {
            survey: survey.into(),
            reason,
        }
    }
}
