//! Turning completed survey results into outcome values.
//!
//! Every extracted value is tagged with the identifier of the field it came
//! from, so later aggregation can tell answers apart.

use serde::{Deserialize, Serialize};
use shared::{
    domain::OutcomeValue,
    error::{MalformedReason, MalformedSurveyResult},
    protocol::{Answer, TaskResult},
};

pub const CHECK_IN_IDENTIFIER: &str = "checkin";
pub const CHECK_IN_FORM_IDENTIFIER: &str = "checkin.form";
pub const CHECK_IN_PAIN_ITEM_IDENTIFIER: &str = "checkin.form.pain";
pub const CHECK_IN_SLEEP_ITEM_IDENTIFIER: &str = "checkin.form.sleep";
pub const RANGE_OF_MOTION_IDENTIFIER: &str = "rangeOfMotionTask";
pub const RANGE_OF_MOTION_KIND: &str = "range";
pub const ONBOARDING_IDENTIFIER: &str = "onboarding";
pub const ONBOARDING_COMPLETED_KIND: &str = "onboarding.completed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyKind {
    Onboarding,
    CheckIn,
    RangeOfMotion,
}

impl SurveyKind {
    pub fn identifier(self) -> &'static str {
        match self {
            SurveyKind::Onboarding => ONBOARDING_IDENTIFIER,
            SurveyKind::CheckIn => CHECK_IN_IDENTIFIER,
            SurveyKind::RangeOfMotion => RANGE_OF_MOTION_IDENTIFIER,
        }
    }

    pub fn extract(self, result: &TaskResult) -> Result<Vec<OutcomeValue>, MalformedSurveyResult> {
        match self {
            SurveyKind::Onboarding => extract_onboarding(result),
            SurveyKind::CheckIn => extract_check_in(result),
            SurveyKind::RangeOfMotion => extract_range_of_motion(result),
        }
    }
}

fn malformed(kind: SurveyKind, reason: MalformedReason) -> MalformedSurveyResult {
    MalformedSurveyResult::new(kind.identifier(), reason)
}

fn extract_onboarding(result: &TaskResult) -> Result<Vec<OutcomeValue>, MalformedSurveyResult> {
    let completed_at = result.end_date.ok_or_else(|| {
        malformed(
            SurveyKind::Onboarding,
            MalformedReason::MissingAnswer("end_date".into()),
        )
    })?;
    Ok(vec![OutcomeValue::new(
        ONBOARDING_COMPLETED_KIND,
        completed_at.timestamp() as f64,
    )])
}

fn extract_check_in(result: &TaskResult) -> Result<Vec<OutcomeValue>, MalformedSurveyResult> {
    let form = result.step(CHECK_IN_FORM_IDENTIFIER).ok_or_else(|| {
        malformed(
            SurveyKind::CheckIn,
            MalformedReason::MissingStep(CHECK_IN_FORM_IDENTIFIER.into()),
        )
    })?;

    [CHECK_IN_PAIN_ITEM_IDENTIFIER, CHECK_IN_SLEEP_ITEM_IDENTIFIER]
        .into_iter()
        .map(|item| {
            match form.question(item).and_then(|question| question.answer.as_ref()) {
                Some(Answer::Scale { value }) => Ok(OutcomeValue::new(item, *value)),
                None => Err(malformed(
                    SurveyKind::CheckIn,
                    MalformedReason::MissingAnswer(item.into()),
                )),
                Some(_) => Err(malformed(
                    SurveyKind::CheckIn,
                    MalformedReason::UnexpectedAnswer(item.into()),
                )),
            }
        })
        .collect()
}

fn extract_range_of_motion(
    result: &TaskResult,
) -> Result<Vec<OutcomeValue>, MalformedSurveyResult> {
    result
        .results
        .iter()
        .flat_map(|step| &step.results)
        .find_map(|question| match question.answer {
            Some(Answer::RangeOfMotion { range, .. }) => Some(range),
            _ => None,
        })
        .map(|range| vec![OutcomeValue::new(RANGE_OF_MOTION_KIND, range)])
        .ok_or_else(|| {
            malformed(
                SurveyKind::RangeOfMotion,
                MalformedReason::MissingAnswer(RANGE_OF_MOTION_KIND.into()),
            )
        })
}

#[cfg(test)]
#[path = "tests/surveys_tests.rs"]
mod tests;
