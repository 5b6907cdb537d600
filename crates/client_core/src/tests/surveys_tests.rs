use super::*;
use chrono::{TimeZone, Utc};
use shared::protocol::{QuestionResult, StepResult};

fn question(identifier: &str, answer: Option<Answer>) -> QuestionResult {
    QuestionResult {
        identifier: identifier.into(),
        answer,
    }
}

fn check_in(pain: Option<Answer>, sleep: Option<Answer>) -> TaskResult {
    TaskResult {
        identifier: CHECK_IN_IDENTIFIER.into(),
        end_date: None,
        results: vec![StepResult {
            identifier: CHECK_IN_FORM_IDENTIFIER.into(),
            results: vec![
                question(CHECK_IN_PAIN_ITEM_IDENTIFIER, pain),
                question(CHECK_IN_SLEEP_ITEM_IDENTIFIER, sleep),
            ],
        }],
    }
}

#[test]
fn check_in_extracts_pain_and_sleep_tagged_by_field() {
    let result = check_in(
        Some(Answer::Scale { value: 3.0 }),
        Some(Answer::Scale { value: 7.0 }),
    );
    let values = SurveyKind::CheckIn.extract(&result).expect("extract");
    assert_eq!(
        values,
        vec![
            OutcomeValue::new(CHECK_IN_PAIN_ITEM_IDENTIFIER, 3.0),
            OutcomeValue::new(CHECK_IN_SLEEP_ITEM_IDENTIFIER, 7.0),
        ]
    );
}

#[test]
fn check_in_without_form_step_is_malformed() {
    let result = TaskResult {
        identifier: CHECK_IN_IDENTIFIER.into(),
        end_date: None,
        results: vec![StepResult {
            identifier: "instructions".into(),
            results: Vec::new(),
        }],
    };
    let err = SurveyKind::CheckIn.extract(&result).expect_err("malformed");
    assert_eq!(
        err.reason,
        MalformedReason::MissingStep(CHECK_IN_FORM_IDENTIFIER.into())
    );
}

#[test]
fn check_in_missing_answer_is_malformed() {
    let result = check_in(Some(Answer::Scale { value: 3.0 }), None);
    let err = SurveyKind::CheckIn.extract(&result).expect_err("malformed");
    assert_eq!(
        err.reason,
        MalformedReason::MissingAnswer(CHECK_IN_SLEEP_ITEM_IDENTIFIER.into())
    );
    assert_eq!(err.survey, CHECK_IN_IDENTIFIER);
}

#[test]
fn check_in_wrong_answer_shape_is_malformed() {
    let result = check_in(
        Some(Answer::Text {
            value: "a lot".into(),
        }),
        Some(Answer::Scale { value: 7.0 }),
    );
    let err = SurveyKind::CheckIn.extract(&result).expect_err("malformed");
    assert_eq!(
        err.reason,
        MalformedReason::UnexpectedAnswer(CHECK_IN_PAIN_ITEM_IDENTIFIER.into())
    );
}

#[test]
fn range_of_motion_takes_first_motion_answer_across_steps() {
    let result = TaskResult {
        identifier: RANGE_OF_MOTION_IDENTIFIER.into(),
        end_date: None,
        results: vec![
            StepResult {
                identifier: "instruction".into(),
                results: vec![question("intro", Some(Answer::Boolean { value: true }))],
            },
            StepResult {
                identifier: "knee.left".into(),
                results: vec![question(
                    "knee.left.range",
                    Some(Answer::RangeOfMotion {
                        start: 10.0,
                        finish: 95.0,
                        range: 85.0,
                    }),
                )],
            },
        ],
    };
    assert_eq!(
        SurveyKind::RangeOfMotion.extract(&result).expect("extract"),
        vec![OutcomeValue::new(RANGE_OF_MOTION_KIND, 85.0)]
    );
}

#[test]
fn range_of_motion_without_motion_answer_is_malformed() {
    let result = TaskResult {
        identifier: RANGE_OF_MOTION_IDENTIFIER.into(),
        end_date: None,
        results: Vec::new(),
    };
    assert!(SurveyKind::RangeOfMotion.extract(&result).is_err());
}

#[test]
fn onboarding_records_completion_time() {
    let finished = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().expect("time");
    let result = TaskResult {
        identifier: ONBOARDING_IDENTIFIER.into(),
        end_date: Some(finished),
        results: Vec::new(),
    };
    assert_eq!(
        SurveyKind::Onboarding.extract(&result).expect("extract"),
        vec![OutcomeValue::new(
            ONBOARDING_COMPLETED_KIND,
            finished.timestamp() as f64
        )]
    );
}

#[test]
fn survey_result_deserializes_from_host_json() {
    let raw = r#"{
        "identifier": "checkin",
        "results": [{
            "identifier": "checkin.form",
            "results": [
                {"identifier": "checkin.form.pain", "answer": {"type": "scale", "value": 2}},
                {"identifier": "checkin.form.sleep", "answer": {"type": "scale", "value": 9}}
            ]
        }]
    }"#;
    let result: TaskResult = serde_json::from_str(raw).expect("json");
    let values = SurveyKind::CheckIn.extract(&result).expect("extract");
    assert_eq!(values[1].value, 9.0);
}
