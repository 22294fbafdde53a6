//! Parsing and shape validation of model verdicts.
//!
//! A reply either matches the exact shape expected for its task or is
//! rejected. Nothing is defaulted or coerced.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::catalog::TaskDefinition;
use crate::model::{CheckVerdict, DrawingDetails, EvaluationResult, ResultDetails};
use crate::traits::extract_json_object;

/// Why a reply was rejected. Logged, never shown to the caller.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("reply is not a JSON object of the expected shape: {0}")]
    Json(#[from] serde_json::Error),

    #[error("taskId mismatch: expected {expected}, got {actual}")]
    TaskMismatch { expected: String, actual: String },

    #[error("score {score} is not an integer in [0, {max}]")]
    ScoreOutOfRange { score: f64, max: u32 },

    #[error("maxScore {actual} does not match catalog max {expected}")]
    MaxScoreMismatch { expected: u32, actual: u32 },

    #[error("confidence {0} is outside [0, 1]")]
    Confidence(f64),

    #[error("checks keys {actual:?} do not match expected {expected:?}")]
    Checks {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("unscorable drawing reported a non-zero score")]
    UnscorableWithScore,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrawingVerdict {
    task_id: String,
    unscorable: bool,
    score: f64,
    #[serde(default)]
    max_score: Option<u32>,
    confidence: f64,
    checks: BTreeMap<String, CheckVerdict>,
    overall_notes: String,
    #[serde(default)]
    detected_object: Option<String>,
    #[serde(default)]
    is_target_object: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AbstractionVerdict {
    task_id: String,
    score: f64,
    notes: String,
}

fn check_task(definition: &TaskDefinition, actual: &str) -> Result<(), ShapeError> {
    if actual.trim() != definition.id.as_str() {
        return Err(ShapeError::TaskMismatch {
            expected: definition.id.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

fn check_score(definition: &TaskDefinition, score: f64) -> Result<i64, ShapeError> {
    let max = definition.max_score;
    if score.fract() != 0.0 || score < 0.0 || score > f64::from(max) {
        return Err(ShapeError::ScoreOutOfRange { score, max });
    }
    Ok(score as i64)
}

/// Parse a drawing verdict for a visuospatial task.
pub fn parse_drawing(
    definition: &TaskDefinition,
    content: &str,
) -> Result<EvaluationResult, ShapeError> {
    let verdict: DrawingVerdict = serde_json::from_str(&extract_json_object(content))?;

    check_task(definition, &verdict.task_id)?;
    let score = check_score(definition, verdict.score)?;
    if let Some(actual) = verdict.max_score {
        if actual != definition.max_score {
            return Err(ShapeError::MaxScoreMismatch {
                expected: definition.max_score,
                actual,
            });
        }
    }
    if !(0.0..=1.0).contains(&verdict.confidence) {
        return Err(ShapeError::Confidence(verdict.confidence));
    }

    let mut expected: Vec<String> = definition.checks.iter().map(|c| c.to_string()).collect();
    expected.sort();
    let actual: Vec<String> = verdict.checks.keys().cloned().collect();
    if expected != actual {
        return Err(ShapeError::Checks { expected, actual });
    }
    if verdict.unscorable && score > 0 {
        return Err(ShapeError::UnscorableWithScore);
    }

    Ok(EvaluationResult::scored(
        definition.id,
        score,
        ResultDetails::Drawing(DrawingDetails {
            unscorable: verdict.unscorable,
            confidence: verdict.confidence,
            checks: verdict.checks,
            overall_notes: verdict.overall_notes,
            detected_object: verdict.detected_object,
            is_target_object: verdict.is_target_object,
        }),
    ))
}

/// Parse an abstraction verdict.
pub fn parse_abstraction(
    definition: &TaskDefinition,
    response: &str,
    content: &str,
) -> Result<EvaluationResult, ShapeError> {
    let verdict: AbstractionVerdict = serde_json::from_str(&extract_json_object(content))?;
    check_task(definition, &verdict.task_id)?;
    let score = check_score(definition, verdict.score)?;
    Ok(EvaluationResult::scored(
        definition.id,
        score,
        ResultDetails::Abstraction {
            response: response.to_string(),
            notes: verdict.notes,
        },
    ))
}
