//! Delayed recall.
//!
//! Only spontaneous recall is counted. Words recovered after a category cue
//! or from a multiple choice are recorded for the clinician but never add to
//! the score.

use serde::{Deserialize, Serialize};

use super::tokenize_upper;
use crate::model::{EvaluationResult, RecallDetails, ResultDetails, TaskId};
use crate::stimuli::MEMORY_WORDS;

/// Words given in the delayed recall phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedRecallSubmission {
    /// Free recall, as typed or transcribed.
    pub words: Vec<String>,
    /// Words recovered after the category cue.
    #[serde(default)]
    pub cued: Vec<String>,
    /// Words picked from the multiple-choice options.
    #[serde(default)]
    pub choice: Vec<String>,
}

/// Score a delayed recall submission.
pub fn score(submission: &DelayedRecallSubmission) -> EvaluationResult {
    let given: Vec<String> = submission
        .words
        .iter()
        .flat_map(|w| tokenize_upper(w))
        .collect();

    let (spontaneous, missed): (Vec<&str>, Vec<&str>) = MEMORY_WORDS
        .iter()
        .copied()
        .partition(|target| given.iter().any(|w| w == target));

    let cued = recovered(&submission.cued, &missed, &[]);
    let choice = recovered(&submission.choice, &missed, &cued);

    let details = RecallDetails {
        spontaneous: spontaneous.iter().map(|w| w.to_string()).collect(),
        cued,
        choice,
        missed: missed.iter().map(|w| w.to_string()).collect(),
    };
    EvaluationResult::scored(
        TaskId::DelayedRecall,
        details.spontaneous.len() as i64,
        ResultDetails::DelayedRecall(details),
    )
}

/// Missed targets present in `words`, excluding ones already recovered.
fn recovered(words: &[String], missed: &[&str], already: &[String]) -> Vec<String> {
    let given: Vec<String> = words.iter().flat_map(|w| tokenize_upper(w)).collect();
    missed
        .iter()
        .filter(|target| given.iter().any(|w| w == *target))
        .filter(|target| !already.iter().any(|a| a == *target))
        .map(|target| target.to_string())
        .collect()
}
