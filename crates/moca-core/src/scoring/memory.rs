//! Immediate recall trials. Never scored; the detected words go in the notes.

use crate::error::EvalError;
use crate::model::{EvaluationResult, ResultDetails, ResultStatus, TaskId};
use crate::stimuli::MEMORY_WORDS;

/// Target words found in a trial transcript, in target order.
pub fn detect_words(transcript: &str) -> Vec<String> {
    let upper = transcript.to_uppercase();
    MEMORY_WORDS
        .iter()
        .filter(|w| upper.contains(*w))
        .map(|w| w.to_string())
        .collect()
}

/// Capture one learning trial.
pub fn capture_trial(task: TaskId, transcript: &str) -> Result<EvaluationResult, EvalError> {
    if !matches!(task, TaskId::MemoryTrial1 | TaskId::MemoryTrial2) {
        return Err(EvalError::Validation(format!(
            "{task} is not a memory trial"
        )));
    }
    Ok(EvaluationResult::new(
        task,
        0,
        ResultStatus::Informational,
        ResultDetails::Memory {
            transcript: transcript.to_string(),
            detected: detect_words(transcript),
        },
    ))
}
