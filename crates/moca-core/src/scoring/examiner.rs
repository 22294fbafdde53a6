//! Examiner-scored tasks (attention, language).
//!
//! Transcripts and error tallies are stored as-is. The module score is
//! entered by the examiner afterwards; nothing here derives a score from a
//! transcript.

use crate::catalog;
use crate::error::EvalError;
use crate::model::{
    EvaluationResult, ExaminerCapture, Module, ResultDetails, ResultStatus, ScoringStrategy,
    TaskId,
};
use crate::stimuli;

/// Stimulus presented for an examiner-scored task.
pub fn default_stimulus(task: TaskId) -> Option<String> {
    let digits = |ds: &[u8]| {
        ds.iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    };
    match task {
        TaskId::AttentionDigitsForward => Some(digits(&stimuli::DIGITS_FORWARD)),
        TaskId::AttentionDigitsBackward => Some(digits(&stimuli::DIGITS_BACKWARD)),
        TaskId::AttentionLetterTap => Some(stimuli::LETTER_SEQUENCE.to_string()),
        TaskId::AttentionSerialSevens => Some(format!(
            "{} - {}",
            stimuli::SERIAL_START,
            stimuli::SERIAL_STEP
        )),
        TaskId::LanguageSentence1 => Some(stimuli::SENTENCE_1.to_string()),
        TaskId::LanguageSentence2 => Some(stimuli::SENTENCE_2.to_string()),
        TaskId::LanguageFluency => Some(format!(
            "words starting with F, {}s",
            stimuli::FLUENCY_SECONDS
        )),
        _ => None,
    }
}

/// Record raw performance for an examiner-scored task. The result carries
/// score 0 and stays `AwaitingExaminer` until the module score is entered.
pub fn capture(task: TaskId, mut raw: ExaminerCapture) -> Result<EvaluationResult, EvalError> {
    let definition = catalog::definition(task);
    if definition.strategy != ScoringStrategy::Examiner {
        return Err(EvalError::Validation(format!(
            "{task} is not examiner-scored"
        )));
    }
    if raw.transcript.is_none() && raw.error_count.is_none() {
        return Err(EvalError::Validation(format!(
            "{task} capture needs a transcript or an error count"
        )));
    }
    if raw.stimulus.is_none() {
        raw.stimulus = default_stimulus(task);
    }
    Ok(EvaluationResult::new(
        task,
        0,
        ResultStatus::AwaitingExaminer,
        ResultDetails::Examiner(raw),
    ))
}

/// Check an examiner-entered module score against the catalog.
pub fn validate_module_score(module: Module, score: u32) -> Result<u32, EvalError> {
    if catalog::module_strategy(module) != ScoringStrategy::Examiner {
        return Err(EvalError::Validation(format!(
            "{module} is not scored by the examiner"
        )));
    }
    let max = catalog::module_max(module);
    if score > max {
        return Err(EvalError::Validation(format!(
            "{module} score {score} is outside range [0, {max}]"
        )));
    }
    Ok(score)
}
