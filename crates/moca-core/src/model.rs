//! Core data model types.
//!
//! Task identifiers, modules, scoring strategies, and the per-task
//! `EvaluationResult` every scorer produces.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::error::EvalError;

/// Identifier of a single scorable (or captured) task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskId {
    #[serde(rename = "A_TRAIL")]
    ATrail,
    #[serde(rename = "B_CUBE")]
    BCube,
    #[serde(rename = "C_CLOCK")]
    CClock,
    #[serde(rename = "NAMING_LION")]
    NamingLion,
    #[serde(rename = "NAMING_RHINO")]
    NamingRhino,
    #[serde(rename = "NAMING_CAMEL")]
    NamingCamel,
    #[serde(rename = "MEMORY_TRIAL_1")]
    MemoryTrial1,
    #[serde(rename = "MEMORY_TRIAL_2")]
    MemoryTrial2,
    #[serde(rename = "ATTENTION_DIGITS_FORWARD")]
    AttentionDigitsForward,
    #[serde(rename = "ATTENTION_DIGITS_BACKWARD")]
    AttentionDigitsBackward,
    #[serde(rename = "ATTENTION_LETTER_TAP")]
    AttentionLetterTap,
    #[serde(rename = "ATTENTION_SERIAL_SEVENS")]
    AttentionSerialSevens,
    #[serde(rename = "LANGUAGE_SENTENCE_1")]
    LanguageSentence1,
    #[serde(rename = "LANGUAGE_SENTENCE_2")]
    LanguageSentence2,
    #[serde(rename = "LANGUAGE_FLUENCY")]
    LanguageFluency,
    #[serde(rename = "ABSTRACTION_TRAIN")]
    AbstractionTrain,
    #[serde(rename = "ABSTRACTION_WATCH")]
    AbstractionWatch,
    #[serde(rename = "DELAYED_RECALL")]
    DelayedRecall,
    #[serde(rename = "ORIENTATION")]
    Orientation,
}

impl TaskId {
    /// Every task, in administration order.
    pub const ALL: [TaskId; 19] = [
        TaskId::ATrail,
        TaskId::BCube,
        TaskId::CClock,
        TaskId::NamingLion,
        TaskId::NamingRhino,
        TaskId::NamingCamel,
        TaskId::MemoryTrial1,
        TaskId::MemoryTrial2,
        TaskId::AttentionDigitsForward,
        TaskId::AttentionDigitsBackward,
        TaskId::AttentionLetterTap,
        TaskId::AttentionSerialSevens,
        TaskId::LanguageSentence1,
        TaskId::LanguageSentence2,
        TaskId::LanguageFluency,
        TaskId::AbstractionTrain,
        TaskId::AbstractionWatch,
        TaskId::DelayedRecall,
        TaskId::Orientation,
    ];

    /// Wire name, e.g. `"C_CLOCK"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskId::ATrail => "A_TRAIL",
            TaskId::BCube => "B_CUBE",
            TaskId::CClock => "C_CLOCK",
            TaskId::NamingLion => "NAMING_LION",
            TaskId::NamingRhino => "NAMING_RHINO",
            TaskId::NamingCamel => "NAMING_CAMEL",
            TaskId::MemoryTrial1 => "MEMORY_TRIAL_1",
            TaskId::MemoryTrial2 => "MEMORY_TRIAL_2",
            TaskId::AttentionDigitsForward => "ATTENTION_DIGITS_FORWARD",
            TaskId::AttentionDigitsBackward => "ATTENTION_DIGITS_BACKWARD",
            TaskId::AttentionLetterTap => "ATTENTION_LETTER_TAP",
            TaskId::AttentionSerialSevens => "ATTENTION_SERIAL_SEVENS",
            TaskId::LanguageSentence1 => "LANGUAGE_SENTENCE_1",
            TaskId::LanguageSentence2 => "LANGUAGE_SENTENCE_2",
            TaskId::LanguageFluency => "LANGUAGE_FLUENCY",
            TaskId::AbstractionTrain => "ABSTRACTION_TRAIN",
            TaskId::AbstractionWatch => "ABSTRACTION_WATCH",
            TaskId::DelayedRecall => "DELAYED_RECALL",
            TaskId::Orientation => "ORIENTATION",
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskId {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TaskId::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EvalError::UnknownTask(wanted.to_string()))
    }
}

/// The eight MoCA modules, in administration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Visuospatial,
    Naming,
    Memory,
    Attention,
    Language,
    Abstraction,
    DelayedRecall,
    Orientation,
}

impl Module {
    pub const ALL: [Module; 8] = [
        Module::Visuospatial,
        Module::Naming,
        Module::Memory,
        Module::Attention,
        Module::Language,
        Module::Abstraction,
        Module::DelayedRecall,
        Module::Orientation,
    ];

    /// Human-readable label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Module::Visuospatial => "Visuospatial / executive",
            Module::Naming => "Naming",
            Module::Memory => "Memory (learning trials)",
            Module::Attention => "Attention",
            Module::Language => "Language",
            Module::Abstraction => "Abstraction",
            Module::DelayedRecall => "Delayed recall",
            Module::Orientation => "Orientation",
        }
    }

    /// The module administered after this one, if any.
    pub fn next(&self) -> Option<Module> {
        let idx = Module::ALL.iter().position(|m| m == self)?;
        Module::ALL.get(idx + 1).copied()
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Module::Visuospatial => "visuospatial",
            Module::Naming => "naming",
            Module::Memory => "memory",
            Module::Attention => "attention",
            Module::Language => "language",
            Module::Abstraction => "abstraction",
            Module::DelayedRecall => "delayed_recall",
            Module::Orientation => "orientation",
        };
        f.write_str(s)
    }
}

impl FromStr for Module {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "visuospatial" => Ok(Module::Visuospatial),
            "naming" => Ok(Module::Naming),
            "memory" => Ok(Module::Memory),
            "attention" => Ok(Module::Attention),
            "language" => Ok(Module::Language),
            "abstraction" => Ok(Module::Abstraction),
            "delayed_recall" => Ok(Module::DelayedRecall),
            "orientation" => Ok(Module::Orientation),
            other => Err(EvalError::Validation(format!("unknown module: {other}"))),
        }
    }
}

/// How a task's score is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoringStrategy {
    /// Pure rule-based scoring inside the engine.
    Deterministic,
    /// Judged by an external vision/language model against a rubric.
    ModelAssisted,
    /// Raw data is captured; the examiner supplies the score afterwards.
    Examiner,
}

impl fmt::Display for ScoringStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringStrategy::Deterministic => write!(f, "deterministic"),
            ScoringStrategy::ModelAssisted => write!(f, "model-assisted"),
            ScoringStrategy::Examiner => write!(f, "examiner"),
        }
    }
}

/// Whether a result's `score` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    /// `score` is final.
    Scored,
    /// Raw data captured; the module score comes from the examiner.
    AwaitingExaminer,
    /// Captured for clinical notes only, never counted.
    Informational,
}

/// Output of scoring one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub task_id: TaskId,
    pub score: u32,
    pub max_score: u32,
    pub status: ResultStatus,
    /// Set when the raw score fell outside `[0, max_score]` and was clamped.
    #[serde(default)]
    pub clamped: bool,
    pub details: ResultDetails,
}

impl EvaluationResult {
    /// Build a result, clamping `raw_score` into the catalog range for `task_id`.
    pub fn new(task_id: TaskId, raw_score: i64, status: ResultStatus, details: ResultDetails) -> Self {
        let max_score = catalog::definition(task_id).max_score;
        let score = raw_score.clamp(0, i64::from(max_score));
        let clamped = score != raw_score;
        if clamped {
            tracing::warn!(task = %task_id, raw_score, max_score, "score clamped into range");
        }
        Self {
            task_id,
            // In range by the clamp above.
            score: score as u32,
            max_score,
            status,
            clamped,
            details,
        }
    }

    /// A final, counted score.
    pub fn scored(task_id: TaskId, raw_score: i64, details: ResultDetails) -> Self {
        Self::new(task_id, raw_score, ResultStatus::Scored, details)
    }
}

/// Strategy-specific payload attached to an `EvaluationResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ResultDetails {
    Naming {
        user_answer: String,
        correct: bool,
    },
    Memory {
        transcript: String,
        detected: Vec<String>,
    },
    DelayedRecall(RecallDetails),
    Orientation(OrientationDetails),
    Drawing(DrawingDetails),
    Abstraction {
        response: String,
        notes: String,
    },
    Examiner(ExaminerCapture),
}

/// Delayed recall breakdown. Only `spontaneous` contributes to the score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecallDetails {
    pub spontaneous: Vec<String>,
    pub cued: Vec<String>,
    pub choice: Vec<String>,
    pub missed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrientationDetails {
    pub date_score: u32,
    pub place_score: u32,
    pub city_score: u32,
    pub place: String,
    pub city: String,
}

/// One named rubric criterion judged by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckVerdict {
    pub pass: bool,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingDetails {
    pub unscorable: bool,
    pub confidence: f64,
    pub checks: BTreeMap<String, CheckVerdict>,
    pub overall_notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_target_object: Option<bool>,
}

/// Raw examiner-facing data for a manually scored task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExaminerCapture {
    /// What was presented (digit string, sentence, letter sequence).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stimulus: Option<String>,
    /// What the patient said, as transcribed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// Error tally (letter tapping).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_display_and_parse() {
        assert_eq!(TaskId::CClock.to_string(), "C_CLOCK");
        assert_eq!("c_clock".parse::<TaskId>().unwrap(), TaskId::CClock);
        assert_eq!(
            "MEMORY_TRIAL_1".parse::<TaskId>().unwrap(),
            TaskId::MemoryTrial1
        );
        assert!(matches!(
            "D_SPIRAL".parse::<TaskId>(),
            Err(EvalError::UnknownTask(id)) if id == "D_SPIRAL"
        ));
    }

    #[test]
    fn task_id_serde_matches_display() {
        for task in TaskId::ALL {
            let json = serde_json::to_string(&task).unwrap();
            assert_eq!(json, format!("\"{}\"", task.as_str()));
        }
    }

    #[test]
    fn module_order_and_parse() {
        assert_eq!(Module::Visuospatial.next(), Some(Module::Naming));
        assert_eq!(Module::Orientation.next(), None);
        assert_eq!(
            "delayed-recall".parse::<Module>().unwrap(),
            Module::DelayedRecall
        );
        assert!("reading".parse::<Module>().is_err());
    }

    #[test]
    fn result_clamps_and_flags() {
        let over = EvaluationResult::scored(
            TaskId::CClock,
            7,
            ResultDetails::Abstraction {
                response: String::new(),
                notes: String::new(),
            },
        );
        assert_eq!(over.score, 3);
        assert!(over.clamped);

        let under = EvaluationResult::scored(TaskId::NamingLion, -2, naming_details());
        assert_eq!(under.score, 0);
        assert!(under.clamped);

        let ok = EvaluationResult::scored(TaskId::NamingLion, 1, naming_details());
        assert_eq!(ok.score, 1);
        assert!(!ok.clamped);
    }

    #[test]
    fn details_serialize_with_kind_tag() {
        let details = ResultDetails::DelayedRecall(RecallDetails {
            spontaneous: vec!["ROSTRO".into()],
            ..Default::default()
        });
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["kind"], "delayed_recall");
        assert_eq!(json["spontaneous"][0], "ROSTRO");

        let naming = serde_json::to_value(naming_details()).unwrap();
        assert_eq!(naming["userAnswer"], "león");
    }

    fn naming_details() -> ResultDetails {
        ResultDetails::Naming {
            user_answer: "león".into(),
            correct: true,
        }
    }
}
