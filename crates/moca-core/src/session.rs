//! Test session: one patient's run through the eight modules.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{EvaluationResult, ExaminerCapture, Module, TaskId};
use crate::scoring::orientation::OrientationSubmission;
use crate::scoring::recall::DelayedRecallSubmission;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    InProgress,
    /// Orientation, the last module, has been submitted.
    Completed,
}

/// Raw response as submitted, kept next to its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawSubmission {
    Naming { answer: String },
    Transcript { text: String },
    Examiner(ExaminerCapture),
    Abstraction { response: String },
    Drawing { submission_id: String },
    DelayedRecall(DelayedRecallSubmission),
    Orientation(OrientationSubmission),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub submissions: BTreeMap<TaskId, RawSubmission>,
    #[serde(default)]
    pub results: BTreeMap<TaskId, EvaluationResult>,
    /// Module scores entered by the examiner (attention, language).
    #[serde(default)]
    pub examiner_scores: BTreeMap<Module, u32>,
    /// +1 for 12 years of schooling or fewer.
    #[serde(default)]
    pub education_adjustment: bool,
    pub status: SessionStatus,
}

impl TestSession {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
            submissions: BTreeMap::new(),
            results: BTreeMap::new(),
            examiner_scores: BTreeMap::new(),
            education_adjustment: false,
            status: SessionStatus::InProgress,
        }
    }

    /// Store a result and the submission that produced it. Replaces any
    /// earlier result for the same task.
    pub fn record(&mut self, submission: RawSubmission, result: EvaluationResult) {
        let task = result.task_id;
        self.submissions.insert(task, submission);
        self.results.insert(task, result);
        self.touch();
    }

    pub fn result(&self, task: TaskId) -> Option<&EvaluationResult> {
        self.results.get(&task)
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Save the session as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize session")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write session to {}", path.display()))?;
        Ok(())
    }

    /// Load a session from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read session from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse session JSON")
    }
}
