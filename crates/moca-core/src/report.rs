//! Final report: module totals, education adjustment and verdict.
//!
//! Derived from a session on demand. Maxima come from the catalog.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::model::{Module, ResultStatus, ScoringStrategy};
use crate::session::TestSession;

/// Upper bound of the adjusted total.
pub const MAX_TOTAL: u32 = 30;

/// State of one module in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "points", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleScore {
    Scored(u32),
    /// Raw data captured, examiner score not entered yet. Counts as 0.
    AwaitingExaminer,
    /// Nothing submitted. Counts as 0.
    NotSubmitted,
    /// Never scored (memory learning trials).
    Unscored,
}

impl ModuleScore {
    /// Points this module adds to the total.
    pub fn points(&self) -> u32 {
        match self {
            ModuleScore::Scored(n) => *n,
            _ => 0,
        }
    }

    /// Short form for tables: the score, "pending", "0" or "—".
    pub fn display(&self) -> String {
        match self {
            ModuleScore::Scored(n) => n.to_string(),
            ModuleScore::AwaitingExaminer => "pending".to_string(),
            ModuleScore::NotSubmitted => "0".to_string(),
            ModuleScore::Unscored => "—".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleLine {
    pub module: Module,
    pub label: String,
    pub max_score: u32,
    pub strategy: ScoringStrategy,
    pub score: ModuleScore,
}

/// Severity label for a total. The gaps in the table are deliberately left
/// as `Indeterminate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// 26 and above.
    Normal,
    /// 20 to 23.
    MildCognitiveImpairment,
    /// Below 10.
    CognitiveImpairment,
    /// 24 to 25, 10 to 19.
    Indeterminate,
}

impl Verdict {
    pub fn from_total(total: u32) -> Self {
        match total {
            26..=u32::MAX => Verdict::Normal,
            20..=23 => Verdict::MildCognitiveImpairment,
            0..=9 => Verdict::CognitiveImpairment,
            _ => Verdict::Indeterminate,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Normal => "Normal: no cognitive alteration",
            Verdict::MildCognitiveImpairment => "Mild cognitive impairment",
            Verdict::CognitiveImpairment => "Cognitive impairment",
            Verdict::Indeterminate => "Out of defined range (requires clinical review)",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub session_id: String,
    pub generated_at: DateTime<Utc>,
    pub modules: Vec<ModuleLine>,
    /// Sum of module points before the adjustment.
    pub raw_total: u32,
    pub education_adjustment: bool,
    /// Adjusted total, at most [`MAX_TOTAL`].
    pub total: u32,
    pub max_total: u32,
    pub verdict: Verdict,
}

impl FinalReport {
    /// Build a report from per-module states. Scored values are clamped to
    /// the module maximum; modules not listed count as `NotSubmitted`.
    pub fn from_module_scores(
        session_id: impl Into<String>,
        scores: &[(Module, ModuleScore)],
        education_adjustment: bool,
    ) -> Self {
        let modules: Vec<ModuleLine> = Module::ALL
            .iter()
            .map(|&module| {
                let max_score = catalog::module_max(module);
                let given = scores
                    .iter()
                    .find(|(m, _)| *m == module)
                    .map(|(_, s)| *s)
                    .unwrap_or(ModuleScore::NotSubmitted);
                let score = if !catalog::module_is_scored(module) {
                    ModuleScore::Unscored
                } else {
                    match given {
                        ModuleScore::Scored(n) => ModuleScore::Scored(n.min(max_score)),
                        other => other,
                    }
                };
                ModuleLine {
                    module,
                    label: module.label().to_string(),
                    max_score,
                    strategy: catalog::module_strategy(module),
                    score,
                }
            })
            .collect();

        let raw_total: u32 = modules.iter().map(|l| l.score.points()).sum();
        let total = (raw_total + u32::from(education_adjustment)).min(MAX_TOTAL);

        Self {
            session_id: session_id.into(),
            generated_at: Utc::now(),
            modules,
            raw_total,
            education_adjustment,
            total,
            max_total: catalog::total_max(),
            verdict: Verdict::from_total(total),
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse report JSON")
    }

    pub fn line(&self, module: Module) -> Option<&ModuleLine> {
        self.modules.iter().find(|l| l.module == module)
    }
}

/// State of `module` in `session`.
pub fn module_score(session: &TestSession, module: Module) -> ModuleScore {
    if !catalog::module_is_scored(module) {
        return ModuleScore::Unscored;
    }
    let results: Vec<_> = catalog::tasks_for(module)
        .filter_map(|d| session.result(d.id))
        .collect();

    if catalog::module_strategy(module) == ScoringStrategy::Examiner {
        return match session.examiner_scores.get(&module) {
            Some(n) => ModuleScore::Scored(*n),
            None if results.is_empty() => ModuleScore::NotSubmitted,
            None => ModuleScore::AwaitingExaminer,
        };
    }

    let scored: Vec<_> = results
        .iter()
        .filter(|r| r.status == ResultStatus::Scored)
        .collect();
    if scored.is_empty() {
        return ModuleScore::NotSubmitted;
    }
    ModuleScore::Scored(scored.iter().map(|r| r.score).sum())
}

/// Aggregate a session into its final report.
pub fn compute_report(session: &TestSession) -> FinalReport {
    let scores: Vec<(Module, ModuleScore)> = Module::ALL
        .iter()
        .map(|&m| (m, module_score(session, m)))
        .collect();
    FinalReport::from_module_scores(session.id.clone(), &scores, session.education_adjustment)
}
