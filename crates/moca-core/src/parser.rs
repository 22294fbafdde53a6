//! TOML session script parser.
//!
//! A script describes one whole administration: what the patient answered
//! in each module, the examiner's marks, and paths to the drawings.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::catalog;
use crate::model::{ExaminerCapture, Module, ScoringStrategy, TaskId};
use crate::scoring::naming::NamingAnswers;
use crate::scoring::orientation::{DateAnswer, ExaminerMarked, OrientationSubmission};
use crate::scoring::recall::DelayedRecallSubmission;
use crate::stimuli::MEMORY_WORDS;

#[derive(Debug, Deserialize)]
struct TomlScript {
    session: TomlSessionHeader,
    #[serde(default)]
    visuospatial: BTreeMap<String, String>,
    #[serde(default)]
    naming: Option<NamingAnswers>,
    #[serde(default)]
    memory: BTreeMap<String, String>,
    #[serde(default)]
    examiner: Vec<TomlExaminerCapture>,
    #[serde(default)]
    examiner_scores: BTreeMap<String, u32>,
    #[serde(default)]
    abstraction: BTreeMap<String, String>,
    #[serde(default)]
    delayed_recall: Option<DelayedRecallSubmission>,
    #[serde(default)]
    orientation: Option<TomlOrientation>,
}

#[derive(Debug, Deserialize)]
struct TomlSessionHeader {
    id: String,
    #[serde(default)]
    education_adjustment: bool,
}

#[derive(Debug, Deserialize)]
struct TomlExaminerCapture {
    task: String,
    #[serde(default)]
    stimulus: Option<String>,
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    error_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TomlOrientation {
    day: u32,
    month: u32,
    year: i32,
    day_of_week: String,
    #[serde(default)]
    place: String,
    #[serde(default)]
    place_correct: bool,
    #[serde(default)]
    city: String,
    #[serde(default)]
    city_correct: bool,
}

/// One administration, ready to be fed to the engine.
#[derive(Debug, Clone)]
pub struct SessionScript {
    pub id: String,
    pub education_adjustment: bool,
    /// Drawing image per visuospatial task, resolved against the script's directory.
    pub drawings: Vec<(TaskId, PathBuf)>,
    pub naming: Option<NamingAnswers>,
    pub memory_trials: Vec<(TaskId, String)>,
    pub examiner_captures: Vec<(TaskId, ExaminerCapture)>,
    pub examiner_scores: Vec<(Module, u32)>,
    pub abstraction: Vec<(TaskId, String)>,
    pub delayed_recall: Option<DelayedRecallSubmission>,
    pub orientation: Option<OrientationSubmission>,
}

/// Parse a session script file.
pub fn parse_session_script(path: &Path) -> Result<SessionScript> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read session script: {}", path.display()))?;

    parse_session_script_str(&content, path)
}

/// Parse a TOML string into a `SessionScript` (useful for testing).
pub fn parse_session_script_str(content: &str, source_path: &Path) -> Result<SessionScript> {
    let parsed: TomlScript = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;
    let base_dir = source_path.parent().unwrap_or_else(|| Path::new("."));

    let drawings = parsed
        .visuospatial
        .into_iter()
        .map(|(task, image)| {
            let task = task_in(&task, Module::Visuospatial)?;
            Ok((task, base_dir.join(image)))
        })
        .collect::<Result<Vec<_>>>()?;

    let memory_trials = parsed
        .memory
        .into_iter()
        .map(|(key, transcript)| {
            let task = match key.as_str() {
                "trial_1" => TaskId::MemoryTrial1,
                "trial_2" => TaskId::MemoryTrial2,
                other => task_in(other, Module::Memory)?,
            };
            Ok((task, transcript))
        })
        .collect::<Result<Vec<_>>>()?;

    let examiner_captures = parsed
        .examiner
        .into_iter()
        .map(|c| {
            let task: TaskId = c.task.parse()?;
            Ok((
                task,
                ExaminerCapture {
                    stimulus: c.stimulus,
                    transcript: c.transcript,
                    error_count: c.error_count,
                },
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let examiner_scores = parsed
        .examiner_scores
        .into_iter()
        .map(|(module, score)| Ok((module.parse::<Module>()?, score)))
        .collect::<Result<Vec<_>>>()?;

    let abstraction = parsed
        .abstraction
        .into_iter()
        .map(|(key, response)| {
            let task = match key.as_str() {
                "train" => TaskId::AbstractionTrain,
                "watch" => TaskId::AbstractionWatch,
                other => task_in(other, Module::Abstraction)?,
            };
            Ok((task, response))
        })
        .collect::<Result<Vec<_>>>()?;

    let orientation = parsed.orientation.map(|o| OrientationSubmission {
        date: DateAnswer {
            day: o.day,
            month: o.month,
            year: o.year,
            day_of_week: o.day_of_week,
        },
        place: ExaminerMarked {
            value: o.place,
            is_correct: o.place_correct,
        },
        city: ExaminerMarked {
            value: o.city,
            is_correct: o.city_correct,
        },
    });

    Ok(SessionScript {
        id: parsed.session.id,
        education_adjustment: parsed.session.education_adjustment,
        drawings,
        naming: parsed.naming,
        memory_trials,
        examiner_captures,
        examiner_scores,
        abstraction,
        delayed_recall: parsed.delayed_recall,
        orientation,
    })
}

fn task_in(id: &str, module: Module) -> Result<TaskId> {
    let definition = catalog::lookup(id)?;
    if definition.module != module {
        anyhow::bail!("{} belongs to {}, not {module}", definition.id, definition.module);
    }
    Ok(definition.id)
}

/// Load every `.toml` script in a directory, skipping files that fail to parse.
pub fn load_session_directory(dir: &Path) -> Result<Vec<SessionScript>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut scripts = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_session_script(&path) {
                Ok(script) => scripts.push(script),
                Err(e) => tracing::warn!("skipping {}: {e:#}", path.display()),
            }
        }
    }
    scripts.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(scripts)
}

/// A non-fatal problem found in a script.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The task or module concerned, if any.
    pub subject: Option<String>,
    pub message: String,
}

fn warn(subject: impl Into<String>, message: impl Into<String>) -> ValidationWarning {
    ValidationWarning {
        subject: Some(subject.into()),
        message: message.into(),
    }
}

/// Check a script for gaps that would leave the report incomplete.
pub fn validate_script(script: &SessionScript) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if script.id.trim().is_empty() {
        warnings.push(ValidationWarning {
            subject: None,
            message: "session id is empty".into(),
        });
    }

    for (task, path) in &script.drawings {
        if !path.is_file() {
            warnings.push(warn(task.as_str(), format!("image not found: {}", path.display())));
        }
    }
    let drawn: HashSet<TaskId> = script.drawings.iter().map(|(t, _)| *t).collect();
    for definition in catalog::tasks_for(Module::Visuospatial) {
        if !drawn.contains(&definition.id) {
            warnings.push(warn(definition.id.as_str(), "no drawing given, counts as 0"));
        }
    }

    if script.naming.is_none() {
        warnings.push(warn("naming", "no naming answers, module counts as 0"));
    }

    let mut seen = HashSet::new();
    for (task, capture) in &script.examiner_captures {
        if catalog::definition(*task).strategy != ScoringStrategy::Examiner {
            warnings.push(warn(task.as_str(), "not an examiner-scored task, capture will be rejected"));
        }
        if !seen.insert(*task) {
            warnings.push(warn(task.as_str(), "captured more than once, last one wins"));
        }
        if capture.transcript.is_none() && capture.error_count.is_none() {
            warnings.push(warn(task.as_str(), "capture has neither transcript nor error_count"));
        }
    }

    for module in [Module::Attention, Module::Language] {
        let max = catalog::module_max(module);
        match script.examiner_scores.iter().find(|(m, _)| *m == module) {
            Some((_, score)) if *score > max => {
                warnings.push(warn(module.to_string(), format!("score {score} exceeds max {max}")));
            }
            Some(_) => {}
            None => warnings.push(warn(
                module.to_string(),
                "no examiner score, module stays pending",
            )),
        }
    }
    for (module, _) in &script.examiner_scores {
        if catalog::module_strategy(*module) != ScoringStrategy::Examiner {
            warnings.push(warn(module.to_string(), "module is not examiner-scored"));
        }
    }

    if script.abstraction.len() < 2 {
        warnings.push(warn("abstraction", "fewer than two pairs answered"));
    }

    match &script.delayed_recall {
        None => warnings.push(warn("delayed_recall", "no delayed recall, module counts as 0")),
        Some(recall) => {
            for word in recall.cued.iter().chain(&recall.choice) {
                let upper = word.trim().to_uppercase();
                if !MEMORY_WORDS.contains(&upper.as_str()) {
                    warnings.push(warn(
                        "delayed_recall",
                        format!("'{word}' is not a memory word and will be ignored"),
                    ));
                }
            }
        }
    }

    if script.orientation.is_none() {
        warnings.push(warn("orientation", "no orientation, session will not be marked completed"));
    }

    warnings
}
