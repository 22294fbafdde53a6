//! The `moca run` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::future::join_all;
use tracing::info;

use moca_core::artifact::{self, DrawingMetadata};
use moca_core::assisted::AssistedScorer;
use moca_core::clock::FixedClock;
use moca_core::engine::AssessmentEngine;
use moca_core::error::EvalError;
use moca_core::parser::{self, SessionScript};
use moca_core::report::FinalReport;
use moca_providers::config::load_config_from;
use moca_providers::create_backend;
use moca_report::{write_html_report, write_markdown_report};

/// Counts task submissions that did not produce a result.
#[derive(Default)]
struct Failures(usize);

impl Failures {
    fn check<T>(&mut self, task: impl std::fmt::Display, result: Result<T, EvalError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                eprintln!("  ERROR: {task}: {e}");
                self.0 += 1;
                None
            }
        }
    }
}

pub async fn execute(
    session_path: PathBuf,
    config_path: Option<PathBuf>,
    output: Option<PathBuf>,
    format: String,
    today: Option<String>,
    parallelism: Option<usize>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let parallelism = parallelism.unwrap_or(config.parallelism);
    anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");

    let today = today
        .map(|d| {
            NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                .with_context(|| format!("invalid --today date '{d}', expected YYYY-MM-DD"))
        })
        .transpose()?;

    let formats = parse_formats(&format)?;

    let script = parser::parse_session_script(&session_path)?;
    for w in parser::validate_script(&script) {
        let subject = w.subject.map(|s| format!("[{s}] ")).unwrap_or_default();
        eprintln!("  WARNING: {subject}{}", w.message);
    }

    let backend = create_backend(&config)?;
    eprintln!(
        "moca v{} :: scoring session {} with {} ({})",
        env!("CARGO_PKG_VERSION"),
        script.id,
        config.model,
        backend.name()
    );

    let scorer = AssistedScorer::new(backend, config.assisted_config());
    let mut engine = AssessmentEngine::new(scorer);
    if let Some(date) = today {
        engine = engine.with_clock(Arc::new(FixedClock(date)));
    }

    let failures = administer(&engine, &script, parallelism).await?;
    info!(session = %script.id, failures, "administration scored");

    let session = engine.session(&script.id).await?;
    let report = engine.report(&script.id).await?;
    super::print_summary(&report);
    if failures > 0 {
        eprintln!("{failures} task(s) could not be scored and count as 0.");
    }

    let output = output.unwrap_or(config.output_dir);
    std::fs::create_dir_all(&output)
        .with_context(|| format!("failed to create output directory: {}", output.display()))?;
    let stem = file_stem(&script.id);

    let session_file = output.join(format!("{stem}-session.json"));
    session.save_json(&session_file)?;
    eprintln!("Session saved to: {}", session_file.display());

    for fmt in formats {
        write_format(&report, fmt, &output, &stem)?;
    }

    Ok(())
}

/// Feed every section of the script to the engine. Drawings and abstraction
/// answers go to the model concurrently. Returns the number of failed tasks.
async fn administer(
    engine: &AssessmentEngine,
    script: &SessionScript,
    parallelism: usize,
) -> Result<usize> {
    let id = script.id.as_str();
    let mut failures = Failures::default();

    engine
        .set_education_adjustment(id, script.education_adjustment)
        .await?;

    let mut submission_ids = Vec::new();
    for (task, path) in &script.drawings {
        let image =
            artifact::load_image(path).map_err(|e| EvalError::Validation(format!("{e:#}")));
        let Some(image) = failures.check(task, image) else {
            continue;
        };
        let metadata = DrawingMetadata {
            timestamp: Some(chrono::Utc::now().timestamp_millis()),
            device_type: Some("cli".into()),
        };
        if let Some(submission_id) = failures.check(
            task,
            engine
                .submit_drawing(id, task.as_str(), image, metadata)
                .await,
        ) {
            submission_ids.push((submission_id, *task));
        }
    }

    let ids: Vec<String> = submission_ids.iter().map(|(s, _)| s.clone()).collect();
    let abstraction = script
        .abstraction
        .iter()
        .map(|(task, response)| engine.submit_abstraction(id, task.as_str(), response));
    let (drawings, abstraction) = tokio::join!(
        engine.evaluate_drawings(&ids, parallelism),
        join_all(abstraction)
    );
    for outcome in drawings {
        let task = submission_ids
            .iter()
            .find(|(s, _)| *s == outcome.submission_id)
            .map(|(_, t)| t.to_string())
            .unwrap_or(outcome.submission_id);
        failures.check(task, outcome.result);
    }

    if let Some(answers) = &script.naming {
        failures.check("naming", engine.submit_naming(id, answers).await);
    }
    for (task, transcript) in &script.memory_trials {
        failures.check(
            task,
            engine.submit_memory_trial(id, task.as_str(), transcript).await,
        );
    }
    for (task, capture) in &script.examiner_captures {
        failures.check(
            task,
            engine
                .submit_examiner_capture(id, task.as_str(), capture.clone())
                .await,
        );
    }
    for (module, score) in &script.examiner_scores {
        failures.check(module, engine.record_examiner_score(id, *module, *score).await);
    }
    for ((task, _), result) in script.abstraction.iter().zip(abstraction) {
        failures.check(task, result);
    }
    if let Some(recall) = &script.delayed_recall {
        failures.check("DELAYED_RECALL", engine.submit_delayed_recall(id, recall).await);
    }
    if let Some(orientation) = &script.orientation {
        failures.check("ORIENTATION", engine.submit_orientation(id, orientation).await);
    }

    Ok(failures.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Html,
    Markdown,
}

/// Parse `--format`: a comma-separated list, or `all`.
fn parse_formats(format: &str) -> Result<Vec<OutputFormat>> {
    if format.trim() == "all" {
        return Ok(vec![OutputFormat::Json, OutputFormat::Html, OutputFormat::Markdown]);
    }
    let mut formats = Vec::new();
    for name in format.split(',').map(str::trim) {
        let fmt = match name {
            "json" => OutputFormat::Json,
            "html" => OutputFormat::Html,
            "markdown" | "md" => OutputFormat::Markdown,
            other => anyhow::bail!(
                "unknown format '{other}' (expected json, html, markdown or all)"
            ),
        };
        if !formats.contains(&fmt) {
            formats.push(fmt);
        }
    }
    Ok(formats)
}

fn write_format(report: &FinalReport, format: OutputFormat, output: &Path, stem: &str) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let path = output.join(format!("{stem}-report.json"));
            report.save_json(&path)?;
            eprintln!("Report saved to: {}", path.display());
        }
        OutputFormat::Html => {
            let path = output.join(format!("{stem}-report.html"));
            write_html_report(report, &path)?;
            eprintln!("HTML report: {}", path.display());
        }
        OutputFormat::Markdown => {
            let path = output.join(format!("{stem}-report.md"));
            write_markdown_report(report, &path)?;
            eprintln!("Markdown note: {}", path.display());
        }
    }
    Ok(())
}

/// Session ids become file names; keep them to a safe character set.
fn file_stem(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_replaces_unsafe_characters() {
        assert_eq!(file_stem("patient-001"), "patient-001");
        assert_eq!(file_stem("../a b"), "___a_b");
    }

    #[test]
    fn formats_are_checked_up_front() {
        assert_eq!(
            parse_formats("json, md,markdown").unwrap(),
            vec![OutputFormat::Json, OutputFormat::Markdown]
        );
        assert_eq!(parse_formats("all").unwrap().len(), 3);
        let err = parse_formats("json,yaml").unwrap_err();
        assert!(err.to_string().contains("unknown format 'yaml'"));
    }
}
