//! Markdown clinician note.

use anyhow::Result;
use std::fmt::Write as _;
use std::path::Path;

use moca_core::report::{FinalReport, ModuleScore};

/// Render a report as a Markdown note suitable for a patient record.
pub fn generate_markdown(report: &FinalReport) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "# MoCA assessment: {}", report.session_id);
    let _ = writeln!(
        md,
        "\n_Generated {}_\n",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    md.push_str("| Module | Scoring | Score | Max |\n");
    md.push_str("|---|---|---:|---:|\n");
    for line in &report.modules {
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} |",
            line.label,
            line.strategy,
            line.score.display(),
            line.max_score
        );
    }

    let _ = writeln!(
        md,
        "\n**Total: {} / {}**{}",
        report.total,
        report.max_total,
        if report.education_adjustment {
            format!(" (raw {} + 1 for education)", report.raw_total)
        } else {
            String::new()
        }
    );
    let _ = writeln!(md, "\n**Verdict:** {}", report.verdict.label());

    let pending: Vec<&str> = report
        .modules
        .iter()
        .filter(|l| l.score == ModuleScore::AwaitingExaminer)
        .map(|l| l.label.as_str())
        .collect();
    let missing: Vec<&str> = report
        .modules
        .iter()
        .filter(|l| l.score == ModuleScore::NotSubmitted)
        .map(|l| l.label.as_str())
        .collect();

    if !pending.is_empty() || !missing.is_empty() {
        md.push_str("\n## Notes\n\n");
        if !pending.is_empty() {
            let _ = writeln!(
                md,
                "- Awaiting examiner score (counted as 0): {}",
                pending.join(", ")
            );
        }
        if !missing.is_empty() {
            let _ = writeln!(md, "- Not administered (counted as 0): {}", missing.join(", "));
        }
    }

    md
}

/// Write a Markdown note to a file.
pub fn write_markdown_report(report: &FinalReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, generate_markdown(report))?;
    Ok(())
}
