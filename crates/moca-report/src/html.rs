//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS inlined.

use anyhow::Result;
use std::path::Path;

use moca_core::report::{FinalReport, ModuleLine, ModuleScore, Verdict};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn verdict_class(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Normal => "normal",
        Verdict::MildCognitiveImpairment => "mild",
        Verdict::CognitiveImpairment => "impaired",
        Verdict::Indeterminate => "review",
    }
}

fn score_class(score: &ModuleScore) -> &'static str {
    match score {
        ModuleScore::Scored(_) => "scored",
        ModuleScore::AwaitingExaminer => "pending",
        ModuleScore::NotSubmitted => "missing",
        ModuleScore::Unscored => "unscored",
    }
}

/// Generate an HTML page from a final report.
pub fn generate_html(report: &FinalReport) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>MoCA report: {}</title>\n",
        html_escape(&report.session_id)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<header>\n");
    html.push_str("<h1>MoCA report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Session: <strong>{}</strong> | generated {}</p>\n",
        html_escape(&report.session_id),
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Total and verdict
    html.push_str("<section class=\"summary\">\n");
    html.push_str(&format!(
        "<p class=\"total\"><span>{}</span> / {}</p>\n",
        report.total, report.max_total
    ));
    html.push_str(&format!(
        "<p class=\"verdict {}\">{}</p>\n",
        verdict_class(report.verdict),
        html_escape(report.verdict.label())
    ));
    html.push_str(&format!(
        "<p class=\"meta\">Raw total {} | education adjustment {}</p>\n",
        report.raw_total,
        if report.education_adjustment { "+1" } else { "none" }
    ));
    html.push_str("</section>\n");

    // Module table
    html.push_str("<section class=\"modules\">\n");
    html.push_str("<h2>Modules</h2>\n");
    html.push_str("<table>\n");
    html.push_str("<thead><tr><th>Module</th><th>Scoring</th><th>Score</th><th>Max</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for line in &report.modules {
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            score_class(&line.score),
            html_escape(&line.label),
            line.strategy,
            html_escape(&line.score.display()),
            line.max_score,
        ));
    }
    html.push_str(&format!(
        "<tr class=\"sum\"><td>Total</td><td></td><td>{}</td><td>{}</td></tr>\n",
        report.total, report.max_total
    ));
    html.push_str("</tbody></table>\n");

    let scored: Vec<&ModuleLine> = report.modules.iter().filter(|l| l.max_score > 0).collect();
    if !scored.is_empty() {
        html.push_str(&generate_bar_chart(&scored));
    }
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &FinalReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

/// Horizontal bars showing each module's share of its maximum.
fn generate_bar_chart(lines: &[&ModuleLine]) -> String {
    let bar_height = 24;
    let max_width = 300;
    let padding = 8;
    let label_width = 200;

    let total_height = lines.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, line) in lines.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let points = line.score.points();
        let ratio = f64::from(points) / f64::from(line.max_score);
        let width = (ratio * max_width as f64) as usize;

        let color = match line.score {
            ModuleScore::AwaitingExaminer => "#9ca3af",
            _ if ratio >= 0.8 => "#22c55e",
            _ if ratio >= 0.5 => "#eab308",
            _ => "#ef4444",
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"13\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&line.label)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}/{}</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            points,
            line.max_score
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --ok: #dcfce7; --warn: #fef9c3; --bad: #fde2e2; --muted: #f3f4f6; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --ok: #064e3b; --warn: #713f12; --bad: #7f1d1d; --muted: #1f2937; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.total { font-size: 2rem; margin: 0.5rem 0; }
.total span { font-size: 3rem; font-weight: bold; }
.verdict { display: inline-block; padding: 0.25rem 0.75rem; border-radius: 6px; font-weight: bold; }
.verdict.normal { background: var(--ok); }
.verdict.mild { background: var(--warn); }
.verdict.impaired { background: var(--bad); }
.verdict.review { background: var(--muted); }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
.pending { background: var(--warn); }
.missing { background: var(--bad); }
.unscored { color: #6b7280; }
.sum { font-weight: bold; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use moca_core::model::Module;

    fn make_test_report() -> FinalReport {
        FinalReport::from_module_scores(
            "patient <7>",
            &[
                (Module::Visuospatial, ModuleScore::Scored(5)),
                (Module::Naming, ModuleScore::Scored(3)),
                (Module::Attention, ModuleScore::AwaitingExaminer),
                (Module::Language, ModuleScore::Scored(2)),
                (Module::Abstraction, ModuleScore::Scored(2)),
                (Module::DelayedRecall, ModuleScore::Scored(4)),
                (Module::Orientation, ModuleScore::Scored(6)),
            ],
            true,
        )
    }

    #[test]
    fn html_report_contains_required_elements() {
        let report = make_test_report();
        let html = generate_html(&report);

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("Delayed recall"));
        assert!(html.contains("model-assisted"));
        assert!(html.contains("pending"));
        assert!(html.contains(report.verdict.label()));
        assert!(html.contains(&format!("<span>{}</span> / 30", report.total)));
    }

    #[test]
    fn session_id_is_escaped() {
        let html = generate_html(&make_test_report());
        assert!(html.contains("patient &lt;7&gt;"));
        assert!(!html.contains("patient <7>"));
    }

    #[test]
    fn memory_is_left_out_of_the_chart() {
        let html = generate_html(&make_test_report());
        let svg = &html[html.find("<svg").unwrap()..html.find("</svg>").unwrap()];
        assert!(!svg.contains("Memory"));
        assert!(svg.contains("Orientation"));
    }

    #[test]
    fn html_report_write_to_file() {
        let report = make_test_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.html");

        write_html_report(&report, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }
}
