pub mod init;
pub mod report;
pub mod run;
pub mod tasks;
pub mod validate;

use comfy_table::{Cell, Table};

use moca_core::report::FinalReport;

/// Module-by-module table with the total and verdict underneath.
pub fn summary_table(report: &FinalReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Module", "Scoring", "Score", "Max"]);

    for line in &report.modules {
        table.add_row(vec![
            Cell::new(&line.label),
            Cell::new(line.strategy),
            Cell::new(line.score.display()),
            Cell::new(line.max_score),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total"),
        Cell::new(if report.education_adjustment {
            "+1 education"
        } else {
            ""
        }),
        Cell::new(report.total),
        Cell::new(report.max_total),
    ]);
    table
}

/// Print the summary table and verdict to stdout.
pub fn print_summary(report: &FinalReport) {
    println!("Session: {}", report.session_id);
    println!("{}", summary_table(report));
    println!("Verdict: {}", report.verdict.label());
}
