//! The `moca report` command.

use std::path::PathBuf;

use anyhow::Result;

use moca_core::report::compute_report;
use moca_core::session::TestSession;

pub fn execute(input: PathBuf, format: String) -> Result<()> {
    let session = TestSession::load_json(&input)?;
    let report = compute_report(&session);

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "markdown" | "md" => print!("{}", moca_report::generate_markdown(&report)),
        "html" => println!("{}", moca_report::generate_html(&report)),
        "text" => super::print_summary(&report),
        other => anyhow::bail!("unknown format '{other}' (expected text, json, markdown or html)"),
    }

    Ok(())
}
