//! The `moca validate` command.

use std::path::PathBuf;

use anyhow::Result;

use moca_core::parser;

pub fn execute(session_path: PathBuf) -> Result<()> {
    let scripts = if session_path.is_dir() {
        parser::load_session_directory(&session_path)?
    } else {
        vec![parser::parse_session_script(&session_path)?]
    };

    let mut total_warnings = 0;

    for script in &scripts {
        println!(
            "Session: {} ({} drawings, {} examiner captures)",
            script.id,
            script.drawings.len(),
            script.examiner_captures.len()
        );

        let warnings = parser::validate_script(script);
        for w in &warnings {
            let prefix = w
                .subject
                .as_ref()
                .map(|s| format!("  [{s}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All sessions valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
