//! moca-report — rendering of final MoCA reports.
//!
//! JSON output lives on `FinalReport` itself; this crate adds a
//! self-contained HTML page and a Markdown clinician note.

pub mod html;
pub mod markdown;

pub use html::{generate_html, write_html_report};
pub use markdown::{generate_markdown, write_markdown_report};
