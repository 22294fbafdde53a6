//! The `moca tasks` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use moca_core::catalog;
use moca_core::model::Module;

pub fn execute() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Task", "Module", "Max", "Scoring", "Checks"]);

    for definition in catalog::all() {
        table.add_row(vec![
            Cell::new(definition.id),
            Cell::new(definition.module),
            Cell::new(definition.max_score),
            Cell::new(definition.strategy),
            Cell::new(definition.checks.join(", ")),
        ]);
    }
    println!("{table}");

    let modules: Vec<String> = Module::ALL
        .iter()
        .map(|m| format!("{m} {}", catalog::module_max(*m)))
        .collect();
    println!("Module maxima: {}", modules.join(", "));
    println!("Total: {}", catalog::total_max());

    Ok(())
}
