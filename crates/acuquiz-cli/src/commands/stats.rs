//! The `acuquiz stats` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use crate::app::App;

pub fn execute(app: &mut App, bank: Option<&str>) -> Result<()> {
    let session = app.session(None);

    let banks = match bank {
        Some(name) => vec![app.bank(name)?],
        None => app.catalog.load_available(),
    };

    let mut table = Table::new();
    table.set_header(vec!["Bank", "Entries", "Drawn", "Remaining", "Progress"]);
    for bank in &banks {
        let total = bank.total_count();
        let remaining = session.remaining_count(bank);
        let drawn = total - remaining;
        let progress = if total == 0 {
            0.0
        } else {
            drawn as f64 / total as f64 * 100.0
        };
        table.add_row(vec![
            Cell::new(&bank.display_name),
            Cell::new(total),
            Cell::new(drawn),
            Cell::new(remaining),
            Cell::new(format!("{progress:.1}%")),
        ]);
    }
    println!("{table}");
    println!("Progress file: {}", app.used_items_path().display());
    Ok(())
}
