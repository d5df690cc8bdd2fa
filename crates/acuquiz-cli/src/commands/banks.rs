//! The `acuquiz banks` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use crate::app::App;

pub fn execute(app: &mut App) -> Result<()> {
    let session = app.session(None);
    let banks = app.catalog.load_available();
    if banks.is_empty() {
        anyhow::bail!("no usable bank found");
    }

    let mut table = Table::new();
    table.set_header(vec!["Key", "Name", "Entries", "Sections", "Remaining"]);
    for bank in &banks {
        table.add_row(vec![
            Cell::new(&bank.key),
            Cell::new(&bank.display_name),
            Cell::new(bank.total_count()),
            Cell::new(bank.groups.len()),
            Cell::new(session.remaining_count(bank)),
        ]);
    }
    println!("{table}");
    Ok(())
}
