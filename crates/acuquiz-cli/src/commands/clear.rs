//! The `acuquiz clear` command.

use anyhow::{Context, Result};

use crate::app::App;

pub fn execute(app: &mut App, bank: &str) -> Result<()> {
    let bank = app.bank(bank)?;
    let mut session = app.session(None);
    let before = session.remaining_count(&bank);

    session
        .clear_used_items(&bank.key)
        .with_context(|| format!("failed to write {}", app.used_items_path().display()))?;

    println!(
        "Cleared {}: {} of {} entries available again.",
        bank.display_name,
        bank.total_count() - before,
        bank.total_count()
    );
    Ok(())
}
