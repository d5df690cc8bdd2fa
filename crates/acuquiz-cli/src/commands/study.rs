//! The `acuquiz study` command: browse entries without drawing them.

use anyhow::{Context, Result};

use acuquiz_core::study::{format_entry_details, group_index};

use crate::app::App;

pub fn execute(
    app: &mut App,
    bank: &str,
    entry: Option<&str>,
    group: Option<&str>,
    groups: bool,
) -> Result<()> {
    let bank = app.bank(bank)?;

    if groups {
        let index = group_index(&bank);
        if index.is_empty() {
            println!("{} has no section headers.", bank.display_name);
        }
        for (title, first) in index {
            println!("{title} -> {}", first.unwrap_or("(no entries)"));
        }
        return Ok(());
    }

    let target = match (entry, group) {
        (Some(name), _) => Some(name),
        (None, Some(title)) => Some(
            bank.group_target(title)
                .with_context(|| format!("no section '{title}' with entries in {}", bank.display_name))?,
        ),
        (None, None) => None,
    };

    match target {
        Some(name) => {
            let entry = bank
                .entry(name)
                .with_context(|| format!("no entry '{name}' in {}", bank.display_name))?;
            println!("{}", format_entry_details(entry));
        }
        None => {
            println!("{} ({} entries)", bank.display_name, bank.total_count());
            for (i, name) in bank.entry_names.iter().enumerate() {
                println!("{:>4}. {name}", i + 1);
            }
        }
    }
    Ok(())
}
