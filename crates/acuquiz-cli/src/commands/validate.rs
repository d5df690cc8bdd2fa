//! The `acuquiz validate` command.

use std::path::PathBuf;

use anyhow::Result;

use acuquiz_core::catalog::{BankCatalog, BankRegistry, BankSource};

use crate::app::App;

/// Parse each bank and report problems. With no paths, the configured
/// registry is checked.
pub fn execute(app: &mut App, paths: &[PathBuf]) -> Result<()> {
    let mut files;
    let catalog = if paths.is_empty() {
        &mut app.catalog
    } else {
        let registry = BankRegistry::new(paths.iter().map(|p| BankSource::from_file(p)).collect());
        files = BankCatalog::new(registry);
        &mut files
    };

    let keys: Vec<String> = catalog
        .list_available_bank_keys()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut failures = 0;
    let mut total_warnings = 0;

    for key in &keys {
        let bank = match catalog.get_bank(key) {
            Ok(bank) => bank,
            Err(e) => {
                println!("{key}: ERROR: {e}");
                failures += 1;
                continue;
            }
        };

        println!(
            "Bank: {} ({} entries, {} sections)",
            bank.display_name,
            bank.total_count(),
            bank.groups.len()
        );
        if bank.is_empty() {
            println!("  ERROR: no entries found");
            failures += 1;
            continue;
        }

        let mut warnings = Vec::new();
        if !bank.has_group_headers {
            warnings.push("no section headers".to_string());
        }
        for name in &bank.entry_names {
            let Some(entry) = bank.entry(name) else {
                continue;
            };
            if entry.location.trim().is_empty() && entry.treatment.trim().is_empty() {
                warnings.push(format!("[{name}] has no location or treatment"));
            }
        }
        for group in bank.groups.iter().filter(|g| g.first_entry.is_none()) {
            warnings.push(format!("section '{}' has no entries", group.title));
        }

        for w in &warnings {
            println!("  WARNING: {w}");
        }
        total_warnings += warnings.len();
    }

    if failures > 0 {
        anyhow::bail!("{failures} bank(s) failed to load");
    }
    if total_warnings == 0 {
        println!("All banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }
    Ok(())
}
