//! The `acuquiz quiz` command.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use acuquiz_core::error::SessionError;
use acuquiz_core::report::QuizResult;
use acuquiz_core::session::QuizSession;
use acuquiz_core::study::format_entry_details;

use crate::app::App;

pub fn execute(
    app: &mut App,
    bank: &str,
    count: Option<usize>,
    no_save: bool,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let bank = app.bank(bank)?;
    let quantity = count.unwrap_or(app.config.default_quantity);

    let mut session = app.session(seed);
    session.set_bank(bank.clone());

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let result = run(&mut session, quantity, stdin.lock(), stdout.lock())?;
    let Some(result) = result else {
        return Ok(());
    };

    if no_save {
        println!("Progress not saved (--no-save).");
    } else {
        session.save_progress().with_context(|| {
            format!("failed to save progress to {}", app.used_items_path().display())
        })?;
        println!("Progress saved.");
    }
    println!("{}", session.bank_stats(&bank));

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}

/// Drive one batch over `input`, one command per line.
///
/// `y` marks the live item correct, `n` wrong, `s` shows its details and `q`
/// (or end of input) stops early. Returns `None` when nothing could be drawn.
pub fn run<R: BufRead, W: Write>(
    session: &mut QuizSession,
    quantity: usize,
    input: R,
    mut out: W,
) -> Result<Option<QuizResult>> {
    let bank = session.bank().cloned().context("no bank selected")?;
    writeln!(out, "{}", session.bank_stats(&bank))?;

    match session.start_quiz(quantity) {
        Ok(drawn) => writeln!(
            out,
            "Drawing {drawn} item(s). Enter y = correct, n = wrong, s = show details, q = stop."
        )?,
        Err(SessionError::NoRemainingItems) => {
            writeln!(
                out,
                "Every entry of {} has been drawn. Run `acuquiz clear {}` to start over.",
                bank.display_name, bank.key
            )?;
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    let mut lines = input.lines();
    'items: while let Some(name) = session.next_item() {
        let (index, total) = session.progress();
        writeln!(out, "\n[{index}/{total}] {name}")?;

        loop {
            write!(out, "> ")?;
            out.flush()?;
            let Some(line) = lines.next().transpose()? else {
                break 'items;
            };
            match line.trim() {
                "y" | "对" => {
                    session.mark_correct()?;
                    break;
                }
                "n" | "错" => {
                    session.mark_wrong()?;
                    break;
                }
                "s" | "?" => {
                    if let Some(entry) = session.current_item_detail() {
                        writeln!(out, "{}", format_entry_details(entry))?;
                    }
                }
                "q" => break 'items,
                other => writeln!(out, "Unrecognized input '{other}'.")?,
            }
        }
    }

    session.finish_quiz()?;
    let result = session.quiz_result()?;

    writeln!(out, "\nResult: {}", result.bank_name)?;
    writeln!(
        out,
        "  Answered {}/{}, correct {}, wrong {}",
        result.correct + result.wrong,
        result.total,
        result.correct,
        result.wrong
    )?;
    writeln!(out, "  Accuracy: {}", result.formatted_accuracy())?;
    writeln!(out, "  Time: {}", result.formatted_time())?;

    let wrong = session.wrong_item_details();
    if !wrong.is_empty() {
        writeln!(out, "\nReview:")?;
        for entry in wrong {
            writeln!(out, "\n{}", format_entry_details(entry))?;
        }
    }

    Ok(Some(result))
}
