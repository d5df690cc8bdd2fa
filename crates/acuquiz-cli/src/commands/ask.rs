//! The `acuquiz ask` command: AI-examiner practice.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use acuquiz_core::gateway::{GradeRequest, GradingGateway};
use acuquiz_core::grading::{choose_askable_entry, GradeResult};
use acuquiz_core::model::{Bank, FieldLabel};
use acuquiz_providers::config::{create_provider, load_settings};

use crate::app::App;

pub struct AskOptions {
    pub bank: String,
    pub entry: Option<String>,
    pub label: Option<String>,
    pub rounds: usize,
    pub offline: bool,
    pub seed: Option<u64>,
}

pub async fn execute(app: &mut App, opts: AskOptions) -> Result<()> {
    let bank = app.bank(&opts.bank)?;
    let label = opts
        .label
        .as_deref()
        .map(str::parse::<FieldLabel>)
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let mut gateway = if opts.offline {
        GradingGateway::offline()
    } else {
        let settings = load_settings(&app.settings_path());
        if settings.is_valid() {
            let timeout = app.config.ai_timeout();
            let provider = create_provider(&settings, timeout)?;
            GradingGateway::new(Some(provider), settings.gateway_config(timeout))
        } else {
            println!("AI examiner not configured (see `acuquiz settings`); using local grading.");
            GradingGateway::offline()
        }
    };
    let mut rng = match opts.seed {
        Some(seed) => {
            gateway = gateway.with_seed(seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let plan = Plan {
        entry: opts.entry.as_deref(),
        label,
        rounds: opts.rounds,
    };
    let results = run(&mut gateway, &bank, &plan, &mut rng, stdin.lock(), stdout.lock()).await?;

    if !results.is_empty() {
        let passed = results.iter().filter(|r| r.pass).count();
        let mean = results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64;
        println!("\n{passed}/{} passed, mean score {mean:.1}", results.len());
    }
    Ok(())
}

/// What to ask.
pub struct Plan<'a> {
    pub entry: Option<&'a str>,
    pub label: Option<FieldLabel>,
    pub rounds: usize,
}

/// Ask up to `plan.rounds` questions, reading one answer line each.
/// Stops early at end of input.
pub async fn run<R: BufRead, W: Write>(
    gateway: &mut GradingGateway,
    bank: &Bank,
    plan: &Plan<'_>,
    rng: &mut StdRng,
    input: R,
    mut out: W,
) -> Result<Vec<GradeResult>> {
    let fixed = match plan.entry {
        Some(name) => Some(
            bank.entry(name)
                .with_context(|| format!("no entry '{name}' in {}", bank.display_name))?,
        ),
        None => None,
    };

    let mut lines = input.lines();
    let mut results = Vec::new();
    for round in 1..=plan.rounds {
        let entry = match fixed {
            Some(entry) => entry,
            None => choose_askable_entry(bank, rng)
                .with_context(|| format!("{} has no entry with fields", bank.display_name))?,
        };

        let question = gateway.build_question(entry, plan.label).await;
        writeln!(out, "\n[{round}/{}] {}", plan.rounds, question.question)?;
        write!(out, "> ")?;
        out.flush()?;

        let Some(answer) = lines.next().transpose()? else {
            break;
        };

        let request = GradeRequest::for_entry(&question, entry, answer.trim());
        let result = gateway.grade(&request).await;
        print_result(&mut out, &result)?;
        results.push(result);
    }
    Ok(results)
}

fn print_result<W: Write>(out: &mut W, result: &GradeResult) -> Result<()> {
    let verdict = if result.pass { "PASS" } else { "FAIL" };
    writeln!(out, "{verdict} {:.1}/100", result.score)?;
    if !result.feedback.is_empty() {
        writeln!(out, "  {}", result.feedback)?;
    }
    if !result.failure_reason.is_empty() {
        writeln!(out, "  Missing: {}", result.failure_reason)?;
    }
    writeln!(out, "  Answer: {}", result.model_answer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use acuquiz_core::model::Entry;

    fn bank() -> Bank {
        let mut bank = Bank::new("k.txt", "测试经");
        let mut entry = Entry::new("少商");
        entry.location = "拇指末节桡侧".into();
        bank.upsert_entry(entry);
        bank.upsert_entry(Entry::new("空穴"));
        bank
    }

    #[tokio::test]
    async fn offline_round_uses_template_and_precheck() {
        let bank = bank();
        let mut gateway = GradingGateway::offline().with_seed(1);
        let mut rng = StdRng::seed_from_u64(1);
        let plan = Plan {
            entry: None,
            label: Some(FieldLabel::Location),
            rounds: 1,
        };
        let mut out = Vec::new();

        let results = run(&mut gateway, &bank, &plan, &mut rng, "拇指末节桡侧\n".as_bytes(), &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 100.0);
        assert!(text.contains("关于【少商】的定位？"));
        assert!(text.contains("PASS 100.0/100"));
    }

    #[tokio::test]
    async fn wrong_answer_fails_and_end_of_input_stops() {
        let bank = bank();
        let mut gateway = GradingGateway::offline();
        let mut rng = StdRng::seed_from_u64(2);
        let plan = Plan {
            entry: Some("少商"),
            label: Some(FieldLabel::Location),
            rounds: 3,
        };
        let mut out = Vec::new();

        let results = run(&mut gateway, &bank, &plan, &mut rng, "足背\n".as_bytes(), &mut out)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(!results[0].pass);
        assert!(String::from_utf8(out).unwrap().contains("Answer: 拇指末节桡侧"));
    }

    #[tokio::test]
    async fn unknown_entry_is_an_error() {
        let bank = bank();
        let mut gateway = GradingGateway::offline();
        let mut rng = StdRng::seed_from_u64(3);
        let plan = Plan {
            entry: Some("不存在"),
            label: None,
            rounds: 1,
        };
        let err = run(&mut gateway, &bank, &plan, &mut rng, "".as_bytes(), Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("不存在"));
    }
}
