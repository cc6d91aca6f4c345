use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use crate::playthrough::PlaythroughReport;
use crate::tester::ScenarioResult;

#[derive(Serialize)]
struct JsonReport<'a> {
    scenarios: &'a [ScenarioResult],
    playthrough: Option<&'a PlaythroughReport>,
}

#[allow(clippy::cast_precision_loss)]
fn success_rate(results: &[ScenarioResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    (passed as f64 / results.len() as f64) * 100.0
}

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    playthrough: Option<&PlaythroughReport>,
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Scenario Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "===========================".cyan())?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    writeln!(out, "Total scenarios: {total}")?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", (total - passed).to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            out,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;
        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
    }

    if let Some(report) = playthrough {
        writeln!(out)?;
        writeln!(out, "{}", "🌐 Live Playthrough".bright_blue().bold())?;
        writeln!(out, "{}", "==================".blue())?;
        writeln!(
            out,
            "Policy: {} | Seed: {} | Turns: {} | Chapter: {} | Stop: {:?}",
            report.policy.label(),
            report.seed,
            report.turns,
            report.chapter,
            report.stop
        )?;
        let m = &report.meters;
        writeln!(
            out,
            "Meters: canonity {} corruption {} sanity {} trust {} fate {}",
            m.canonity, m.corruption, m.sanity, m.trust, m.fate
        )?;
        if let Some(ending) = &report.ending {
            let marker = if ending.newly_collected { " (new)" } else { "" };
            writeln!(out, "Ending: {}{marker}", ending.id.green())?;
        }
        if let Some(error) = &report.error {
            writeln!(out, "Error: {}", error.red())?;
        }
        for line in &report.transcript {
            writeln!(out, "  {line}")?;
        }
    }
    Ok(())
}

pub fn generate_json_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    playthrough: Option<&PlaythroughReport>,
) -> Result<()> {
    let report = JsonReport {
        scenarios: results,
        playthrough,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    playthrough: Option<&PlaythroughReport>,
) -> Result<()> {
    writeln!(out, "# Canonfall Test Results\n")?;

    if results.is_empty() {
        writeln!(out, "_No scenarios executed._\n")?;
    } else {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        writeln!(out, "## Summary\n")?;
        writeln!(out, "- **Total scenarios**: {total}")?;
        writeln!(out, "- **Passed**: {passed}")?;
        writeln!(out, "- **Failed**: {}", total - passed)?;
        writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(results))?;

        writeln!(out, "## Detailed Results\n")?;
        for result in results {
            let status = if result.passed { "✅" } else { "❌" };
            writeln!(out, "### {} {} (seed {})\n", status, result.scenario_name, result.seed)?;
            writeln!(
                out,
                "- **Iterations**: {}/{} successful",
                result.successful_iterations, result.iterations_run
            )?;
            writeln!(out, "- **Average time**: {:?}", result.average_duration)?;
            if !result.failures.is_empty() {
                writeln!(out, "- **Failures**:")?;
                for failure in &result.failures {
                    writeln!(out, "  - {failure}")?;
                }
            }
            writeln!(out)?;
        }
    }

    if let Some(report) = playthrough {
        writeln!(out, "## Live Playthrough\n")?;
        writeln!(out, "| Policy | Seed | Turns | Chapter | Stop | Ending |")?;
        writeln!(out, "|---|---|---|---|---|---|")?;
        writeln!(
            out,
            "| {} | {} | {} | {} | {:?} | {} |\n",
            report.policy.label(),
            report.seed,
            report.turns,
            report.chapter,
            report.stop,
            report.ending.as_ref().map_or("-", |e| e.id.as_str())
        )?;
        if let Some(error) = &report.error {
            writeln!(out, "**Error**: {error}\n")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playthrough::{ChoicePolicy, StopReason};
    use canonfall_game::Meters;

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "smoke".to_string(),
            seed: 7,
            passed,
            iterations_run: 3,
            successful_iterations: if passed { 3 } else { 2 },
            failures: if passed {
                Vec::new()
            } else {
                vec!["Iteration 3 (seed 9): turn did not advance".to_string()]
            },
            average_duration: Duration::from_millis(4),
            performance_data: vec![Duration::from_millis(4)],
        }
    }

    fn sample_playthrough() -> PlaythroughReport {
        PlaythroughReport {
            policy: ChoicePolicy::First,
            seed: 7,
            turns: 4,
            chapter: "ACT I".to_string(),
            meters: Meters::default(),
            stop: StopReason::TurnLimit,
            ending: None,
            error: Some("The story service could not be reached.".to_string()),
            transcript: vec!["[1] NARRATOR: hello".to_string()],
        }
    }

    fn render(f: impl FnOnce(&mut dyn Write) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn console_report_lists_failures_and_playthrough() {
        colored::control::set_override(false);
        let playthrough = sample_playthrough();
        let text = render(|out| {
            generate_console_report(
                out,
                &[sample_result(true), sample_result(false)],
                Some(&playthrough),
                Duration::from_secs(1),
            )
        });
        assert!(text.contains("Total scenarios: 2"));
        assert!(text.contains("Success rate: 50.0%"));
        assert!(text.contains("turn did not advance"));
        assert!(text.contains("Live Playthrough"));
        assert!(text.contains("[1] NARRATOR: hello"));
    }

    #[test]
    fn json_report_nests_playthrough() {
        let text = render(|out| generate_json_report(out, &[sample_result(true)], None));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["scenarios"][0]["scenario_name"], "smoke");
        assert!(value["playthrough"].is_null());

        let playthrough = sample_playthrough();
        let text = render(|out| generate_json_report(out, &[], Some(&playthrough)));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["playthrough"]["policy"], "first");
        assert_eq!(value["playthrough"]["stop"], "TurnLimit");
    }

    #[test]
    fn markdown_report_handles_empty_results() {
        let text = render(|out| generate_markdown_report(out, &[], None));
        assert!(text.contains("# Canonfall Test Results"));
        assert!(text.contains("No scenarios executed"));
    }

    #[test]
    fn markdown_report_has_playthrough_table() {
        let playthrough = sample_playthrough();
        let text =
            render(|out| generate_markdown_report(out, &[sample_result(false)], Some(&playthrough)));
        assert!(text.contains("### ❌ smoke (seed 7)"));
        assert!(text.contains("| first | 7 | 4 | ACT I | TurnLimit | - |"));
    }
}
