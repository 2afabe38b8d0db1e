use anyhow::Result;
use challenge_gen::{FileSink, LogLevel, RuleOutcome, RunOutcome};
use colored::Colorize;
use serde_json::json;
use std::io::Write;

pub fn generate_console_summary(
    out: &mut dyn Write,
    outcome: &RunOutcome,
    sink: &FileSink,
) -> Result<()> {
    writeln!(out, "{}", "📋 Run log".bright_yellow().bold())?;
    writeln!(out, "{}", "-".repeat(30).yellow())?;
    for entry in outcome.log.entries() {
        let tag = match entry.level {
            LogLevel::Info => "info".green(),
            LogLevel::Warning => "warn".yellow(),
            LogLevel::Fatal => "fatal".red().bold(),
        };
        writeln!(out, "[{tag:>5}] {}", entry.message)?;
    }

    if !outcome.report.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", "📐 Rules".bright_yellow().bold())?;
        writeln!(out, "{}", "-".repeat(30).yellow())?;
        for row in outcome.report.rows() {
            let outcome_text = match &row.outcome {
                RuleOutcome::Generated => row.outcome.to_string().green(),
                RuleOutcome::NoParticipants => row.outcome.to_string().yellow(),
                RuleOutcome::Failed(_) => row.outcome.to_string().red(),
            };
            writeln!(
                out,
                "  {:24} {:22} matched {:>4}  generated {:>4}  {outcome_text}",
                row.rule, row.model, row.matched, row.generated
            )?;
        }
    }

    writeln!(out)?;
    if outcome.succeeded() {
        writeln!(
            out,
            "✅ {} challenges written to {}",
            outcome.instances.len().to_string().bright_green().bold(),
            sink.instances.display()
        )?;
        writeln!(out, "   report: {}", sink.report.display())?;
        if let Some(selections) = &outcome.selections {
            writeln!(
                out,
                "   recommendations: {} ({} participants)",
                sink.recommendations.display(),
                selections.len()
            )?;
        }
    } else {
        writeln!(
            out,
            "❌ Run stopped during {}; nothing was written",
            outcome.stage.to_string().red().bold()
        )?;
    }
    Ok(())
}

pub fn generate_json_summary(out: &mut dyn Write, outcome: &RunOutcome) -> Result<()> {
    let summary = json!({
        "stage": outcome.stage,
        "succeeded": outcome.succeeded(),
        "instances": outcome.instances.len(),
        "rules": outcome.report.rows(),
        "recommendedParticipants": outcome.selections.as_ref().map(challenge_gen::SelectionMap::len),
        "log": outcome.log.entries(),
    });
    serde_json::to_writer_pretty(&mut *out, &summary)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use challenge_gen::{GenerationReport, ReportRow, RunLog, RunStage};

    fn outcome(stage: RunStage) -> RunOutcome {
        let mut report = GenerationReport::new();
        report.push(ReportRow {
            rule: "WalkMore".to_string(),
            model: "trip".to_string(),
            matched: 3,
            generated: 3,
            outcome: RuleOutcome::Generated,
        });
        let mut log = RunLog::default();
        log.info("loaded 1 rules");
        RunOutcome {
            stage,
            instances: Vec::new(),
            report,
            selections: None,
            log,
        }
    }

    #[test]
    fn console_summary_lists_rules_and_destination() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        generate_console_summary(&mut buffer, &outcome(RunStage::Done), &FileSink::default()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("WalkMore"));
        assert!(text.contains("challenge.json"));
        assert!(text.contains("loaded 1 rules"));
    }

    #[test]
    fn console_summary_flags_failed_runs() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        generate_console_summary(&mut buffer, &outcome(RunStage::Error), &FileSink::default()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("nothing was written"));
    }

    #[test]
    fn json_summary_is_machine_readable() {
        let mut buffer = Vec::new();
        generate_json_summary(&mut buffer, &outcome(RunStage::Done)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["stage"], "Done");
        assert_eq!(value["rules"][0]["rule"], "WalkMore");
        assert_eq!(value["log"][0]["level"], "info");
    }
}
