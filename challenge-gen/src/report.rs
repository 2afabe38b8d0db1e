//! Per-rule audit trail accumulated during a run and flushed once.
use serde::Serialize;
use std::fmt;

use crate::constants::REPORT_COLUMNS;

/// How a rule fared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleOutcome {
    Generated,
    NoParticipants,
    Failed(String),
}

impl fmt::Display for RuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generated => f.write_str("generated"),
            Self::NoParticipants => f.write_str("no participants"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub rule: String,
    pub model: String,
    pub matched: usize,
    pub generated: usize,
    pub outcome: RuleOutcome,
}

/// Append-only list of report rows, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GenerationReport {
    rows: Vec<ReportRow>,
}

impl GenerationReport {
    #[must_use]
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn push(&mut self, row: ReportRow) {
        self.rows.push(row);
    }

    #[must_use]
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row.outcome, RuleOutcome::Failed(_)))
            .count()
    }

    #[must_use]
    pub fn generated_total(&self) -> usize {
        self.rows.iter().map(|row| row.generated).sum()
    }

    /// Semicolon-delimited table with a header row.
    #[must_use]
    pub fn to_table(&self) -> String {
        let mut out = REPORT_COLUMNS.join(";");
        out.push('\n');
        for row in &self.rows {
            out.push_str(&format!(
                "{};{};{};{};{}\n",
                row.rule, row.model, row.matched, row.generated, row.outcome
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lists_rows_under_header() {
        let mut report = GenerationReport::new();
        report.push(ReportRow {
            rule: "WalkMore".into(),
            model: "trip".into(),
            matched: 3,
            generated: 3,
            outcome: RuleOutcome::Generated,
        });
        report.push(ReportRow {
            rule: "Ghost".into(),
            model: "mystery".into(),
            matched: 2,
            generated: 0,
            outcome: RuleOutcome::Failed("undefined challenge".into()),
        });
        assert_eq!(
            report.to_table(),
            "RULE;MODEL;MATCHED;GENERATED;OUTCOME\n\
             WalkMore;trip;3;3;generated\n\
             Ghost;mystery;2;0;failed: undefined challenge\n"
        );
        assert_eq!(report.failed(), 1);
        assert_eq!(report.generated_total(), 3);
    }

    #[test]
    fn empty_report_is_just_the_header() {
        let report = GenerationReport::new();
        assert!(report.is_empty());
        assert_eq!(report.to_table(), "RULE;MODEL;MATCHED;GENERATED;OUTCOME\n");
        assert_eq!(RuleOutcome::NoParticipants.to_string(), "no participants");
    }
}
