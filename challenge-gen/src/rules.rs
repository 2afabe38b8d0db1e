//! Rule definition sources: the semicolon-delimited rule table and its writer.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::constants::{RULE_COLUMNS, RULE_FILE_EXTENSION};
use crate::error::GenerationError;
use crate::numbers::format_number;

/// Goal family a rule asks the participant to reach.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    /// Reach an absolute numeric target on a counter
    Numeric,
    /// Improve a counter by a percentage over the participant's baseline
    Percentage,
    /// Reach a position in a leaderboard
    Leaderboard,
    /// Earn more badges in a collection
    Badge,
    /// Anything else, kept verbatim so it survives a round trip
    #[serde(untagged)]
    Other(String),
}

impl GoalType {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "numeric" | "numerictarget" | "absolute" | "absoluteincrement" => Self::Numeric,
            "percentage" | "percentageincrement" => Self::Percentage,
            "leaderboard" | "leaderboardposition" => Self::Leaderboard,
            "badge" | "badgecount" | "nextbadge" => Self::Badge,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Numeric => "numeric",
            Self::Percentage => "percentage",
            Self::Leaderboard => "leaderboard",
            Self::Badge => "badge",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Goal target: a scalar, or a symbolic value such as a leaderboard position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GoalTarget {
    Numeric(f64),
    Symbolic(String),
}

impl GoalTarget {
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Numeric(value) => Some(*value),
            Self::Symbolic(_) => None,
        }
    }

    /// JSON representation used in challenge fields.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Numeric(value) => serde_json::Value::from(*value),
            Self::Symbolic(raw) => serde_json::Value::String(raw.clone()),
        }
    }
}

impl fmt::Display for GoalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(value) => f.write_str(&format_number(*value)),
            Self::Symbolic(raw) => f.write_str(raw),
        }
    }
}

/// One row of the rule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    pub name: String,
    pub model_name: String,
    pub goal_type: GoalType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<GoalTarget>,
    pub bonus: f64,
    #[serde(default)]
    pub point_type: String,
    #[serde(default)]
    pub baseline_variable: String,
    #[serde(default)]
    pub selection_criteria_points: String,
    #[serde(default)]
    pub selection_criteria_badges: String,
}

/// Ordered rule table, in source order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleSet(pub Vec<RuleRecord>);

impl RuleSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Parse the semicolon-delimited rule table. The first line is the header.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::MalformedInput`] when a row is too short, its
    /// bonus is not numeric, or a rule name repeats.
    pub fn parse(source: &str) -> Result<Self, GenerationError> {
        let mut rules = Vec::new();
        let mut seen = HashSet::new();

        for (index, line) in source.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let rule = parse_row(line, index + 1)?;
            if !seen.insert(rule.name.clone()) {
                return Err(GenerationError::malformed(format!(
                    "line {}: duplicate rule name {}",
                    index + 1,
                    rule.name
                )));
            }
            rules.push(rule);
        }

        log::debug!("rows in rule source: {}", rules.len());
        Ok(Self(rules))
    }

    /// Load a rule table from a `.csv` file.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::MalformedInput`] when no path is given, the
    /// extension is not `.csv`, the file cannot be read, or a row is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, GenerationError> {
        let Some(path) = path else {
            log::error!("rule source must be provided");
            return Err(GenerationError::malformed("rule source must be provided"));
        };
        if !path.to_string_lossy().ends_with(RULE_FILE_EXTENSION) {
            log::error!("rule source {} is not a csv file", path.display());
            return Err(GenerationError::malformed(format!(
                "rule source {} must be a {RULE_FILE_EXTENSION} file",
                path.display()
            )));
        }
        let source = std::fs::read_to_string(path).map_err(|err| {
            GenerationError::malformed(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::parse(&source)
    }

    /// Render the rule table with the same header and column order it was read with.
    #[must_use]
    pub fn to_table(&self) -> String {
        let mut out = RULE_COLUMNS.join(";");
        out.push('\n');
        for rule in &self.0 {
            let target = rule.target.as_ref().map(ToString::to_string);
            let cells = [
                rule.name.as_str(),
                rule.model_name.as_str(),
                rule.goal_type.as_str(),
                target.as_deref().unwrap_or_default(),
                &format_number(rule.bonus),
                rule.point_type.as_str(),
                "",
                rule.baseline_variable.as_str(),
                rule.selection_criteria_points.as_str(),
                rule.selection_criteria_badges.as_str(),
            ];
            for cell in cells {
                out.push_str(cell);
                out.push(';');
            }
            out.push('\n');
        }
        out
    }

    /// Write the rule table to disk.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), GenerationError> {
        std::fs::write(path, self.to_table()).map_err(|err| GenerationError::io(path, err))
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&RuleRecord> {
        self.0.iter().find(|rule| rule.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RuleRecord> {
        self.0.iter()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a RuleRecord;
    type IntoIter = std::slice::Iter<'a, RuleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn clean_cell(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}

fn parse_row(line: &str, line_no: usize) -> Result<RuleRecord, GenerationError> {
    let cells: Vec<&str> = line.split(';').map(clean_cell).collect();
    if cells.len() < 5 {
        return Err(GenerationError::malformed(format!(
            "line {line_no}: expected at least 5 columns, found {}",
            cells.len()
        )));
    }
    let cell = |idx: usize| cells.get(idx).copied().unwrap_or_default().to_string();

    let goal_type = GoalType::parse(cells[2]);
    let target = parse_target(cells[3], &goal_type);
    let bonus = cells[4]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| {
            GenerationError::malformed(format!(
                "line {line_no}: bonus {:?} is not a finite number",
                cells[4]
            ))
        })?;

    Ok(RuleRecord {
        name: cell(0),
        model_name: cell(1),
        goal_type,
        target,
        bonus,
        point_type: cell(5),
        baseline_variable: cell(7),
        selection_criteria_points: cell(8),
        selection_criteria_badges: cell(9),
    })
}

fn parse_target(raw: &str, goal_type: &GoalType) -> Option<GoalTarget> {
    if raw.is_empty() {
        return None;
    }
    if *goal_type == GoalType::Leaderboard {
        return Some(GoalTarget::Symbolic(raw.to_string()));
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(GoalTarget::Numeric(value)),
        _ => {
            log::debug!("target {raw:?} is not a number, keeping it symbolic");
            Some(GoalTarget::Symbolic(raw.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "NAME;TYPE;GOAL_TYPE;TARGET;BONUS;POINT_TYPE;DIFFICULTY;BASELINE_VARIABLE;SELECTION_CRITERIA_POINTS;SELECTION_CRITERIA_BADGES";

    fn table(rows: &[&str]) -> String {
        let mut out = HEADER.to_string();
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    fn temp_path(label: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "challenge-gen-rules-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    #[test]
    fn parses_quoted_row_with_trailing_cells() {
        let rules =
            RuleSet::parse(&table(&[r#""WalkMore";"trip";"numeric";"50";"10";"Walk";"";"";"";"";""#]))
                .unwrap();
        assert_eq!(rules.len(), 1);
        let rule = rules.get_by_name("WalkMore").unwrap();
        assert_eq!(rule.model_name, "trip");
        assert_eq!(rule.goal_type, GoalType::Numeric);
        assert_eq!(rule.target, Some(GoalTarget::Numeric(50.0)));
        assert!((rule.bonus - 10.0).abs() < f64::EPSILON);
        assert_eq!(rule.point_type, "Walk");
        assert!(rule.selection_criteria_points.is_empty());
    }

    #[test]
    fn leaderboard_targets_stay_symbolic() {
        let rules = RuleSet::parse(&table(&["Top;leaderboardPosition;leaderboard;1;50;green leaves"]))
            .unwrap();
        let rule = rules.get_by_name("Top").unwrap();
        assert_eq!(rule.target, Some(GoalTarget::Symbolic("1".to_string())));
    }

    #[test]
    fn non_numeric_target_is_kept_raw() {
        let rules = RuleSet::parse(&table(&["Odd;trip;numeric;first;5;Bus"])).unwrap();
        assert_eq!(
            rules.0[0].target,
            Some(GoalTarget::Symbolic("first".to_string()))
        );
    }

    #[test]
    fn missing_optional_columns_leave_fields_empty() {
        let rules = RuleSet::parse(&table(&["Short;trip;numeric;;5"])).unwrap();
        let rule = &rules.0[0];
        assert_eq!(rule.target, None);
        assert!(rule.point_type.is_empty());
        assert!(rule.baseline_variable.is_empty());
        assert!(rule.selection_criteria_badges.is_empty());
    }

    #[test]
    fn bad_bonus_is_malformed() {
        let err = RuleSet::parse(&table(&["Bad;trip;numeric;5;lots;Walk"])).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedInput { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn non_finite_bonus_is_malformed() {
        for bonus in ["NaN", "inf", "-infinity"] {
            let row = format!("Odd;trip;numeric;5;{bonus};Walk");
            let err = RuleSet::parse(&table(&[row.as_str()])).unwrap_err();
            assert!(matches!(err, GenerationError::MalformedInput { .. }), "{bonus}");
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = RuleSet::parse(&table(&["Same;trip;numeric;5;1;Walk", "Same;trip;numeric;6;1;Bus"]))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let rules = RuleSet::parse(&table(&["", "A;trip;numeric;5;1;Walk", "   "])).unwrap();
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn load_rejects_missing_and_non_csv_sources() {
        assert!(matches!(
            RuleSet::load(None),
            Err(GenerationError::MalformedInput { .. })
        ));
        assert!(matches!(
            RuleSet::load(Some(Path::new("rules.txt"))),
            Err(GenerationError::MalformedInput { .. })
        ));
        assert!(matches!(
            RuleSet::load(Some(Path::new("/definitely/not/here.csv"))),
            Err(GenerationError::MalformedInput { .. })
        ));
    }

    #[test]
    fn written_table_parses_back_to_equal_rules() {
        let rules = RuleSet::parse(&table(&[
            "WalkMore;trip;numeric;50;10;Walk_Km;;;Walk_Km > 3;",
            "Top3;leaderboardPosition;leaderboard;3;25.5;green leaves;;;;",
            "Greener;percentageIncrement;percentage;0.15;40;Bike_Km;;Bike_Km;;green leaves:King",
            "Mystery;someModel;guess;x;1;;;;;",
        ]))
        .unwrap();
        let written = rules.to_table();
        assert!(written.starts_with(HEADER));
        let reparsed = RuleSet::parse(&written).unwrap();
        assert_eq!(reparsed, rules);
    }

    #[test]
    fn save_and_load_round_trip_through_disk() {
        let path = temp_path("save").with_extension("csv");
        let rules = RuleSet::parse(&table(&["A;trip;numeric;5;1;Walk;;;;"])).unwrap();
        rules.save(&path).unwrap();
        let loaded = RuleSet::load(Some(&path)).unwrap();
        assert_eq!(loaded, rules);
    }

    #[test]
    fn goal_type_aliases_normalize() {
        assert_eq!(GoalType::parse("Leaderboard-Position"), GoalType::Leaderboard);
        assert_eq!(GoalType::parse("numeric-target"), GoalType::Numeric);
        assert_eq!(GoalType::parse("nextBadge"), GoalType::Badge);
        assert_eq!(GoalType::parse("guess"), GoalType::Other("guess".to_string()));
    }
}
