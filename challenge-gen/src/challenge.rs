//! Challenge instances and the template catalogue that fills their fields.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{DEFAULT_BONUS_POINT_TYPE, DEFAULT_PERIOD_NAME};
use crate::error::GenerationError;
use crate::numbers::{ceil_f64_to_i64, count_to_f64};
use crate::participant::ParticipantSnapshot;
use crate::recommend::ModeSelection;
use crate::rules::{GoalTarget, GoalType, RuleRecord};
use crate::window::TimeWindow;

/// A concrete, time-bounded challenge for one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeInstance {
    pub name: String,
    pub model_name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_completed: Option<i64>,
}

impl ChallengeInstance {
    #[must_use]
    pub fn new(
        template_key: &str,
        player_id: &str,
        model: ChallengeModel,
        fields: Map<String, Value>,
        window: &TimeWindow,
    ) -> Self {
        Self {
            name: format!("{template_key}_{player_id}"),
            model_name: model.name().to_string(),
            fields,
            start: window.start,
            end: window.end,
            completed: false,
            date_completed: None,
        }
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Values shared by every template in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDefaults {
    pub bonus_point_type: String,
    pub period_name: String,
    /// Window the participant baselines are read from.
    pub history: TimeWindow,
}

impl TemplateDefaults {
    #[must_use]
    pub fn new(history: TimeWindow) -> Self {
        Self {
            bonus_point_type: DEFAULT_BONUS_POINT_TYPE.to_string(),
            period_name: DEFAULT_PERIOD_NAME.to_string(),
            history,
        }
    }
}

/// Challenge models understood by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeModel {
    AbsoluteIncrement,
    Trip,
    PercentageIncrement,
    LeaderboardPosition,
    NextBadge,
}

impl ChallengeModel {
    pub const ALL: [Self; 5] = [
        Self::AbsoluteIncrement,
        Self::Trip,
        Self::PercentageIncrement,
        Self::LeaderboardPosition,
        Self::NextBadge,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AbsoluteIncrement => "absoluteIncrement",
            Self::Trip => "trip",
            Self::PercentageIncrement => "percentageIncrement",
            Self::LeaderboardPosition => "leaderboardPosition",
            Self::NextBadge => "nextBadge",
        }
    }

    #[must_use]
    pub fn accepts(self, goal_type: &GoalType) -> bool {
        match self {
            Self::AbsoluteIncrement | Self::Trip => *goal_type == GoalType::Numeric,
            Self::PercentageIncrement => *goal_type == GoalType::Percentage,
            Self::LeaderboardPosition => *goal_type == GoalType::Leaderboard,
            Self::NextBadge => *goal_type == GoalType::Badge,
        }
    }

    /// Template for a rule, by model name and goal type.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::UndefinedChallenge`] when the model is unknown
    /// or does not accept the rule's goal type.
    pub fn resolve(rule: &RuleRecord) -> Result<Self, GenerationError> {
        Self::ALL
            .into_iter()
            .find(|model| model.name().eq_ignore_ascii_case(rule.model_name.trim()))
            .filter(|model| model.accepts(&rule.goal_type))
            .ok_or_else(|| undefined(rule))
    }

    /// Fields for a rule-driven instance, in template order.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::UndefinedChallenge`] when the rule lacks the
    /// target this model needs.
    pub fn rule_fields(
        self,
        rule: &RuleRecord,
        participant: &ParticipantSnapshot,
        defaults: &TemplateDefaults,
    ) -> Result<Map<String, Value>, GenerationError> {
        let mut fields = Map::new();
        match self {
            Self::AbsoluteIncrement | Self::Trip => {
                let target = numeric_target(rule)?;
                fields.insert("counterName".into(), rule.point_type.clone().into());
                fields.insert("periodName".into(), defaults.period_name.clone().into());
                fields.insert("target".into(), target.into());
            }
            Self::PercentageIncrement => {
                let percentage = numeric_target(rule)?;
                let variable = if rule.baseline_variable.is_empty() {
                    &rule.point_type
                } else {
                    &rule.baseline_variable
                };
                let baseline = participant.baseline(variable, &defaults.history);
                fields.insert("counterName".into(), rule.point_type.clone().into());
                fields.insert("periodName".into(), defaults.period_name.clone().into());
                fields.insert("baseline".into(), baseline.into());
                fields.insert("percentage".into(), percentage.into());
                fields.insert(
                    "target".into(),
                    ceil_f64_to_i64(baseline * (1.0 + percentage)).into(),
                );
            }
            Self::LeaderboardPosition => {
                let target = rule.target.as_ref().ok_or_else(|| undefined(rule))?;
                fields.insert("weekClassificationName".into(), rule.point_type.clone().into());
                fields.insert("target".into(), target.to_json());
            }
            Self::NextBadge => {
                let more = numeric_target(rule)?;
                let initial = participant.badge_count(&rule.point_type);
                fields.insert("badgeCollectionName".into(), rule.point_type.clone().into());
                fields.insert("initialBadgeNum".into(), initial.into());
                fields.insert(
                    "target".into(),
                    ceil_f64_to_i64(count_to_f64(initial) + more).into(),
                );
            }
        }
        fields.insert("bonusPointType".into(), defaults.bonus_point_type.clone().into());
        fields.insert("bonusScore".into(), rule.bonus.into());
        Ok(fields)
    }

    /// Fields for a recommendation-driven instance.
    #[must_use]
    pub fn recommendation_fields(
        selection: &ModeSelection,
        bonus: f64,
        defaults: &TemplateDefaults,
    ) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("counterName".into(), selection.counter_name().into());
        fields.insert("periodName".into(), defaults.period_name.clone().into());
        fields.insert("baseline".into(), selection.baseline.into());
        fields.insert("target".into(), selection.target.into());
        fields.insert("bonusPointType".into(), defaults.bonus_point_type.clone().into());
        fields.insert("bonusScore".into(), bonus.into());
        fields
    }
}

fn undefined(rule: &RuleRecord) -> GenerationError {
    GenerationError::UndefinedChallenge {
        rule: rule.name.clone(),
        model_name: rule.model_name.clone(),
        goal_type: rule.goal_type.to_string(),
    }
}

fn numeric_target(rule: &RuleRecord) -> Result<f64, GenerationError> {
    rule.target
        .as_ref()
        .and_then(GoalTarget::as_number)
        .ok_or_else(|| undefined(rule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;

    const HEADER: &str = "NAME;TYPE;GOAL_TYPE;TARGET;BONUS;POINT_TYPE;DIFFICULTY;BASELINE_VARIABLE;SELECTION_CRITERIA_POINTS;SELECTION_CRITERIA_BADGES";

    fn rule(row: &str) -> RuleRecord {
        RuleSet::parse(&format!("{HEADER}\n{row}")).unwrap().0.remove(0)
    }

    fn defaults() -> TemplateDefaults {
        TemplateDefaults::new(TimeWindow::new(0, 1_000).unwrap())
    }

    fn keys(fields: &Map<String, Value>) -> Vec<&str> {
        fields.keys().map(String::as_str).collect()
    }

    #[test]
    fn resolves_models_case_insensitively_and_checks_goal_type() {
        assert_eq!(
            ChallengeModel::resolve(&rule("a;Trip;numeric;5;1;Walk")).unwrap(),
            ChallengeModel::Trip
        );
        assert!(matches!(
            ChallengeModel::resolve(&rule("a;trip;leaderboard;5;1;Walk")),
            Err(GenerationError::UndefinedChallenge { .. })
        ));
        assert!(matches!(
            ChallengeModel::resolve(&rule("a;teleport;numeric;5;1;Walk")),
            Err(GenerationError::UndefinedChallenge { .. })
        ));
    }

    #[test]
    fn absolute_fields_keep_template_order() {
        let rule = rule("WalkMore;trip;numeric;50;10;Walk_Km");
        let fields = ChallengeModel::Trip
            .rule_fields(&rule, &ParticipantSnapshot::new("p"), &defaults())
            .unwrap();
        assert_eq!(
            keys(&fields),
            ["counterName", "periodName", "target", "bonusPointType", "bonusScore"]
        );
        assert_eq!(fields["target"], Value::from(50.0));
        assert_eq!(fields["bonusScore"], Value::from(10.0));
        assert_eq!(fields["bonusPointType"], Value::from("green leaves"));
    }

    #[test]
    fn percentage_target_grows_from_baseline() {
        let rule = rule("Greener;percentageIncrement;percentage;0.5;20;Bike_Km;;Bike_Km");
        let participant = ParticipantSnapshot::new("p").with_period("Bike_Km", 10, 20, 11.0);
        let fields = ChallengeModel::PercentageIncrement
            .rule_fields(&rule, &participant, &defaults())
            .unwrap();
        assert_eq!(fields["baseline"], Value::from(11.0));
        assert_eq!(fields["target"], Value::from(17));
    }

    #[test]
    fn leaderboard_target_is_carried_as_text() {
        let rule = rule("Top;leaderboardPosition;leaderboard;1;50;green leaves");
        let fields = ChallengeModel::LeaderboardPosition
            .rule_fields(&rule, &ParticipantSnapshot::new("p"), &defaults())
            .unwrap();
        assert_eq!(fields["target"], Value::from("1"));
        assert_eq!(fields["weekClassificationName"], Value::from("green leaves"));
    }

    #[test]
    fn next_badge_counts_from_current_collection() {
        let rule = rule("Collector;nextBadge;badge;2;30;park and ride");
        let participant = ParticipantSnapshot::new("p").with_badge("park and ride", "first");
        let fields = ChallengeModel::NextBadge
            .rule_fields(&rule, &participant, &defaults())
            .unwrap();
        assert_eq!(fields["initialBadgeNum"], Value::from(1));
        assert_eq!(fields["target"], Value::from(3));
    }

    #[test]
    fn numeric_models_require_a_numeric_target() {
        let rule = rule("NoTarget;trip;numeric;;10;Walk");
        assert!(matches!(
            ChallengeModel::Trip.rule_fields(&rule, &ParticipantSnapshot::new("p"), &defaults()),
            Err(GenerationError::UndefinedChallenge { .. })
        ));
    }

    #[test]
    fn instance_serializes_in_platform_field_order() {
        let window = TimeWindow::new(100, 200).unwrap();
        let instance = ChallengeInstance::new(
            "WalkMore",
            "7",
            ChallengeModel::Trip,
            Map::new(),
            &window,
        );
        let json = serde_json::to_string(&instance).unwrap();
        assert_eq!(
            json,
            r#"{"name":"WalkMore_7","modelName":"trip","fields":{},"start":100,"end":200,"completed":false}"#
        );
    }
}
