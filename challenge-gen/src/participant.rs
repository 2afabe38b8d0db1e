//! Read-only participant game-state snapshots supplied by the platform.
use serde::{Deserialize, Serialize};

use crate::window::TimeWindow;

/// Score accumulated by a point concept during one period instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodScore {
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub score: f64,
}

/// A named counter, e.g. `Walk_Km` or `green leaves`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointConcept {
    pub name: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub periods: Vec<PeriodScore>,
}

impl PointConcept {
    /// Sum of period scores whose period starts inside `window`.
    #[must_use]
    pub fn score_in(&self, window: &TimeWindow) -> f64 {
        self.periods
            .iter()
            .filter(|period| window.contains(period.start))
            .map(|period| period.score)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeCollection {
    pub name: String,
    #[serde(rename = "badgeEarned", default)]
    pub earned: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerState {
    #[serde(rename = "PointConcept", default)]
    pub points: Vec<PointConcept>,
    #[serde(rename = "BadgeCollectionConcept", default)]
    pub badges: Vec<BadgeCollection>,
}

/// One participant's current state in a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSnapshot {
    pub player_id: String,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub state: PlayerState,
}

impl ParticipantSnapshot {
    #[must_use]
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            game_id: String::new(),
            state: PlayerState::default(),
        }
    }

    /// Set the accumulated score of a point concept, creating it if needed.
    #[must_use]
    pub fn with_point(mut self, name: &str, score: f64) -> Self {
        self.point_entry(name).score = score;
        self
    }

    /// Record a period instance for a point concept, creating it if needed.
    #[must_use]
    pub fn with_period(mut self, name: &str, start: i64, end: i64, score: f64) -> Self {
        let point = self.point_entry(name);
        point.score += score;
        point.periods.push(PeriodScore { start, end, score });
        self
    }

    #[must_use]
    pub fn with_badge(mut self, collection: &str, badge: &str) -> Self {
        if let Some(existing) = self
            .state
            .badges
            .iter_mut()
            .find(|c| c.name == collection)
        {
            existing.earned.push(badge.to_string());
        } else {
            self.state.badges.push(BadgeCollection {
                name: collection.to_string(),
                earned: vec![badge.to_string()],
            });
        }
        self
    }

    fn point_entry(&mut self, name: &str) -> &mut PointConcept {
        let idx = match self.state.points.iter().position(|p| p.name == name) {
            Some(idx) => idx,
            None => {
                self.state.points.push(PointConcept {
                    name: name.to_string(),
                    score: 0.0,
                    periods: Vec::new(),
                });
                self.state.points.len() - 1
            }
        };
        &mut self.state.points[idx]
    }

    #[must_use]
    pub fn point(&self, name: &str) -> Option<&PointConcept> {
        self.state.points.iter().find(|p| p.name == name)
    }

    /// Accumulated score of a point concept; 0 when the concept is absent.
    #[must_use]
    pub fn score(&self, name: &str) -> f64 {
        self.point(name).map_or(0.0, |p| p.score)
    }

    /// Activity on a point concept inside `window`, `None` when the concept is absent.
    #[must_use]
    pub fn activity_in(&self, name: &str, window: &TimeWindow) -> Option<f64> {
        self.point(name).map(|p| p.score_in(window))
    }

    /// Baseline for a personalized target: window activity when periods are
    /// recorded, otherwise the accumulated score.
    #[must_use]
    pub fn baseline(&self, name: &str, window: &TimeWindow) -> f64 {
        match self.point(name) {
            Some(point) if !point.periods.is_empty() => point.score_in(window),
            Some(point) => point.score,
            None => 0.0,
        }
    }

    #[must_use]
    pub fn badge_count(&self, collection: &str) -> usize {
        self.state
            .badges
            .iter()
            .find(|c| c.name == collection)
            .map_or(0, |c| c.earned.len())
    }

    /// Whether the badge was earned, in the named collection or in any of them.
    #[must_use]
    pub fn has_badge(&self, collection: Option<&str>, badge: &str) -> bool {
        self.state
            .badges
            .iter()
            .filter(|c| collection.is_none_or(|name| c.name == name))
            .any(|c| c.earned.iter().any(|b| b == badge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_platform_state_shape() {
        let json = r#"{
            "playerId": "23501",
            "gameId": "g1",
            "state": {
                "PointConcept": [
                    {
                        "name": "Walk_Km",
                        "score": 12.5,
                        "periods": [{ "start": 100, "end": 200, "score": 4.0 }],
                        "extra": true
                    }
                ],
                "BadgeCollectionConcept": [
                    { "name": "green leaves", "badgeEarned": ["10-point-green"] }
                ]
            }
        }"#;
        let snapshot: ParticipantSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.player_id, "23501");
        assert!((snapshot.score("Walk_Km") - 12.5).abs() < f64::EPSILON);
        assert_eq!(snapshot.badge_count("green leaves"), 1);
        assert!(snapshot.has_badge(None, "10-point-green"));
        assert!(!snapshot.has_badge(Some("other"), "10-point-green"));
    }

    #[test]
    fn window_activity_only_counts_periods_starting_inside() {
        let window = TimeWindow::new(100, 200).unwrap();
        let snapshot = ParticipantSnapshot::new("p")
            .with_period("Bus_Trips", 50, 100, 3.0)
            .with_period("Bus_Trips", 100, 150, 2.0)
            .with_period("Bus_Trips", 150, 200, 1.0)
            .with_period("Bus_Trips", 200, 250, 9.0);
        assert_eq!(snapshot.activity_in("Bus_Trips", &window), Some(3.0));
        assert_eq!(snapshot.activity_in("Walk_Trips", &window), None);
        assert!((snapshot.score("Bus_Trips") - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn baseline_falls_back_to_accumulated_score() {
        let window = TimeWindow::new(0, 10).unwrap();
        let snapshot = ParticipantSnapshot::new("p")
            .with_point("Bike_Km", 40.0)
            .with_period("Walk_Km", 0, 5, 6.0);
        assert!((snapshot.baseline("Bike_Km", &window) - 40.0).abs() < f64::EPSILON);
        assert!((snapshot.baseline("Walk_Km", &window) - 6.0).abs() < f64::EPSILON);
        assert!(snapshot.baseline("Train_Km", &window).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_state_defaults_to_empty() {
        let snapshot: ParticipantSnapshot =
            serde_json::from_str(r#"{"playerId": "7"}"#).unwrap();
        assert!(snapshot.state.points.is_empty());
        assert_eq!(snapshot.badge_count("any"), 0);
    }
}
