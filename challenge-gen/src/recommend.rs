//! Personalized mode recommendations from historical activity.
//!
//! For every eligible participant and every requested metric family, modes with
//! recorded activity in the history window are ranked by weight (lower first,
//! canonical mode order on ties) and the best ones become personalized targets.
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::BTreeMap;

use crate::constants::{
    DEFAULT_KM_INCREMENT, DEFAULT_MODES_PER_FAMILY, DEFAULT_RECOMMENDATION_BONUS,
    DEFAULT_TRIPS_INCREMENT, RECOMMENDATION_KEY_PREFIX,
};
use crate::modes::{MetricFamily, ModeWeightTable, PlayerFilterSet, TransportMode};
use crate::numbers::ceil_f64_to_i64;
use crate::participant::ParticipantSnapshot;
use crate::window::TimeWindow;

/// Tuning for the recommendation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommenderConfig {
    pub families: Vec<MetricFamily>,
    pub modes_per_family: usize,
    pub km_increment: f64,
    pub trips_increment: f64,
    /// Allow untouched trip modes (zero activity) as a baseline to start from.
    pub allow_zero_trip_baseline: bool,
    pub bonus: f64,
    pub filtering: bool,
    pub filter: PlayerFilterSet,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            families: MetricFamily::ALL.to_vec(),
            modes_per_family: DEFAULT_MODES_PER_FAMILY,
            km_increment: DEFAULT_KM_INCREMENT,
            trips_increment: DEFAULT_TRIPS_INCREMENT,
            allow_zero_trip_baseline: false,
            bonus: DEFAULT_RECOMMENDATION_BONUS,
            filtering: false,
            filter: PlayerFilterSet::default(),
        }
    }
}

impl RecommenderConfig {
    #[must_use]
    pub const fn increment(&self, family: MetricFamily) -> f64 {
        match family {
            MetricFamily::Km => self.km_increment,
            MetricFamily::Trips => self.trips_increment,
        }
    }

    /// Whether a participant is in scope for recommendations.
    #[must_use]
    pub fn admits(&self, player_id: &str) -> bool {
        !self.filtering || self.filter.contains(player_id)
    }

    fn unique_families(&self) -> Vec<MetricFamily> {
        let mut families = Vec::with_capacity(self.families.len());
        for family in &self.families {
            if !families.contains(family) {
                families.push(*family);
            }
        }
        families
    }
}

/// One mode chosen for a participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeSelection {
    pub player_id: String,
    pub mode: TransportMode,
    pub family: MetricFamily,
    pub baseline: f64,
    pub target: i64,
}

impl ModeSelection {
    #[must_use]
    pub fn counter_name(&self) -> String {
        self.mode.counter_name(self.family)
    }

    /// Template key used for de-duplication and instance naming.
    #[must_use]
    pub fn template_key(&self) -> String {
        format!("{RECOMMENDATION_KEY_PREFIX}_{}", self.counter_name())
    }
}

pub type ModeSelections = SmallVec<[ModeSelection; 2]>;

/// Per-participant selections, ordered by participant id.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SelectionMap(BTreeMap<String, ModeSelections>);

impl SelectionMap {
    #[must_use]
    pub fn get(&self, player_id: &str) -> Option<&ModeSelections> {
        self.0.get(player_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ModeSelections)> {
        self.0.iter()
    }

    /// Number of participants with at least one selection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn selection_count(&self) -> usize {
        self.0.values().map(SmallVec::len).sum()
    }
}

/// Ranks transport modes per participant against a weight table.
#[derive(Debug, Clone, Copy)]
pub struct ActivityRecommender<'a> {
    weights: &'a ModeWeightTable,
    config: &'a RecommenderConfig,
}

impl<'a> ActivityRecommender<'a> {
    #[must_use]
    pub const fn new(weights: &'a ModeWeightTable, config: &'a RecommenderConfig) -> Self {
        Self { weights, config }
    }

    /// Selections for every in-scope participant with qualifying activity.
    #[must_use]
    pub fn recommend(&self, participants: &[ParticipantSnapshot], window: &TimeWindow) -> SelectionMap {
        let mut map = BTreeMap::new();
        for participant in participants {
            if !self.config.admits(&participant.player_id) {
                continue;
            }
            let selections = self.select_for(participant, window);
            if selections.is_empty() {
                log::debug!(
                    "no qualifying activity for player {} in {}",
                    participant.player_id,
                    window.describe()
                );
                continue;
            }
            map.insert(participant.player_id.clone(), selections);
        }
        SelectionMap(map)
    }

    /// Ranked selections for one participant, one block per requested family.
    #[must_use]
    pub fn select_for(&self, participant: &ParticipantSnapshot, window: &TimeWindow) -> ModeSelections {
        let mut selections = ModeSelections::new();
        for family in self.config.unique_families() {
            let mut candidates: Vec<(i32, usize, TransportMode, f64)> = TransportMode::ALL
                .into_iter()
                .filter(|mode| mode.tracks(family))
                .filter_map(|mode| {
                    let weight = self.weights.weight(mode)?;
                    let activity = participant.activity_in(&mode.counter_name(family), window)?;
                    self.qualifies(family, activity)
                        .then_some((weight, mode.rank(), mode, activity))
                })
                .collect();
            candidates.sort_by_key(|&(weight, rank, _, _)| (weight, rank));

            for (_, _, mode, baseline) in candidates.into_iter().take(self.config.modes_per_family) {
                selections.push(ModeSelection {
                    player_id: participant.player_id.clone(),
                    mode,
                    family,
                    baseline,
                    target: ceil_f64_to_i64(baseline + self.config.increment(family)),
                });
            }
        }
        selections
    }

    fn qualifies(&self, family: MetricFamily, activity: f64) -> bool {
        if activity > 0.0 {
            return true;
        }
        self.config.allow_zero_trip_baseline && family == MetricFamily::Trips && activity == 0.0
    }
}
