//! Transport modes, metric families and the weighting that ranks them.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;

use crate::error::GenerationError;

/// Transport modes tracked by the game, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransportMode {
    Walk,
    Bike,
    BikeSharing,
    Bus,
    Train,
    ZeroImpact,
    NoCar,
}

impl TransportMode {
    /// Canonical ordering, also the ranking tie-breaker.
    pub const ALL: [Self; 7] = [
        Self::Walk,
        Self::Bike,
        Self::BikeSharing,
        Self::Bus,
        Self::Train,
        Self::ZeroImpact,
        Self::NoCar,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Walk => "Walk",
            Self::Bike => "Bike",
            Self::BikeSharing => "BikeSharing",
            Self::Bus => "Bus",
            Self::Train => "Train",
            Self::ZeroImpact => "ZeroImpact",
            Self::NoCar => "NoCar",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(raw.trim()))
    }

    /// Position in the canonical ordering.
    #[must_use]
    pub fn rank(self) -> usize {
        Self::ALL.iter().position(|m| *m == self).unwrap_or(Self::ALL.len())
    }

    /// Aggregate modes only count trips; distance is tracked per physical mode.
    #[must_use]
    pub const fn tracks(self, family: MetricFamily) -> bool {
        match self {
            Self::ZeroImpact | Self::NoCar => matches!(family, MetricFamily::Trips),
            _ => true,
        }
    }

    /// Point concept carrying this mode's metric, e.g. `Walk_Km`.
    #[must_use]
    pub fn counter_name(self, family: MetricFamily) -> String {
        format!("{}_{}", self.name(), family.suffix())
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The metric a personalized challenge improves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricFamily {
    Km,
    Trips,
}

impl MetricFamily {
    pub const ALL: [Self; 2] = [Self::Km, Self::Trips];

    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Km => "Km",
            Self::Trips => "Trips",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|family| family.suffix().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Desirability of each mode; lower weights are preferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeWeightTable(BTreeMap<TransportMode, i32>);

impl Default for ModeWeightTable {
    fn default() -> Self {
        Self::from_pairs([
            (TransportMode::Walk, 1),
            (TransportMode::Bike, 1),
            (TransportMode::BikeSharing, 5),
            (TransportMode::Bus, 10),
            (TransportMode::Train, 7),
            (TransportMode::ZeroImpact, 0),
            (TransportMode::NoCar, 3),
        ])
    }
}

impl ModeWeightTable {
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (TransportMode, i32)>) -> Self {
        Self(pairs.into_iter().collect())
    }

    /// Parse `{"Walk": 1, "Bus": 10}`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Config`] for invalid JSON, unknown modes, or
    /// two keys naming the same mode (e.g. `Walk` and `walk`).
    pub fn from_json(json: &str) -> Result<Self, GenerationError> {
        let raw: HashMap<String, i32> = serde_json::from_str(json)
            .map_err(|err| GenerationError::Config(format!("weight table: {err}")))?;
        let mut table = BTreeMap::new();
        for (name, weight) in raw {
            let mode = TransportMode::parse(&name).ok_or_else(|| {
                GenerationError::Config(format!("weight table: unknown mode {name:?}"))
            })?;
            if table.insert(mode, weight).is_some() {
                return Err(GenerationError::Config(format!(
                    "weight table: mode {mode} is given more than once"
                )));
            }
        }
        Ok(Self(table))
    }

    /// # Errors
    ///
    /// Returns [`GenerationError::Io`] if the file cannot be read, or
    /// [`GenerationError::Config`] if its content is invalid.
    pub fn load(path: &Path) -> Result<Self, GenerationError> {
        let json = std::fs::read_to_string(path).map_err(|err| GenerationError::io(path, err))?;
        Self::from_json(&json)
    }

    #[must_use]
    pub fn weight(&self, mode: TransportMode) -> Option<i32> {
        self.0.get(&mode).copied()
    }

    pub fn modes(&self) -> impl Iterator<Item = TransportMode> + '_ {
        self.0.keys().copied()
    }
}

/// Participant ids recommendations are restricted to when filtering is on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerFilterSet {
    ids: Vec<String>,
    index: HashSet<String>,
}

impl PlayerFilterSet {
    /// Build from ids, trimming, dropping empties and keeping the first of any duplicate.
    #[must_use]
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for id in ids {
            let id = id.as_ref().trim();
            if !id.is_empty() && set.index.insert(id.to_string()) {
                set.ids.push(id.to_string());
            }
        }
        set
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
