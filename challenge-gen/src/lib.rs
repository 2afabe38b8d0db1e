//! Challenge Generation Pipeline
//!
//! Platform-agnostic core for producing weekly challenges in a mobility
//! gamification game. Rule tables and participant snapshots go in; dated,
//! de-duplicated challenge instances and an audit report come out.
//! This crate has no CLI or network dependencies.

pub mod challenge;
pub mod constants;
pub mod criteria;
pub mod error;
pub mod generator;
pub mod modes;
pub mod numbers;
pub mod participant;
pub mod pipeline;
pub mod recommend;
pub mod report;
pub mod rules;
pub mod storage;
pub mod window;

// Re-export commonly used types
pub use challenge::{ChallengeInstance, ChallengeModel, TemplateDefaults};
pub use criteria::{CriteriaError, EligibilityMatcher, match_participants};
pub use error::GenerationError;
pub use generator::ChallengeInstanceGenerator;
pub use modes::{MetricFamily, ModeWeightTable, PlayerFilterSet, TransportMode};
pub use participant::{BadgeCollection, ParticipantSnapshot, PeriodScore, PlayerState, PointConcept};
pub use pipeline::{
    LogEntry, LogLevel, Orchestrator, RecommendationFailurePolicy, RuleFailurePolicy, RunConfig,
    RunLog, RunOutcome, RunStage,
};
pub use recommend::{ActivityRecommender, ModeSelection, RecommenderConfig, SelectionMap};
pub use report::{GenerationReport, ReportRow, RuleOutcome};
pub use rules::{GoalTarget, GoalType, RuleRecord, RuleSet};
pub use storage::{FileSink, JsonFileSnapshotSource, MemorySink, parse_snapshots};
pub use window::{TimeWindow, parse_instant};

/// Trait for abstracting participant state retrieval
/// Platform-specific implementations should provide this
pub trait SnapshotSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the current state of every participant in a game
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be retrieved or decoded.
    fn read_game_state(&self, game_id: &str) -> Result<Vec<ParticipantSnapshot>, Self::Error>;
}

/// Trait for abstracting where run artifacts end up
pub trait ArtifactSink {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist the generated challenge instances
    ///
    /// # Errors
    ///
    /// Returns an error if the instances cannot be written.
    fn write_instances(&mut self, instances: &[ChallengeInstance]) -> Result<(), Self::Error>;

    /// Persist the per-rule audit report
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be written.
    fn write_report(&mut self, report: &GenerationReport) -> Result<(), Self::Error>;

    /// Persist the recommendation audit
    ///
    /// # Errors
    ///
    /// Returns an error if the selections cannot be written.
    fn write_recommendations(&mut self, selections: &SelectionMap) -> Result<(), Self::Error>;

    /// Make everything written so far visible at once
    ///
    /// # Errors
    ///
    /// Returns an error if the artifacts cannot be put in place; nothing
    /// written by this run is left behind in that case.
    fn commit(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Drop everything written since the last commit
    fn discard(&mut self) {}
}
