//! Run orchestration: a linear stage machine from rule loading to output.
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::challenge::{ChallengeInstance, TemplateDefaults};
use crate::constants::{DEFAULT_BONUS_POINT_TYPE, DEFAULT_PERIOD_NAME, WINDOW_DAYS};
use crate::error::GenerationError;
use crate::generator::ChallengeInstanceGenerator;
use crate::modes::ModeWeightTable;
use crate::recommend::{ActivityRecommender, RecommenderConfig, SelectionMap};
use crate::report::GenerationReport;
use crate::rules::RuleSet;
use crate::window::TimeWindow;
use crate::{ArtifactSink, SnapshotSource};

/// What to do when the recommendation pass selects nobody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecommendationFailurePolicy {
    #[default]
    AbortRun,
    SkipRecommendations,
}

/// What to do when a rule cannot be generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleFailurePolicy {
    #[default]
    AbortRun,
    SkipRule,
}

fn parse_policy(raw: &str) -> Result<bool, GenerationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "abort" => Ok(true),
        "skip" => Ok(false),
        other => Err(GenerationError::Config(format!(
            "unknown failure policy {other:?} (expected abort or skip)"
        ))),
    }
}

impl FromStr for RecommendationFailurePolicy {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if parse_policy(s)? {
            Self::AbortRun
        } else {
            Self::SkipRecommendations
        })
    }
}

impl FromStr for RuleFailurePolicy {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if parse_policy(s)? {
            Self::AbortRun
        } else {
            Self::SkipRule
        })
    }
}

/// Everything one run needs besides its source and sink.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub game_id: String,
    pub rules_path: Option<PathBuf>,
    /// Bounds stamped on every generated instance.
    pub window: TimeWindow,
    /// Activity window for baselines and recommendations.
    pub history: TimeWindow,
    pub use_recommendations: bool,
    pub recommender: RecommenderConfig,
    pub weights: ModeWeightTable,
    pub on_empty_recommendation: RecommendationFailurePolicy,
    pub on_rule_failure: RuleFailurePolicy,
    pub bonus_point_type: String,
    pub period_name: String,
}

impl RunConfig {
    /// Defaults for `game_id`: next week's window and the week before it as history.
    #[must_use]
    pub fn new(game_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        let window = TimeWindow::next_week(now);
        Self {
            game_id: game_id.into(),
            rules_path: None,
            history: window.preceding(WINDOW_DAYS),
            window,
            use_recommendations: false,
            recommender: RecommenderConfig::default(),
            weights: ModeWeightTable::default(),
            on_empty_recommendation: RecommendationFailurePolicy::default(),
            on_rule_failure: RuleFailurePolicy::default(),
            bonus_point_type: DEFAULT_BONUS_POINT_TYPE.to_string(),
            period_name: DEFAULT_PERIOD_NAME.to_string(),
        }
    }

    /// Replace the generation window and move the history window with it.
    #[must_use]
    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self.history = window.preceding(WINDOW_DAYS);
        self
    }

    fn template_defaults(&self) -> TemplateDefaults {
        TemplateDefaults {
            bonus_point_type: self.bonus_point_type.clone(),
            period_name: self.period_name.clone(),
            history: self.history,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStage {
    Init,
    LoadRules,
    FetchSnapshot,
    MatchAndGenerate,
    RecommendAndGenerate,
    WriteOutput,
    Done,
    Error,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Init => "init",
            Self::LoadRules => "load rules",
            Self::FetchSnapshot => "fetch snapshot",
            Self::MatchAndGenerate => "match and generate",
            Self::RecommendAndGenerate => "recommend and generate",
            Self::WriteOutput => "write output",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Ordered, human-readable run log mirrored to the `log` facade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{message}");
        self.push(LogLevel::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.push(LogLevel::Warning, message);
    }

    pub fn fatal(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{message}");
        self.push(LogLevel::Fatal, message);
    }

    fn push(&mut self, level: LogLevel, message: String) {
        self.entries.push(LogEntry { level, message });
    }

    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn count(&self, level: LogLevel) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }
}

/// Result of one run. On failure `instances` is empty and nothing was written.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub stage: RunStage,
    pub instances: Vec<ChallengeInstance>,
    pub report: GenerationReport,
    pub selections: Option<SelectionMap>,
    pub log: RunLog,
}

impl RunOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.stage == RunStage::Done
    }
}

/// Accumulated state while a run is in flight.
struct RunState {
    stage: RunStage,
    report: GenerationReport,
    selections: Option<SelectionMap>,
    log: RunLog,
}

impl RunState {
    fn enter(&mut self, stage: RunStage) {
        log::debug!("entering stage {stage}");
        self.stage = stage;
    }

    fn abort(mut self, message: impl Into<String>) -> RunOutcome {
        self.log.fatal(message);
        RunOutcome {
            stage: RunStage::Error,
            instances: Vec::new(),
            report: self.report,
            selections: self.selections,
            log: self.log,
        }
    }
}

/// Sequences loading, matching, recommendation, generation and output.
pub struct Orchestrator<S, K>
where
    S: SnapshotSource,
    K: ArtifactSink,
{
    source: S,
    sink: K,
    config: RunConfig,
}

impl<S, K> Orchestrator<S, K>
where
    S: SnapshotSource,
    K: ArtifactSink,
{
    pub const fn new(source: S, sink: K, config: RunConfig) -> Self {
        Self {
            source,
            sink,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub const fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Load the rule file named in the config, then run.
    pub fn run(&mut self) -> RunOutcome {
        let mut state = self.start();
        state.enter(RunStage::LoadRules);
        let rules = match RuleSet::load(self.config.rules_path.as_deref()) {
            Ok(rules) => rules,
            Err(err) => return state.abort(format!("cannot load rules: {err}")),
        };
        state.log.info(format!("loaded {} rules", rules.len()));
        self.execute(state, &rules)
    }

    /// Run against an already-parsed rule set.
    pub fn run_with_rules(&mut self, rules: &RuleSet) -> RunOutcome {
        let mut state = self.start();
        state.enter(RunStage::LoadRules);
        state.log.info(format!("using {} rules", rules.len()));
        self.execute(state, rules)
    }

    fn start(&self) -> RunState {
        let mut state = RunState {
            stage: RunStage::Init,
            report: GenerationReport::new(),
            selections: None,
            log: RunLog::default(),
        };
        state.log.info(format!(
            "generating challenges for game {} in {}",
            self.config.game_id,
            self.config.window.describe()
        ));
        state
    }

    fn execute(&mut self, mut state: RunState, rules: &RuleSet) -> RunOutcome {
        let config = &self.config;

        state.enter(RunStage::FetchSnapshot);
        let participants = match self.source.read_game_state(&config.game_id) {
            Ok(participants) if participants.is_empty() => {
                let err = GenerationError::FetchFailure {
                    game_id: config.game_id.clone(),
                    reason: "snapshot contains no participants".to_string(),
                };
                return state.abort(err.to_string());
            }
            Ok(participants) => participants,
            Err(err) => {
                let err = GenerationError::FetchFailure {
                    game_id: config.game_id.clone(),
                    reason: err.to_string(),
                };
                return state.abort(err.to_string());
            }
        };
        state
            .log
            .info(format!("read state of {} participants", participants.len()));

        let mut generator = ChallengeInstanceGenerator::new(config.window, config.template_defaults());

        if config.use_recommendations {
            state.enter(RunStage::RecommendAndGenerate);
            let recommender = ActivityRecommender::new(&config.weights, &config.recommender);
            let selections = recommender.recommend(&participants, &config.history);
            if selections.is_empty() {
                let err = GenerationError::NoMatch {
                    subject: format!("recommendations in {}", config.history.describe()),
                };
                match config.on_empty_recommendation {
                    RecommendationFailurePolicy::AbortRun => return state.abort(err.to_string()),
                    RecommendationFailurePolicy::SkipRecommendations => {
                        state.log.warning(format!("{err}, continuing with rules"));
                    }
                }
            } else {
                let count = generator.generate_recommendations(&selections, config.recommender.bonus);
                state.log.info(format!(
                    "recommended {count} challenges for {} participants",
                    selections.len()
                ));
            }
            state.selections = Some(selections);
        }

        state.enter(RunStage::MatchAndGenerate);
        for rule in rules {
            match generator.process_rule(rule, &participants, &mut state.report) {
                Ok(count) => state
                    .log
                    .info(format!("rule {}: generated {count} challenges", rule.name)),
                Err(err @ GenerationError::NoMatch { .. }) => state.log.warning(err.to_string()),
                Err(err) => match config.on_rule_failure {
                    RuleFailurePolicy::AbortRun => return state.abort(err.to_string()),
                    RuleFailurePolicy::SkipRule => {
                        state.log.warning(format!("{err}, rule skipped"));
                    }
                },
            }
        }

        state.enter(RunStage::WriteOutput);
        let instances = generator.into_instances();
        if let Err(err) = self.write_artifacts(&instances, &state) {
            return state.abort(format!("cannot write output: {err}"));
        }
        state.log.info(format!(
            "wrote {} challenges and {} report rows",
            instances.len(),
            state.report.len()
        ));

        state.enter(RunStage::Done);
        RunOutcome {
            stage: state.stage,
            instances,
            report: state.report,
            selections: state.selections,
            log: state.log,
        }
    }

    fn write_artifacts(
        &mut self,
        instances: &[ChallengeInstance],
        state: &RunState,
    ) -> Result<(), K::Error> {
        let written = self
            .sink
            .write_instances(instances)
            .and_then(|()| self.sink.write_report(&state.report))
            .and_then(|()| match &state.selections {
                Some(selections) => self.sink.write_recommendations(selections),
                None => Ok(()),
            });
        if let Err(err) = written {
            self.sink.discard();
            return Err(err);
        }
        self.sink.commit()
    }
}
