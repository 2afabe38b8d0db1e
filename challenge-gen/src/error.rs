//! Error taxonomy for the generation pipeline.
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading inputs or generating challenges.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Rule source or selection criteria could not be read or understood.
    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },
    /// Participant snapshot could not be retrieved, or was empty.
    #[error("failed to read game state for {game_id}: {reason}")]
    FetchFailure { game_id: String, reason: String },
    /// The rule names a model or goal type with no known template.
    #[error("undefined challenge {model_name:?} for goal type {goal_type:?} in rule {rule}")]
    UndefinedChallenge {
        rule: String,
        model_name: String,
        goal_type: String,
    },
    /// Nobody qualified for a rule or for recommendations.
    #[error("no participants for {subject}")]
    NoMatch { subject: String },
    /// Two different (participant, template) pairs produced the same instance name.
    #[error("instance name {name} from rule {rule} is already taken by another challenge")]
    DuplicateName { name: String, rule: String },
    /// Window, weight table or policy values are inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl GenerationError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
