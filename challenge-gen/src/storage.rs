//! File-backed snapshot source and artifact sinks.
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::challenge::ChallengeInstance;
use crate::constants::{DEFAULT_OUTPUT_FILE, DEFAULT_RECOMMENDATIONS_FILE, DEFAULT_REPORT_FILE};
use crate::error::GenerationError;
use crate::participant::ParticipantSnapshot;
use crate::recommend::SelectionMap;
use crate::report::GenerationReport;
use crate::{ArtifactSink, SnapshotSource};

/// Accepted payload shapes: a bare array or a page with a `content` array.
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotPayload {
    List(Vec<ParticipantSnapshot>),
    Page { content: Vec<ParticipantSnapshot> },
}

/// Decode a game-state payload.
///
/// # Errors
///
/// Returns the decoder error when the text matches neither shape.
pub fn parse_snapshots(json: &str) -> Result<Vec<ParticipantSnapshot>, serde_json::Error> {
    let payload: SnapshotPayload = serde_json::from_str(json)?;
    Ok(match payload {
        SnapshotPayload::List(list) => list,
        SnapshotPayload::Page { content } => content,
    })
}

/// Keep snapshots belonging to `game_id`; untagged snapshots are kept.
#[must_use]
pub fn for_game(snapshots: Vec<ParticipantSnapshot>, game_id: &str) -> Vec<ParticipantSnapshot> {
    snapshots
        .into_iter()
        .filter(|s| s.game_id.is_empty() || s.game_id == game_id)
        .collect()
}

/// Reads participant state from a JSON export on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotSource {
    path: PathBuf,
}

impl JsonFileSnapshotSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSource for JsonFileSnapshotSource {
    type Error = GenerationError;

    fn read_game_state(&self, game_id: &str) -> Result<Vec<ParticipantSnapshot>, Self::Error> {
        let text = fs::read_to_string(&self.path).map_err(|e| GenerationError::io(&self.path, e))?;
        let snapshots = parse_snapshots(&text).map_err(|e| GenerationError::json(&self.path, e))?;
        log::debug!(
            "read {} snapshots from {}",
            snapshots.len(),
            self.path.display()
        );
        Ok(for_game(snapshots, game_id))
    }
}

const STAGING_SUFFIX: &str = "partial";

/// Writes the run artifacts to three files.
///
/// Each write lands in a `.partial` sibling; [`ArtifactSink::commit`] renames
/// them into place and [`ArtifactSink::discard`] removes them, so a failed
/// run leaves no artifact behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSink {
    pub instances: PathBuf,
    pub report: PathBuf,
    pub recommendations: PathBuf,
    staged: Vec<PathBuf>,
}

impl Default for FileSink {
    fn default() -> Self {
        Self {
            instances: PathBuf::from(DEFAULT_OUTPUT_FILE),
            report: PathBuf::from(DEFAULT_REPORT_FILE),
            recommendations: PathBuf::from(DEFAULT_RECOMMENDATIONS_FILE),
            staged: Vec::new(),
        }
    }
}

impl FileSink {
    /// Instances go to `output`; report and recommendation audit sit beside it.
    #[must_use]
    pub fn beside(output: impl Into<PathBuf>) -> Self {
        let instances = output.into();
        let dir = instances.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            report: dir.join(DEFAULT_REPORT_FILE),
            recommendations: dir.join(DEFAULT_RECOMMENDATIONS_FILE),
            instances,
            staged: Vec::new(),
        }
    }

    fn staging_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(STAGING_SUFFIX);
        path.with_file_name(name)
    }

    fn stage(&mut self, path: PathBuf, contents: &str) -> Result<(), GenerationError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| GenerationError::io(parent, e))?;
        }
        let staging = Self::staging_path(&path);
        fs::write(&staging, contents).map_err(|e| GenerationError::io(&staging, e))?;
        log::debug!("staged {}", staging.display());
        self.staged.push(path);
        Ok(())
    }
}

impl ArtifactSink for FileSink {
    type Error = GenerationError;

    fn write_instances(&mut self, instances: &[ChallengeInstance]) -> Result<(), Self::Error> {
        let json = serde_json::to_string_pretty(instances)
            .map_err(|e| GenerationError::json(&self.instances, e))?;
        self.stage(self.instances.clone(), &json)
    }

    fn write_report(&mut self, report: &GenerationReport) -> Result<(), Self::Error> {
        self.stage(self.report.clone(), &report.to_table())
    }

    fn write_recommendations(&mut self, selections: &SelectionMap) -> Result<(), Self::Error> {
        let json = serde_json::to_string_pretty(selections)
            .map_err(|e| GenerationError::json(&self.recommendations, e))?;
        self.stage(self.recommendations.clone(), &json)
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        let staged = std::mem::take(&mut self.staged);
        for (index, path) in staged.iter().enumerate() {
            let staging = Self::staging_path(path);
            if let Err(err) = fs::rename(&staging, path) {
                for placed in &staged[..index] {
                    fs::remove_file(placed).ok();
                }
                for pending in &staged[index..] {
                    fs::remove_file(Self::staging_path(pending)).ok();
                }
                return Err(GenerationError::io(path, err));
            }
            log::info!("wrote {}", path.display());
        }
        Ok(())
    }

    fn discard(&mut self) {
        for path in std::mem::take(&mut self.staged) {
            let staging = Self::staging_path(&path);
            if fs::remove_file(&staging).is_ok() {
                log::debug!("discarded {}", staging.display());
            }
        }
    }
}

/// Keeps artifacts in memory; used for dry runs and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySink {
    pub instances: Option<Vec<ChallengeInstance>>,
    pub report: Option<GenerationReport>,
    pub recommendations: Option<SelectionMap>,
}

impl MemorySink {
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        self.instances.is_none() && self.report.is_none() && self.recommendations.is_none()
    }
}

impl ArtifactSink for MemorySink {
    type Error = std::convert::Infallible;

    fn write_instances(&mut self, instances: &[ChallengeInstance]) -> Result<(), Self::Error> {
        self.instances = Some(instances.to_vec());
        Ok(())
    }

    fn write_report(&mut self, report: &GenerationReport) -> Result<(), Self::Error> {
        self.report = Some(report.clone());
        Ok(())
    }

    fn write_recommendations(&mut self, selections: &SelectionMap) -> Result<(), Self::Error> {
        self.recommendations = Some(selections.clone());
        Ok(())
    }
}
