mod remote;
mod reports;
mod util;

use anyhow::{Context, Result};
use challenge_gen::constants::DEFAULT_OUTPUT_FILE;
use challenge_gen::{
    ArtifactSink, FileSink, JsonFileSnapshotSource, ModeWeightTable, Orchestrator, PlayerFilterSet,
    RecommendationFailurePolicy, RuleFailurePolicy, RunConfig, RunOutcome, SnapshotSource,
};
use chrono::Utc;
use clap::{ArgAction, CommandFactory, Parser};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Duration;

use remote::{Credentials, HttpSnapshotSource};
use util::{resolve_window, split_csv};

#[derive(Debug, Parser)]
#[command(name = "challenge-gen", version)]
#[command(about = "Generate next week's challenges for a mobility gamification game")]
struct Args {
    /// Gamification engine base URL
    #[arg(long)]
    host: Option<String>,

    /// Game whose participants receive challenges
    #[arg(long)]
    game_id: Option<String>,

    /// Rule table (semicolon-delimited .csv)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Where to write the generated challenges
    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    output: PathBuf,

    /// Engine username for basic auth
    #[arg(long)]
    username: Option<String>,

    /// Engine password for basic auth
    #[arg(long)]
    password: Option<String>,

    /// Add personalized challenges from historical mode activity
    #[arg(long, action = ArgAction::Set, default_value_t = false)]
    use_recommendation_system: bool,

    /// Restrict recommendations to --filter-ids
    #[arg(long, action = ArgAction::Set, default_value_t = false)]
    enable_filtering: bool,

    /// Participant ids for filtering (comma-separated)
    #[arg(long, default_value = "")]
    filter_ids: String,

    /// Read game state from a JSON export instead of the engine
    #[arg(long, conflicts_with = "host")]
    snapshot_file: Option<PathBuf>,

    /// Where to write the per-rule report (defaults beside --output)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Where to write the recommendation audit (defaults beside --output)
    #[arg(long)]
    recommendations: Option<PathBuf>,

    /// Window start (RFC 3339 or YYYY-MM-DD); defaults to next Monday
    #[arg(long)]
    start: Option<String>,

    /// Window end (RFC 3339 or YYYY-MM-DD); defaults to start plus one week
    #[arg(long)]
    end: Option<String>,

    /// What to do when nobody gets a recommendation: abort or skip
    #[arg(long, default_value = "abort")]
    on_empty_recommendation: RecommendationFailurePolicy,

    /// What to do when a rule cannot be generated: abort or skip
    #[arg(long, default_value = "abort")]
    on_rule_failure: RuleFailurePolicy,

    /// Mode weight table as JSON, e.g. {"Walk":1,"Bus":10}
    #[arg(long)]
    weights: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Summary format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["console", "json"])]
    format: String,

    /// Optional path to write the summary instead of stdout
    #[arg(long)]
    summary: Option<PathBuf>,
}

impl Args {
    fn is_runnable(&self) -> bool {
        self.game_id.is_some()
            && self.input.is_some()
            && (self.host.is_some() || self.snapshot_file.is_some())
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !args.is_runnable() {
        Args::command().print_help()?;
        println!();
        return Ok(());
    }

    announce_banner(&args);

    let config = build_config(&args)?;
    let sink = build_sink(&args);
    let outcome = if let Some(path) = &args.snapshot_file {
        run(JsonFileSnapshotSource::new(path), sink.clone(), config)
    } else {
        let host = args.host.as_deref().unwrap_or_default();
        let credentials = args.username.clone().map(|username| Credentials {
            username,
            password: args.password.clone(),
        });
        let source = HttpSnapshotSource::new(
            host,
            credentials,
            Duration::from_secs(args.timeout_secs),
        )?;
        run(source, sink.clone(), config)
    };

    write_summary(&args, &outcome, &sink)?;

    if !outcome.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

fn announce_banner(args: &Args) {
    if args.summary.is_some() || args.format == "json" {
        return;
    }
    println!("{}", "🏆 Challenge Generator".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn build_config(args: &Args) -> Result<RunConfig> {
    let game_id = args.game_id.clone().unwrap_or_default();
    let window = resolve_window(args.start.as_deref(), args.end.as_deref(), Utc::now())?;
    let mut config = RunConfig::new(game_id, Utc::now()).with_window(window);
    config.rules_path.clone_from(&args.input);
    config.use_recommendations = args.use_recommendation_system;
    config.recommender.filtering = args.enable_filtering;
    config.recommender.filter = PlayerFilterSet::new(split_csv(&args.filter_ids));
    config.on_empty_recommendation = args.on_empty_recommendation;
    config.on_rule_failure = args.on_rule_failure;
    if let Some(path) = &args.weights {
        config.weights = ModeWeightTable::load(path)
            .with_context(|| format!("loading weights from {}", path.display()))?;
    }
    if config.recommender.filtering && config.recommender.filter.is_empty() {
        log::warn!("filtering enabled without --filter-ids; no participant is in scope");
    }
    Ok(config)
}

fn build_sink(args: &Args) -> FileSink {
    let mut sink = FileSink::beside(&args.output);
    if let Some(report) = &args.report {
        sink.report.clone_from(report);
    }
    if let Some(recommendations) = &args.recommendations {
        sink.recommendations.clone_from(recommendations);
    }
    sink
}

fn run<S, K>(source: S, sink: K, config: RunConfig) -> RunOutcome
where
    S: SnapshotSource,
    K: ArtifactSink,
{
    Orchestrator::new(source, sink, config).run()
}

fn write_summary(args: &Args, outcome: &RunOutcome, sink: &FileSink) -> Result<()> {
    let mut output_target = OutputTarget::new(args.summary.clone())?;
    match args.format.as_str() {
        "json" => reports::generate_json_summary(output_target.writer(), outcome)?,
        _ => reports::generate_console_summary(output_target.writer(), outcome, sink)?,
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from([
            "challenge-gen",
            "--game-id",
            "g1",
            "--input",
            "rules.csv",
            "--snapshot-file",
            "state.json",
        ])
    }

    #[test]
    fn runnable_needs_game_input_and_a_source() {
        assert!(base_args().is_runnable());
        assert!(!Args::parse_from(["challenge-gen", "--game-id", "g1"]).is_runnable());
        assert!(
            !Args::parse_from(["challenge-gen", "--game-id", "g1", "--input", "r.csv"]).is_runnable()
        );
    }

    #[test]
    fn flags_map_onto_run_config() {
        let args = Args::parse_from([
            "challenge-gen",
            "--game-id",
            "g1",
            "--input",
            "rules.csv",
            "--host",
            "http://engine/",
            "--use-recommendation-system",
            "true",
            "--enable-filtering",
            "true",
            "--filter-ids",
            "101, 102,,101",
            "--on-rule-failure",
            "skip",
            "--start",
            "2026-10-19",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.game_id, "g1");
        assert!(config.use_recommendations);
        assert!(config.recommender.filtering);
        assert_eq!(config.recommender.filter.ids(), ["101", "102"]);
        assert_eq!(config.on_rule_failure, RuleFailurePolicy::SkipRule);
        assert_eq!(
            config.on_empty_recommendation,
            RecommendationFailurePolicy::AbortRun
        );
        assert_eq!(config.history.end, config.window.start);
    }

    #[test]
    fn artifact_paths_follow_output_unless_overridden() {
        let mut args = base_args();
        args.output = PathBuf::from("out/challenge.json");
        args.recommendations = Some(PathBuf::from("audit/recs.json"));
        let sink = build_sink(&args);
        assert_eq!(sink.report, PathBuf::from("out/generated-rules-report.csv"));
        assert_eq!(sink.recommendations, PathBuf::from("audit/recs.json"));
    }

    #[test]
    fn unknown_failure_policy_is_rejected() {
        let parsed = Args::try_parse_from([
            "challenge-gen",
            "--game-id",
            "g1",
            "--on-rule-failure",
            "retry",
        ]);
        assert!(parsed.is_err());
        let args = Args::parse_from(["challenge-gen", "--on-empty-recommendation", "SKIP"]);
        assert_eq!(
            args.on_empty_recommendation,
            RecommendationFailurePolicy::SkipRecommendations
        );
    }

    #[test]
    fn host_and_snapshot_file_conflict() {
        let parsed = Args::try_parse_from([
            "challenge-gen",
            "--host",
            "http://engine/",
            "--snapshot-file",
            "state.json",
        ]);
        assert!(parsed.is_err());
    }
}
