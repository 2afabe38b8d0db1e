//! Centralized defaults for challenge generation.
//!
//! File names, column layout and template defaults live here so the rest of
//! the pipeline never hard-codes them.

/// Column header of the rule table, in order.
pub const RULE_COLUMNS: [&str; 10] = [
    "NAME",
    "TYPE",
    "GOAL_TYPE",
    "TARGET",
    "BONUS",
    "POINT_TYPE",
    "DIFFICULTY",
    "BASELINE_VARIABLE",
    "SELECTION_CRITERIA_POINTS",
    "SELECTION_CRITERIA_BADGES",
];
pub const RULE_FILE_EXTENSION: &str = ".csv";

/// Column header of the audit report.
pub const REPORT_COLUMNS: [&str; 5] = ["RULE", "MODEL", "MATCHED", "GENERATED", "OUTCOME"];

// Output artifacts ---------------------------------------------------------
pub const DEFAULT_OUTPUT_FILE: &str = "challenge.json";
pub const DEFAULT_REPORT_FILE: &str = "generated-rules-report.csv";
pub const DEFAULT_RECOMMENDATIONS_FILE: &str = "recommendations.json";

// Template defaults --------------------------------------------------------
pub const DEFAULT_BONUS_POINT_TYPE: &str = "green leaves";
pub const DEFAULT_PERIOD_NAME: &str = "weekly";
pub const RECOMMENDATION_KEY_PREFIX: &str = "rs";

// Recommendation defaults --------------------------------------------------
pub const DEFAULT_KM_INCREMENT: f64 = 5.0;
pub const DEFAULT_TRIPS_INCREMENT: f64 = 2.0;
pub const DEFAULT_RECOMMENDATION_BONUS: f64 = 100.0;
pub const DEFAULT_MODES_PER_FAMILY: usize = 1;

// Time windows -------------------------------------------------------------
pub const WINDOW_DAYS: i64 = 7;
