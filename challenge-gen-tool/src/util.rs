use anyhow::{Context, Result, bail};
use challenge_gen::{TimeWindow, parse_instant};
use chrono::{DateTime, Duration, Utc};

use challenge_gen::constants::WINDOW_DAYS;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Generation window from optional `--start`/`--end` values.
///
/// No bounds means next week; a start alone spans one week.
pub fn resolve_window(
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Utc>,
) -> Result<TimeWindow> {
    let window = match (start, end) {
        (None, None) => TimeWindow::next_week(now),
        (Some(start), end) => {
            let start = parse_instant(start).context("parsing --start")?;
            let end = match end {
                Some(end) => parse_instant(end).context("parsing --end")?,
                None => start + Duration::days(WINDOW_DAYS),
            };
            TimeWindow::from_dates(start, end)?
        }
        (None, Some(_)) => bail!("--end requires --start"),
    };
    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" 101, ,102,  103 ");
        assert_eq!(parts, vec!["101", "102", "103"]);
    }

    #[test]
    fn window_defaults_to_next_week() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let window = resolve_window(None, None, now).unwrap();
        assert_eq!(window, TimeWindow::next_week(now));
    }

    #[test]
    fn start_alone_spans_a_week() {
        let now = Utc::now();
        let window = resolve_window(Some("2026-10-19"), None, now).unwrap();
        assert_eq!(window.end - window.start, 7 * 86_400_000);
    }

    #[test]
    fn inverted_or_orphan_bounds_are_rejected() {
        let now = Utc::now();
        assert!(resolve_window(Some("2026-10-26"), Some("2026-10-19"), now).is_err());
        assert!(resolve_window(None, Some("2026-10-19"), now).is_err());
        assert!(resolve_window(Some("next monday"), None, now).is_err());
    }
}
