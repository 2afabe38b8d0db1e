//! Selection criteria and the matcher that filters participants by them.
//!
//! Point criteria are clauses such as `green leaves > 50 && Walk_Km >= 10`.
//! Badge criteria are clauses such as `green leaves:King && !Novice`, where a
//! bare badge matches in any collection and `!` negates the clause.
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::error::GenerationError;
use crate::participant::ParticipantSnapshot;
use crate::rules::RuleRecord;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("invalid point criterion {clause:?}")]
    InvalidPointClause { clause: String },
    #[error("invalid badge criterion {clause:?}")]
    InvalidBadgeClause { clause: String },
}

impl From<CriteriaError> for GenerationError {
    fn from(err: CriteriaError) -> Self {
        Self::malformed(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Comparison {
    fn parse(op: &str) -> Option<Self> {
        match op {
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            _ => None,
        }
    }

    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Eq => (lhs - rhs).abs() < f64::EPSILON,
            Self::Ne => (lhs - rhs).abs() >= f64::EPSILON,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointClause {
    pub point: String,
    pub op: Comparison,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeClause {
    pub collection: Option<String>,
    pub badge: String,
    pub negated: bool,
}

fn clause_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| {
        Regex::new(r"\s*&&\s*").unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

fn point_clause_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([^<>=!]+?)\s*(>=|<=|==|!=|>|<)\s*(-?\d+(?:\.\d+)?)\s*$")
            .unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

fn split_clauses(source: &str) -> impl Iterator<Item = &str> {
    clause_separator()
        .split(source)
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
}

fn parse_point_clause(clause: &str) -> Result<PointClause, CriteriaError> {
    let invalid = || CriteriaError::InvalidPointClause {
        clause: clause.to_string(),
    };
    let caps = point_clause_pattern().captures(clause).ok_or_else(invalid)?;
    let op = Comparison::parse(&caps[2]).ok_or_else(invalid)?;
    let value = caps[3].parse::<f64>().map_err(|_| invalid())?;
    Ok(PointClause {
        point: caps[1].to_string(),
        op,
        value,
    })
}

fn parse_badge_clause(clause: &str) -> Result<BadgeClause, CriteriaError> {
    let (negated, body) = clause
        .strip_prefix('!')
        .map_or((false, clause), |rest| (true, rest.trim()));
    let (collection, badge) = match body.split_once(':') {
        Some((collection, badge)) => (Some(collection.trim().to_string()), badge.trim()),
        None => (None, body),
    };
    if badge.is_empty() || collection.as_deref().is_some_and(str::is_empty) {
        return Err(CriteriaError::InvalidBadgeClause {
            clause: clause.to_string(),
        });
    }
    Ok(BadgeClause {
        collection,
        badge: badge.to_string(),
        negated,
    })
}

/// Filters participants by a single rule's selection criteria.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EligibilityMatcher {
    points: Vec<PointClause>,
    badges: Vec<BadgeClause>,
}

impl EligibilityMatcher {
    /// # Errors
    ///
    /// Returns a [`CriteriaError`] when a clause cannot be parsed.
    pub fn parse(points: &str, badges: &str) -> Result<Self, CriteriaError> {
        Ok(Self {
            points: split_clauses(points)
                .map(parse_point_clause)
                .collect::<Result<_, _>>()?,
            badges: split_clauses(badges)
                .map(parse_badge_clause)
                .collect::<Result<_, _>>()?,
        })
    }

    /// # Errors
    ///
    /// Returns a [`CriteriaError`] when the rule's criteria cannot be parsed.
    pub fn for_rule(rule: &RuleRecord) -> Result<Self, CriteriaError> {
        Self::parse(
            &rule.selection_criteria_points,
            &rule.selection_criteria_badges,
        )
    }

    /// True when no criteria were given, so every participant qualifies.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.points.is_empty() && self.badges.is_empty()
    }

    #[must_use]
    pub fn matches(&self, participant: &ParticipantSnapshot) -> bool {
        let points_ok = self
            .points
            .iter()
            .all(|c| c.op.holds(participant.score(&c.point), c.value));
        let badges_ok = self.badges.iter().all(|c| {
            participant.has_badge(c.collection.as_deref(), &c.badge) != c.negated
        });
        points_ok && badges_ok
    }

    /// Participants satisfying every clause, in input order.
    #[must_use]
    pub fn select<'a>(&self, participants: &'a [ParticipantSnapshot]) -> Vec<&'a ParticipantSnapshot> {
        participants.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Participants eligible for `rule`.
///
/// # Errors
///
/// Returns [`GenerationError::MalformedInput`] if the rule's criteria are invalid.
pub fn match_participants<'a>(
    rule: &RuleRecord,
    participants: &'a [ParticipantSnapshot],
) -> Result<Vec<&'a ParticipantSnapshot>, GenerationError> {
    let matcher = EligibilityMatcher::for_rule(rule)?;
    Ok(matcher.select(participants))
}
