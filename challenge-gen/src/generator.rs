//! Expands matched rules and recommended modes into challenge instances.
use std::collections::HashSet;

use crate::challenge::{ChallengeInstance, ChallengeModel, TemplateDefaults};
use crate::criteria::match_participants;
use crate::error::GenerationError;
use crate::participant::ParticipantSnapshot;
use crate::recommend::SelectionMap;
use crate::report::{GenerationReport, ReportRow, RuleOutcome};
use crate::rules::RuleRecord;
use crate::window::TimeWindow;

/// Accumulates de-duplicated instances for one run.
///
/// At most one instance exists per (participant, template key), and every
/// instance name is unique within the run. A rule's instances are staged and only merged once the whole rule succeeds, so a
/// failing rule leaves no partial output behind.
#[derive(Debug, Clone)]
pub struct ChallengeInstanceGenerator {
    window: TimeWindow,
    defaults: TemplateDefaults,
    seen: HashSet<(String, String)>,
    names: HashSet<String>,
    instances: Vec<ChallengeInstance>,
}

impl ChallengeInstanceGenerator {
    #[must_use]
    pub fn new(window: TimeWindow, defaults: TemplateDefaults) -> Self {
        Self {
            window,
            defaults,
            seen: HashSet::new(),
            names: HashSet::new(),
            instances: Vec::new(),
        }
    }

    #[must_use]
    pub const fn window(&self) -> &TimeWindow {
        &self.window
    }

    #[must_use]
    pub fn instances(&self) -> &[ChallengeInstance] {
        &self.instances
    }

    #[must_use]
    pub fn into_instances(self) -> Vec<ChallengeInstance> {
        self.instances
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instances for `rule` over already-matched participants. Returns how
    /// many new instances were merged.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::UndefinedChallenge`] when the rule's template
    /// cannot be resolved or filled, and [`GenerationError::DuplicateName`]
    /// when an instance name is already taken by a different challenge.
    /// Nothing is merged in either case.
    pub fn generate_for_rule(
        &mut self,
        rule: &RuleRecord,
        matched: &[&ParticipantSnapshot],
    ) -> Result<usize, GenerationError> {
        let model = ChallengeModel::resolve(rule)?;
        let mut staged = Vec::with_capacity(matched.len());
        let mut staged_keys = HashSet::new();
        let mut staged_names = HashSet::new();
        for participant in matched {
            let key = (participant.player_id.clone(), rule.name.clone());
            if self.seen.contains(&key) || staged_keys.contains(&key) {
                log::debug!(
                    "skipping duplicate challenge {} for player {}",
                    rule.name,
                    participant.player_id
                );
                continue;
            }
            let fields = model.rule_fields(rule, participant, &self.defaults)?;
            let instance = ChallengeInstance::new(
                &rule.name,
                &participant.player_id,
                model,
                fields,
                &self.window,
            );
            if self.names.contains(&instance.name) || !staged_names.insert(instance.name.clone()) {
                return Err(GenerationError::DuplicateName {
                    name: instance.name,
                    rule: rule.name.clone(),
                });
            }
            staged.push(instance);
            staged_keys.insert(key);
        }
        let count = staged.len();
        self.seen.extend(staged_keys);
        self.names.extend(staged_names);
        self.instances.extend(staged);
        Ok(count)
    }

    /// Match, generate and record one report row for `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::NoMatch`] when nobody qualifies, otherwise
    /// the matching or generation error. A row is recorded in every case.
    pub fn process_rule(
        &mut self,
        rule: &RuleRecord,
        participants: &[ParticipantSnapshot],
        report: &mut GenerationReport,
    ) -> Result<usize, GenerationError> {
        let mut row = ReportRow {
            rule: rule.name.clone(),
            model: rule.model_name.clone(),
            matched: 0,
            generated: 0,
            outcome: RuleOutcome::Generated,
        };
        let matched = match match_participants(rule, participants) {
            Ok(matched) => matched,
            Err(err) => {
                row.outcome = RuleOutcome::Failed(err.to_string());
                report.push(row);
                return Err(err);
            }
        };
        row.matched = matched.len();
        if matched.is_empty() {
            row.outcome = RuleOutcome::NoParticipants;
            report.push(row);
            return Err(GenerationError::NoMatch {
                subject: format!("rule {}", rule.name),
            });
        }
        match self.generate_for_rule(rule, &matched) {
            Ok(count) => {
                row.generated = count;
                report.push(row);
                Ok(count)
            }
            Err(err) => {
                row.outcome = RuleOutcome::Failed(err.to_string());
                report.push(row);
                Err(err)
            }
        }
    }

    /// Personalized `absoluteIncrement` instances for every selection.
    pub fn generate_recommendations(&mut self, selections: &SelectionMap, bonus: f64) -> usize {
        let mut count = 0;
        for (player_id, modes) in selections.iter() {
            for selection in modes {
                let template_key = selection.template_key();
                if !self.seen.insert((player_id.clone(), template_key.clone())) {
                    log::debug!("skipping duplicate challenge {template_key} for player {player_id}");
                    continue;
                }
                let fields = ChallengeModel::recommendation_fields(selection, bonus, &self.defaults);
                let instance = ChallengeInstance::new(
                    &template_key,
                    player_id,
                    ChallengeModel::AbsoluteIncrement,
                    fields,
                    &self.window,
                );
                if !self.names.insert(instance.name.clone()) {
                    log::warn!("skipping {}: name already taken", instance.name);
                    continue;
                }
                self.instances.push(instance);
                count += 1;
            }
        }
        count
    }
}
