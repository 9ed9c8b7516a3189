//! Roll-up computed from other checks: the access umbrella

use log::debug;

use crate::collect::global_variables::{ACCESS_LABEL, CONSTRAINT_LABELS};
use crate::commons::basic_functions::push_unique;
use crate::route_card::applicability::{ApplicabilityCode, RunResult};

const BEC_CONSTRAINT_PREFIX: &str = "BEC:";

/// Access umbrella contributions collected while the checks run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AccessRollup {
    parts: Vec<String>,
}

impl AccessRollup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after each check: a constraint label that came out `Y`
    /// raises the umbrella and is listed in its statement
    pub fn note_check(&mut self, result: &mut RunResult, label: &str) {
        if !result.contains(ACCESS_LABEL) || !CONSTRAINT_LABELS.contains(&label) {
            return;
        }
        if result.code(label) == Some(ApplicabilityCode::Yes) {
            debug!("{} raises {}", label, ACCESS_LABEL);
            result.set_code(ACCESS_LABEL, ApplicabilityCode::Yes);
            push_unique(&mut self.parts, label.to_string());
        }
    }

    /// `BEC:<prefix>` constraints match the zones cached during the run.
    /// The first zone with the prefix is listed for each constraint.
    pub fn note_bec_zones(&mut self, result: &mut RunResult) {
        if !result.contains(ACCESS_LABEL) {
            return;
        }
        let zones = result.existing_bec_zones.clone();
        for constraint in CONSTRAINT_LABELS {
            let Some(prefix) = constraint.strip_prefix(BEC_CONSTRAINT_PREFIX) else {
                continue;
            };
            if let Some(zone) = zones.iter().find(|zone| zone.starts_with(prefix)) {
                debug!("BEC zone {} raises {}", zone, ACCESS_LABEL);
                result.set_code(ACCESS_LABEL, ApplicabilityCode::Yes);
                push_unique(&mut self.parts, format!("BEC {}", zone));
            }
        }
    }

    /// Write the collected labels as the umbrella's single statement
    pub fn finish(self, result: &mut RunResult) {
        if self.parts.is_empty() || !result.contains(ACCESS_LABEL) {
            return;
        }
        result.set_statements(ACCESS_LABEL, vec![self.parts.join(", ")]);
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }
}
