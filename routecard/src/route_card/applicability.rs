use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::commons::basic_functions::{format_distance, push_unique};

/// Classification of one check for one subject
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "meters")]
pub enum ApplicabilityCode {
    /// Section header row of the report
    Header,
    NonSpatial,
    AccessDenied,
    No,
    /// BEC check whose zones do not occur under the subject
    NotBecApplicable,
    /// Nothing overlaps, but a feature lies within this many metres
    WithinDistance(f64),
    BecApplicable,
    /// Species of management concern: overlap makes the check conditional
    Somc,
    Yes,
    /// Branch with no decided behaviour (max cutblock size for roads)
    NotImplemented,
}

impl ApplicabilityCode {
    /// Display priority; also the only direction a code may move in
    pub fn rank(&self) -> u8 {
        match self {
            ApplicabilityCode::Header | ApplicabilityCode::NonSpatial => 0,
            ApplicabilityCode::No | ApplicabilityCode::NotBecApplicable | ApplicabilityCode::NotImplemented => 1,
            ApplicabilityCode::WithinDistance(_) => 2,
            ApplicabilityCode::BecApplicable | ApplicabilityCode::Somc => 3,
            ApplicabilityCode::Yes => 4,
            ApplicabilityCode::AccessDenied => 5,
        }
    }

    /// Yes, BEC applicable or SOMC: a buffer search must not touch it
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            ApplicabilityCode::Yes | ApplicabilityCode::BecApplicable | ApplicabilityCode::Somc
        )
    }

    pub fn is_within(&self) -> bool {
        matches!(self, ApplicabilityCode::WithinDistance(_))
    }
}

impl fmt::Display for ApplicabilityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicabilityCode::Header => Ok(()),
            ApplicabilityCode::NonSpatial => write!(f, "Non Spatial"),
            ApplicabilityCode::AccessDenied => write!(f, "ACCESS DENIED"),
            ApplicabilityCode::No | ApplicabilityCode::NotBecApplicable => write!(f, "N"),
            ApplicabilityCode::WithinDistance(d) => write!(f, "Within {}m", format_distance(*d)),
            ApplicabilityCode::BecApplicable | ApplicabilityCode::Somc => write!(f, "BEC Applicable"),
            ApplicabilityCode::Yes => write!(f, "Y"),
            ApplicabilityCode::NotImplemented => write!(f, "Not Implemented"),
        }
    }
}

/// Outcome of one check: its code, what matched, and the canned text bound
/// during evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub code: ApplicabilityCode,
    pub statements: Vec<String>,
    pub canned_statement: String,
}

impl CheckResult {
    pub fn new(code: ApplicabilityCode, canned_statement: impl Into<String>) -> Self {
        CheckResult {
            code,
            statements: Vec::new(),
            canned_statement: canned_statement.into(),
        }
    }
}

/// Ordered check results of one subject plus the zones found under it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunResult {
    entries: Vec<(String, CheckResult)>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    pub existing_bec_zones: Vec<String>,
    pub sensitive_labels: Vec<String>,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a result; new labels go to the end
    pub fn insert(&mut self, label: impl Into<String>, result: CheckResult) {
        let label = label.into();
        match self.index.get(&label) {
            Some(&idx) => self.entries[idx].1 = result,
            None => {
                self.index.insert(label.clone(), self.entries.len());
                self.entries.push((label, result));
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&CheckResult> {
        self.index.get(label).map(|&idx| &self.entries[idx].1)
    }

    fn get_mut(&mut self, label: &str) -> Option<&mut CheckResult> {
        match self.index.get(label) {
            Some(&idx) => Some(&mut self.entries[idx].1),
            None => None,
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn code(&self, label: &str) -> Option<ApplicabilityCode> {
        self.get(label).map(|r| r.code)
    }

    /// Raise the code of `label`; a lower or equal code leaves it unchanged
    pub fn escalate(&mut self, label: &str, code: ApplicabilityCode) {
        if let Some(result) = self.get_mut(label) {
            if code.rank() > result.code.rank() {
                result.code = code;
            }
        }
    }

    /// Overwrite the code of `label` regardless of rank
    pub fn set_code(&mut self, label: &str, code: ApplicabilityCode) {
        if let Some(result) = self.get_mut(label) {
            result.code = code;
        }
    }

    /// Append a statement; empty text is dropped
    pub fn push_statement(&mut self, label: &str, statement: impl Into<String>) {
        let statement = statement.into();
        if statement.is_empty() {
            return;
        }
        if let Some(result) = self.get_mut(label) {
            result.statements.push(statement);
        }
    }

    pub fn statements_mut(&mut self, label: &str) -> Option<&mut Vec<String>> {
        self.get_mut(label).map(|r| &mut r.statements)
    }

    pub fn set_statements(&mut self, label: &str, statements: Vec<String>) {
        if let Some(result) = self.get_mut(label) {
            result.statements = statements;
        }
    }

    pub fn canned(&self, label: &str) -> &str {
        self.get(label).map(|r| r.canned_statement.as_str()).unwrap_or("")
    }

    pub fn set_canned(&mut self, label: &str, canned: impl Into<String>) {
        if let Some(result) = self.get_mut(label) {
            result.canned_statement = canned.into();
        }
    }

    pub fn mark_sensitive(&mut self, label: &str) {
        push_unique(&mut self.sensitive_labels, label.to_string());
    }

    pub fn is_sensitive(&self, label: &str) -> bool {
        self.sensitive_labels.iter().any(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CheckResult)> {
        self.entries.iter().map(|(label, result)| (label.as_str(), result))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Split into (main, sensitive) lists, both in evaluation order
    pub fn partition(&self) -> (Vec<(&str, &CheckResult)>, Vec<(&str, &CheckResult)>) {
        self.iter().partition(|(label, _)| !self.is_sensitive(label))
    }
}
