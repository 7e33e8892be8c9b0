use std::fmt;

use serde::{Deserialize, Serialize};

use super::dataset::{DatasetKind, RecordRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    RequiredFields,
    NullRate,
    AgeRange,
    CostAmount,
    ServiceAfterPaid,
    FutureServiceDate,
    GenderDiagnosis,
    Duplicates,
    MeasureIntegrity,
    VolumeConsistency,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequiredFields => "required_fields",
            Self::NullRate => "null_rate",
            Self::AgeRange => "age_range",
            Self::CostAmount => "cost_amount",
            Self::ServiceAfterPaid => "service_after_paid",
            Self::FutureServiceDate => "future_service_date",
            Self::GenderDiagnosis => "gender_diagnosis",
            Self::Duplicates => "duplicates",
            Self::MeasureIntegrity => "measure_integrity",
            Self::VolumeConsistency => "volume_consistency",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
}

/// One rule violation found in one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub rule: RuleId,
    pub dataset: DatasetKind,
    pub severity: Severity,
    /// Field the violation concerns, when the rule is field-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub affected: Vec<RecordRef>,
    pub affected_count: usize,
    pub total_records: usize,
    pub auto_fixable: bool,
    pub description: String,
}

impl ValidationResult {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }

    pub fn affected_pct(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        self.affected_count as f64 / self.total_records as f64 * 100.0
    }
}

/// A fix applied to the dataset by the remediation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationAction {
    pub rule: RuleId,
    pub dataset: DatasetKind,
    pub records: Vec<RecordRef>,
    pub description: String,
}

/// Everything one validation run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Violations found before remediation.
    pub findings: Vec<ValidationResult>,
    pub remediations: Vec<RemediationAction>,
    /// Violations still present after remediation.
    pub unresolved: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn unresolved_critical(&self) -> impl Iterator<Item = &ValidationResult> {
        self.unresolved.iter().filter(|r| r.is_critical())
    }

    pub fn unresolved_warnings(&self) -> impl Iterator<Item = &ValidationResult> {
        self.unresolved.iter().filter(|r| !r.is_critical())
    }

    pub fn passed(&self) -> bool {
        self.unresolved_critical().next().is_none()
    }

    /// Number of records touched by remediation.
    pub fn fix_count(&self) -> usize {
        self.remediations.iter().map(|a| a.records.len()).sum()
    }
}
