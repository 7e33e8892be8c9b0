//! vbc-validation
//!
//! Data-quality rules for contract extracts. Pure: no I/O, no clock. Each
//! rule can report violations and, for the defect patterns that are safe to
//! repair, fix them in place.

pub mod context;
pub mod error;
pub mod record;
pub mod rules;

use tracing::{debug, info, warn};
use vbc_core::models::dataset::Dataset;
use vbc_core::models::validation::{RemediationAction, RuleId, ValidationReport, ValidationResult};

pub use context::{Thresholds, ValidationContext};
pub use error::ValidationError;

/// The closed set of data-quality rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
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

impl Rule {
    pub fn id(&self) -> RuleId {
        match self {
            Self::RequiredFields => RuleId::RequiredFields,
            Self::NullRate => RuleId::NullRate,
            Self::AgeRange => RuleId::AgeRange,
            Self::CostAmount => RuleId::CostAmount,
            Self::ServiceAfterPaid => RuleId::ServiceAfterPaid,
            Self::FutureServiceDate => RuleId::FutureServiceDate,
            Self::GenderDiagnosis => RuleId::GenderDiagnosis,
            Self::Duplicates => RuleId::Duplicates,
            Self::MeasureIntegrity => RuleId::MeasureIntegrity,
            Self::VolumeConsistency => RuleId::VolumeConsistency,
        }
    }

    /// Scan the whole dataset. Never mutates.
    pub fn evaluate(&self, dataset: &Dataset, ctx: &ValidationContext) -> Vec<ValidationResult> {
        match self {
            Self::RequiredFields => rules::required::evaluate_required(dataset, ctx),
            Self::NullRate => rules::required::evaluate_null_rate(dataset, ctx),
            Self::AgeRange => rules::age::evaluate(dataset, ctx),
            Self::CostAmount => rules::cost::evaluate(dataset, ctx),
            Self::ServiceAfterPaid => rules::dates::evaluate_service_after_paid(dataset, ctx),
            Self::FutureServiceDate => rules::dates::evaluate_future_service_date(dataset, ctx),
            Self::GenderDiagnosis => rules::gender::evaluate(dataset, ctx),
            Self::Duplicates => rules::duplicates::evaluate(dataset, ctx),
            Self::MeasureIntegrity => rules::measures::evaluate(dataset, ctx),
            Self::VolumeConsistency => rules::volume::evaluate(dataset, ctx),
        }
    }

    /// Fix what `finding` reported, if the rule knows how. Returns `None`
    /// when nothing was changed, which makes repeated calls safe.
    pub fn remediate(
        &self,
        dataset: &mut Dataset,
        finding: &ValidationResult,
        ctx: &ValidationContext,
    ) -> Result<Option<RemediationAction>, ValidationError> {
        match self {
            Self::CostAmount => rules::cost::remediate(dataset, finding, ctx),
            Self::FutureServiceDate => {
                rules::dates::remediate_future_service_date(dataset, finding, ctx)
            }
            Self::GenderDiagnosis => rules::gender::remediate(dataset, finding, ctx),
            Self::Duplicates => rules::duplicates::remediate(dataset, finding, ctx),
            Self::RequiredFields
            | Self::NullRate
            | Self::AgeRange
            | Self::ServiceAfterPaid
            | Self::MeasureIntegrity
            | Self::VolumeConsistency => Ok(None),
        }
    }
}

/// Rules in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn standard() -> Self {
        Self {
            rules: vec![
                Rule::RequiredFields,
                Rule::NullRate,
                Rule::AgeRange,
                Rule::CostAmount,
                Rule::ServiceAfterPaid,
                Rule::FutureServiceDate,
                Rule::GenderDiagnosis,
                Rule::Duplicates,
                Rule::MeasureIntegrity,
                Rule::VolumeConsistency,
            ],
        }
    }

    pub fn only(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    fn rule_for(&self, id: RuleId) -> Option<Rule> {
        self.rules.iter().copied().find(|r| r.id() == id)
    }

    pub fn evaluate(&self, dataset: &Dataset, ctx: &ValidationContext) -> Vec<ValidationResult> {
        self.rules
            .iter()
            .flat_map(|rule| rule.evaluate(dataset, ctx))
            .collect()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// The remediated dataset together with what was found and fixed.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub dataset: Dataset,
    pub report: ValidationReport,
}

/// Upper bound on evaluate-then-fix rounds. Every fix shrinks the set of
/// defects it can act on, so a dataset settles well before this.
pub const MAX_REMEDIATION_PASSES: usize = 5;

/// Evaluate every rule and apply fixes for auto-fixable findings in finding
/// order, repeating until a pass changes nothing. A fix can move another
/// rule across its threshold: dropping duplicates changes the
/// negative-amount ratio. The report keeps the findings of the first pass and every action taken;
/// the final evaluation decides what remains unresolved.
pub fn validate(
    dataset: Dataset,
    rule_set: &RuleSet,
    ctx: &ValidationContext,
) -> Result<ValidationOutcome, ValidationError> {
    ctx.thresholds.check()?;

    let findings = rule_set.evaluate(&dataset, ctx);
    debug!(findings = findings.len(), "validation pass complete");

    let mut dataset = dataset;
    let mut remediations = Vec::new();
    let mut current = findings.clone();
    for pass in 1..=MAX_REMEDIATION_PASSES {
        let applied = remediate_pass(&mut dataset, &current, rule_set, ctx)?;
        if applied.is_empty() {
            break;
        }
        remediations.extend(applied);
        current = rule_set.evaluate(&dataset, ctx);
        debug!(pass, findings = current.len(), "remediation pass complete");
        if pass == MAX_REMEDIATION_PASSES {
            warn!(passes = pass, "remediation stopped at the pass limit");
        }
    }

    let unresolved = current;
    for result in &unresolved {
        if result.is_critical() {
            warn!(
                rule = %result.rule,
                dataset = %result.dataset,
                affected = result.affected_count,
                "unresolved critical finding: {}",
                result.description
            );
        } else {
            warn!(
                rule = %result.rule,
                dataset = %result.dataset,
                affected = result.affected_count,
                "unresolved warning: {}",
                result.description
            );
        }
    }

    Ok(ValidationOutcome {
        dataset,
        report: ValidationReport {
            findings,
            remediations,
            unresolved,
        },
    })
}

fn remediate_pass(
    dataset: &mut Dataset,
    findings: &[ValidationResult],
    rule_set: &RuleSet,
    ctx: &ValidationContext,
) -> Result<Vec<RemediationAction>, ValidationError> {
    let mut applied = Vec::new();
    for finding in findings.iter().filter(|f| f.auto_fixable) {
        let Some(rule) = rule_set.rule_for(finding.rule) else {
            continue;
        };
        if let Some(action) = rule.remediate(dataset, finding, ctx)? {
            info!(
                rule = %action.rule,
                dataset = %action.dataset,
                records = action.records.len(),
                "remediation applied"
            );
            applied.push(action);
        }
    }
    Ok(applied)
}
