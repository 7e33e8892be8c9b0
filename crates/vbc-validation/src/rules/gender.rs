use std::collections::{BTreeSet, HashMap};

use vbc_core::models::dataset::{Dataset, DatasetKind, RecordRef};
use vbc_core::models::member::Gender;
use vbc_core::models::validation::{RemediationAction, RuleId, Severity, ValidationResult};

use crate::context::ValidationContext;
use crate::error::ValidationError;
use crate::record::Finding;

/// Male members billed with a pregnancy-only diagnosis. When a member id
/// repeats, the first row decides.
fn mismatched_members(dataset: &Dataset) -> BTreeSet<String> {
    let mut genders: HashMap<&str, Option<Gender>> = HashMap::new();
    for member in &dataset.members {
        genders.entry(member.member_id.as_str()).or_insert(member.gender);
    }

    dataset
        .medical_claims
        .iter()
        .filter(|c| c.has_pregnancy_diagnosis())
        .filter(|c| genders.get(c.member_id.as_str()) == Some(&Some(Gender::Male)))
        .map(|c| c.member_id.clone())
        .collect()
}

pub fn evaluate(dataset: &Dataset, ctx: &ValidationContext) -> Vec<ValidationResult> {
    let members = mismatched_members(dataset);
    if members.is_empty() {
        return Vec::new();
    }
    let count = members.len();
    let fixable = count < ctx.thresholds.gender_fix_member_limit;
    let refs = members
        .into_iter()
        .map(|id| RecordRef::new(DatasetKind::Members, id))
        .collect();
    vec![
        Finding::new(
            RuleId::GenderDiagnosis,
            DatasetKind::Members,
            Severity::Critical,
            dataset.members.len(),
        )
        .field("gender")
        .affected(refs)
        .auto_fixable(fixable)
        .describe(format!(
            "{count} male members have claims with a pregnancy-only diagnosis"
        )),
    ]
}

pub fn remediate(
    dataset: &mut Dataset,
    _finding: &ValidationResult,
    ctx: &ValidationContext,
) -> Result<Option<RemediationAction>, ValidationError> {
    let members = mismatched_members(dataset);
    if members.is_empty() || members.len() >= ctx.thresholds.gender_fix_member_limit {
        return Ok(None);
    }
    let mut fixed = Vec::new();
    for member in dataset
        .members
        .iter_mut()
        .filter(|m| members.contains(&m.member_id))
    {
        member.gender = Some(Gender::Female);
        fixed.push(RecordRef::new(DatasetKind::Members, member.member_id.clone()));
    }
    Ok(Some(RemediationAction {
        rule: RuleId::GenderDiagnosis,
        dataset: DatasetKind::Members,
        description: format!(
            "set gender to F on {} members with pregnancy diagnoses",
            fixed.len()
        ),
        records: fixed,
    }))
}
