//! HCC risk stratification of the attributed population.

use std::collections::HashMap;

use vbc_core::Period;
use vbc_core::models::contract::RiskCutPoints;
use vbc_core::models::dataset::Dataset;
use vbc_core::models::member::{Member, RiskCategory};
use vbc_core::models::metrics::RiskStratification;

use crate::error::MetricsError;
use crate::financial::{medical_in_period, months_attributed, pharmacy_in_period};

/// Score used for members the extract carries no HCC score for.
pub const NEUTRAL_RISK_SCORE: f64 = 1.0;

pub fn risk_score(member: &Member) -> f64 {
    member.hcc_risk_score.unwrap_or(NEUTRAL_RISK_SCORE)
}

pub fn categorize(member: &Member, cuts: &RiskCutPoints) -> RiskCategory {
    cuts.categorize(risk_score(member))
}

/// Stamp each member with the category [`stratify`] counts them under,
/// replacing whatever category the extract carried.
pub fn assign_categories(members: &mut [Member], cuts: &RiskCutPoints) {
    for member in members {
        member.risk_category = Some(categorize(member, cuts));
    }
}

#[derive(Default, Clone, Copy)]
struct Bucket {
    count: u64,
    spending: f64,
    member_months: u64,
}

fn pct(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn pmpm(bucket: &Bucket) -> f64 {
    if bucket.member_months == 0 {
        0.0
    } else {
        bucket.spending / bucket.member_months as f64
    }
}

pub fn stratify(
    dataset: &Dataset,
    cuts: &RiskCutPoints,
    period: &Period,
) -> Result<RiskStratification, MetricsError> {
    let mut buckets = [Bucket::default(); 3];
    let mut categories: HashMap<&str, RiskCategory> = HashMap::new();

    for member in &dataset.members {
        let category = categorize(member, cuts);
        categories.insert(member.member_id.as_str(), category);
        let bucket = &mut buckets[category as usize];
        bucket.count += 1;
        bucket.member_months += u64::from(months_attributed(member, period)?);
    }

    let medical = medical_in_period(&dataset.medical_claims, period)
        .map(|c| (c.member_id.as_str(), c.paid_amount));
    let pharmacy = pharmacy_in_period(&dataset.pharmacy_claims, period)
        .map(|c| (c.member_id.as_str(), c.paid_amount));
    for (member_id, amount) in medical.chain(pharmacy) {
        if let (Some(category), Some(amount)) = (categories.get(member_id), amount) {
            buckets[*category as usize].spending += amount;
        }
    }

    let total = dataset.members.len() as u64;
    let average_risk_score = if dataset.members.is_empty() {
        0.0
    } else {
        dataset.members.iter().map(risk_score).sum::<f64>() / dataset.members.len() as f64
    };
    let [low, medium, high] = buckets;

    Ok(RiskStratification {
        total_members: total,
        low_risk_count: low.count,
        medium_risk_count: medium.count,
        high_risk_count: high.count,
        low_risk_pct: pct(low.count, total),
        medium_risk_pct: pct(medium.count, total),
        high_risk_pct: pct(high.count, total),
        average_risk_score,
        low_risk_spending: low.spending,
        medium_risk_spending: medium.spending,
        high_risk_spending: high.spending,
        low_risk_pmpm: pmpm(&low),
        medium_risk_pmpm: pmpm(&medium),
        high_risk_pmpm: pmpm(&high),
    })
}
