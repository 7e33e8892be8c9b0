//! Immutable metric value objects produced by one analysis run.
//!
//! Field names are the JSON shape handed to the reporting collaborators.

use serde::{Deserialize, Serialize};

use super::quality_measure::MeasureCategory;
use crate::period::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharedSavingsStatus {
    /// Quality gate passed; `shared_savings_amount` is final.
    Finalized,
    /// Quality data still pending; the would-be amount is reported in
    /// `provisional_shared_savings` only.
    Provisional,
    /// Quality gate not met.
    Suppressed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub period: Period,
    pub baseline_spending: f64,
    pub sharing_rate: f64,
    pub target_reduction_pct: f64,

    pub medical_spending: f64,
    pub pharmacy_spending: f64,
    pub actual_spending: f64,
    pub total_savings: f64,
    pub savings_percentage: f64,
    pub shared_savings_amount: f64,
    pub shared_savings_status: SharedSavingsStatus,
    pub provisional_shared_savings: f64,

    pub member_months: u64,
    pub average_members: f64,
    pub baseline_pmpm: f64,
    pub actual_pmpm: f64,
    pub target_pmpm: f64,

    pub total_admits: u64,
    pub total_er_visits: u64,
    pub admits_per_1000: f64,
    pub er_visits_per_1000: f64,
    pub generic_dispensing_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityGateStatus {
    /// Not enough measure data reported for the period.
    Pending,
    Eligible,
    /// Below threshold, but the gap is closable in the remaining months.
    AtRisk,
    Ineligible,
}

impl QualityGateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Eligible => "eligible",
            Self::AtRisk => "at_risk",
            Self::Ineligible => "ineligible",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureScore {
    pub measure_id: String,
    pub category: MeasureCategory,
    pub performance_rate: Option<f64>,
    pub benchmark: Option<f64>,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub composite_score: f64,
    pub quality_threshold: f64,
    pub quality_gate_status: QualityGateStatus,

    pub preventive_care_score: f64,
    pub chronic_disease_score: f64,
    pub care_coordination_score: f64,
    pub patient_experience_score: f64,

    /// Share of current measures with a reportable denominator, 0–1.
    pub reporting_completeness: f64,
    /// Composite change per month, when at least two months are reported.
    pub trend_per_month: Option<f64>,
    pub projected_year_end_score: Option<f64>,
    pub measures: Vec<MeasureScore>,
}

impl QualityMetrics {
    pub fn category_score(&self, category: MeasureCategory) -> f64 {
        match category {
            MeasureCategory::PreventiveCare => self.preventive_care_score,
            MeasureCategory::ChronicDisease => self.chronic_disease_score,
            MeasureCategory::CareCoordination => self.care_coordination_score,
            MeasureCategory::PatientExperience => self.patient_experience_score,
        }
    }

    pub fn shortfall(&self) -> f64 {
        (self.quality_threshold - self.composite_score).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskStratification {
    pub total_members: u64,
    pub low_risk_count: u64,
    pub medium_risk_count: u64,
    pub high_risk_count: u64,
    pub low_risk_pct: f64,
    pub medium_risk_pct: f64,
    pub high_risk_pct: f64,
    pub average_risk_score: f64,

    pub low_risk_spending: f64,
    pub medium_risk_spending: f64,
    pub high_risk_spending: f64,
    pub low_risk_pmpm: f64,
    pub medium_risk_pmpm: f64,
    pub high_risk_pmpm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Financial,
    Utilization,
    Quality,
    Population,
    Pharmacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSeverity {
    High,
    Medium,
    Low,
    Positive,
}

/// A structured risk or opportunity. Turning it into prose is the job of a
/// downstream renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub category: InsightCategory,
    pub severity: InsightSeverity,
    pub title: String,
    pub description: String,
    pub impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub current_month: i8,
    pub projected_year_end_spending: f64,
    pub projected_year_end_savings: f64,
    pub projected_savings_percentage: f64,
    pub projected_shared_savings: f64,
    pub savings_lower_bound: f64,
    pub savings_upper_bound: f64,
    pub target_savings: f64,

    /// Percentages, 0–100.
    pub probability_meeting_target: f64,
    pub probability_shared_savings: f64,
    pub probability_quality_gate: f64,
    pub projected_quality_score: f64,

    pub risks: Vec<Insight>,
    pub opportunities: Vec<Insight>,
}

/// The finalized metrics object for one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub contract_id: String,
    pub period: Period,
    pub financial: FinancialMetrics,
    pub quality: QualityMetrics,
    pub risk: RiskStratification,
    pub predictions: Predictions,
}
