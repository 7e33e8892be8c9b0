use serde::{Deserialize, Serialize};

use super::member::RiskCategory;
use super::quality_measure::MeasureCategory;
use crate::error::CoreError;

/// Per-contract rule configuration. Supplied by the contract owner, never
/// hard-coded in the engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractParams {
    pub contract_id: String,
    /// Annual benchmark expenditure.
    pub baseline_spending: f64,
    #[serde(default = "default_sharing_rate")]
    pub sharing_rate: f64,
    #[serde(default = "default_target_reduction_pct")]
    pub target_reduction_pct: f64,
    /// Composite quality score (0–100) required for shared-savings eligibility.
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
    #[serde(default)]
    pub risk_cut_points: RiskCutPoints,
    #[serde(default)]
    pub category_weights: CategoryWeights,
}

fn default_sharing_rate() -> f64 {
    0.50
}

fn default_target_reduction_pct() -> f64 {
    0.05
}

fn default_quality_threshold() -> f64 {
    80.0
}

impl ContractParams {
    pub fn new(contract_id: impl Into<String>, baseline_spending: f64) -> Self {
        Self {
            contract_id: contract_id.into(),
            baseline_spending,
            sharing_rate: default_sharing_rate(),
            target_reduction_pct: default_target_reduction_pct(),
            quality_threshold: default_quality_threshold(),
            risk_cut_points: RiskCutPoints::default(),
            category_weights: CategoryWeights::default(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let fail = |reason: String| {
            Err(CoreError::InvalidContractParams {
                contract_id: self.contract_id.clone(),
                reason,
            })
        };

        if !self.baseline_spending.is_finite() || self.baseline_spending <= 0.0 {
            return fail(format!(
                "baseline_spending must be positive, got {}",
                self.baseline_spending
            ));
        }
        if !(0.0..=1.0).contains(&self.sharing_rate) {
            return fail(format!("sharing_rate {} outside [0, 1]", self.sharing_rate));
        }
        if !(0.0..1.0).contains(&self.target_reduction_pct) {
            return fail(format!(
                "target_reduction_pct {} outside [0, 1)",
                self.target_reduction_pct
            ));
        }
        if !(0.0..=100.0).contains(&self.quality_threshold) {
            return fail(format!(
                "quality_threshold {} outside [0, 100]",
                self.quality_threshold
            ));
        }

        let cuts = &self.risk_cut_points;
        if !(cuts.low_max > 0.0 && cuts.low_max < cuts.high_min && cuts.high_min.is_finite()) {
            return fail(format!(
                "risk cut points must satisfy 0 < low_max < high_min, got {} / {}",
                cuts.low_max, cuts.high_min
            ));
        }

        let weights = &self.category_weights;
        if MeasureCategory::ALL
            .iter()
            .any(|c| !(0.0..=1.0).contains(&weights.get(*c)))
        {
            return fail("category weights must each lie in [0, 1]".to_string());
        }
        if (weights.sum() - 1.0).abs() > 1e-6 {
            return fail(format!("category weights sum to {}, expected 1", weights.sum()));
        }

        Ok(())
    }
}

/// HCC score cut points: `Low < low_max <= Medium < high_min <= High`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskCutPoints {
    pub low_max: f64,
    pub high_min: f64,
}

impl Default for RiskCutPoints {
    fn default() -> Self {
        Self {
            low_max: 0.8,
            high_min: 1.5,
        }
    }
}

impl RiskCutPoints {
    pub fn categorize(&self, score: f64) -> RiskCategory {
        if score < self.low_max {
            RiskCategory::Low
        } else if score < self.high_min {
            RiskCategory::Medium
        } else {
            RiskCategory::High
        }
    }
}

/// Weight of each quality category in the composite score. Sums to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub preventive_care: f64,
    pub chronic_disease: f64,
    pub care_coordination: f64,
    pub patient_experience: f64,
}

impl Default for CategoryWeights {
    /// 1 : 2 : 1.5 : 1, normalised.
    fn default() -> Self {
        let total = 5.5;
        Self {
            preventive_care: 1.0 / total,
            chronic_disease: 2.0 / total,
            care_coordination: 1.5 / total,
            patient_experience: 1.0 / total,
        }
    }
}

impl CategoryWeights {
    pub fn get(&self, category: MeasureCategory) -> f64 {
        match category {
            MeasureCategory::PreventiveCare => self.preventive_care,
            MeasureCategory::ChronicDisease => self.chronic_disease,
            MeasureCategory::CareCoordination => self.care_coordination,
            MeasureCategory::PatientExperience => self.patient_experience,
        }
    }

    pub fn sum(&self) -> f64 {
        self.preventive_care + self.chronic_disease + self.care_coordination + self.patient_experience
    }
}
