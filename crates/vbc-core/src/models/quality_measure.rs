use serde::{Deserialize, Serialize};

use crate::period::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureCategory {
    PreventiveCare,
    ChronicDisease,
    CareCoordination,
    PatientExperience,
}

impl MeasureCategory {
    pub const ALL: [MeasureCategory; 4] = [
        MeasureCategory::PreventiveCare,
        MeasureCategory::ChronicDisease,
        MeasureCategory::CareCoordination,
        MeasureCategory::PatientExperience,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreventiveCare => "preventive_care",
            Self::ChronicDisease => "chronic_disease",
            Self::CareCoordination => "care_coordination",
            Self::PatientExperience => "patient_experience",
        }
    }
}

/// A reported quality measure for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMeasure {
    pub measure_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<MeasureCategory>,
    pub numerator: u32,
    pub denominator: u32,
    #[serde(default)]
    pub exclusions: u32,
    #[serde(default)]
    pub benchmark: Option<f64>,
    /// Relative weight within the category, in `[0, 1]`.
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub period: Period,
}

fn default_weight() -> f64 {
    1.0
}

impl QualityMeasure {
    pub fn eligible_denominator(&self) -> u32 {
        self.denominator.saturating_sub(self.exclusions)
    }

    /// Performance rate as a percentage. `None` until the measure has an
    /// eligible population.
    pub fn performance_rate(&self) -> Option<f64> {
        let eligible = self.eligible_denominator();
        if eligible == 0 {
            return None;
        }
        Some((self.numerator as f64 / eligible as f64 * 100.0).min(100.0))
    }
}
