use jiff::civil::Date;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "U")]
    Unknown,
}

/// HCC-derived risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 3] = [RiskCategory::Low, RiskCategory::Medium, RiskCategory::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// An attributed beneficiary.
///
/// Optional fields are ones the source extract may fail to populate; the
/// validation engine decides which absences are fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<Date>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub attribution_start: Option<Date>,
    #[serde(default)]
    pub attribution_end: Option<Date>,
    #[serde(default)]
    pub pcp_id: Option<String>,
    #[serde(default)]
    pub hcc_risk_score: Option<f64>,
    #[serde(default)]
    pub risk_category: Option<RiskCategory>,
}

impl Member {
    /// Whether the attribution window overlaps `[from, to]`.
    pub fn attributed_between(&self, from: Date, to: Date) -> bool {
        let Some(start) = self.attribution_start else {
            return false;
        };
        start <= to && self.attribution_end.is_none_or(|end| end >= from)
    }

    /// Completed years of age on `as_of`. Negative when born after `as_of`.
    pub fn age_on(&self, as_of: Date) -> Option<i32> {
        let dob = self.date_of_birth?;
        let mut age = as_of.year() as i32 - dob.year() as i32;
        if (as_of.month(), as_of.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        Some(age)
    }
}
