use jiff::civil::Date;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalClaim {
    pub claim_id: String,
    pub member_id: String,
    #[serde(default)]
    pub service_date: Option<Date>,
    #[serde(default)]
    pub paid_date: Option<Date>,
    #[serde(default)]
    pub paid_amount: Option<f64>,
    #[serde(default)]
    pub allowed_amount: Option<f64>,
    #[serde(default)]
    pub primary_diagnosis: Option<String>,
    #[serde(default)]
    pub place_of_service: Option<String>,
    #[serde(default)]
    pub er_visit: bool,
    #[serde(default)]
    pub inpatient_admit: bool,
}

impl MedicalClaim {
    /// ICD-10 chapter O (pregnancy) and Z34 (supervision of normal pregnancy).
    pub fn has_pregnancy_diagnosis(&self) -> bool {
        self.primary_diagnosis
            .as_deref()
            .is_some_and(|dx| dx.starts_with('O') || dx.starts_with("Z34"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PharmacyClaim {
    pub claim_id: String,
    pub member_id: String,
    #[serde(default)]
    pub fill_date: Option<Date>,
    #[serde(default)]
    pub paid_amount: Option<f64>,
    #[serde(default)]
    pub drug_name: Option<String>,
    #[serde(default)]
    pub generic: bool,
    #[serde(default)]
    pub days_supply: Option<u32>,
}
