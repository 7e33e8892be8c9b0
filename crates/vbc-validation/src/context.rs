use std::collections::BTreeMap;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use vbc_core::models::dataset::DatasetKind;

use crate::error::ValidationError;

/// Rule thresholds. Defaults match the contract program's data-quality policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Null share of a required field at which the finding becomes critical.
    pub critical_null_rate: f64,
    /// Surplus-copy share at which duplicates become critical (and unfixable).
    pub critical_duplicate_rate: f64,
    /// Amounts above this are flagged as implausible.
    pub high_cost_amount: f64,
    /// Negative amounts are sign-flipped only while they stay under this share of rows.
    pub negative_fix_max_rate: f64,
    /// Share of future dates that must sit exactly one year ahead to count as a year typo.
    pub year_typo_min_share: f64,
    /// Gender/diagnosis mismatches are fixed only when fewer members than this are affected.
    pub gender_fix_member_limit: usize,
    pub max_age: i32,
    pub volume_tolerance: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            critical_null_rate: 0.05,
            critical_duplicate_rate: 0.05,
            high_cost_amount: 500_000.0,
            negative_fix_max_rate: 0.01,
            year_typo_min_share: 0.80,
            gender_fix_member_limit: 10,
            max_age: 120,
            volume_tolerance: 0.20,
        }
    }
}

impl Thresholds {
    pub fn check(&self) -> Result<(), ValidationError> {
        let rates = [
            ("critical_null_rate", self.critical_null_rate),
            ("critical_duplicate_rate", self.critical_duplicate_rate),
            ("negative_fix_max_rate", self.negative_fix_max_rate),
            ("year_typo_min_share", self.year_typo_min_share),
            ("volume_tolerance", self.volume_tolerance),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::InvalidThreshold { name, value });
            }
        }
        if !(self.high_cost_amount > 0.0) {
            return Err(ValidationError::InvalidThreshold {
                name: "high_cost_amount",
                value: self.high_cost_amount,
            });
        }
        Ok(())
    }
}

/// Everything a rule needs besides the records themselves.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// Evaluation date for age and future-date checks.
    pub as_of: Date,
    pub thresholds: Thresholds,
    /// Expected record counts; collections without an entry skip the volume check.
    pub expected_volumes: BTreeMap<DatasetKind, usize>,
}

impl ValidationContext {
    pub fn new(as_of: Date) -> Self {
        Self {
            as_of,
            thresholds: Thresholds::default(),
            expected_volumes: BTreeMap::new(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_expected_volumes(mut self, volumes: BTreeMap<DatasetKind, usize>) -> Self {
        self.expected_volumes = volumes;
        self
    }
}
