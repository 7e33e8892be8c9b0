use std::fmt;

use serde::{Deserialize, Serialize};

use super::claim::{MedicalClaim, PharmacyClaim};
use super::member::Member;
use super::quality_measure::QualityMeasure;

/// One consistent extract for a contract and period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub medical_claims: Vec<MedicalClaim>,
    #[serde(default)]
    pub pharmacy_claims: Vec<PharmacyClaim>,
    #[serde(default)]
    pub quality_measures: Vec<QualityMeasure>,
}

impl Dataset {
    pub fn len(&self, kind: DatasetKind) -> usize {
        match kind {
            DatasetKind::Members => self.members.len(),
            DatasetKind::MedicalClaims => self.medical_claims.len(),
            DatasetKind::PharmacyClaims => self.pharmacy_claims.len(),
            DatasetKind::QualityMeasures => self.quality_measures.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        DatasetKind::ALL.iter().all(|k| self.len(*k) == 0)
    }

    /// Record counts per collection, keyed by collection name.
    pub fn counts(&self) -> Vec<(DatasetKind, usize)> {
        DatasetKind::ALL.iter().map(|k| (*k, self.len(*k))).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Members,
    MedicalClaims,
    PharmacyClaims,
    QualityMeasures,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Members,
        DatasetKind::MedicalClaims,
        DatasetKind::PharmacyClaims,
        DatasetKind::QualityMeasures,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Members => "members",
            Self::MedicalClaims => "medical_claims",
            Self::PharmacyClaims => "pharmacy_claims",
            Self::QualityMeasures => "quality_measures",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a single record by collection and primary key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub dataset: DatasetKind,
    pub key: String,
}

impl RecordRef {
    pub fn new(dataset: DatasetKind, key: impl Into<String>) -> Self {
        Self {
            dataset,
            key: key.into(),
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.dataset, self.key)
    }
}
