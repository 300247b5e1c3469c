use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Output document: one record per company plus a reserved conflict list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementData {
    pub companies: Vec<CompanyRecord>,
    #[serde(default)]
    pub unresolved_conflicts: Vec<serde_json::Value>,
}

/// One canonical record per company. Nullable fields stay unset until a
/// message or document provides evidence; `data_confidence_score` is the
/// only defaulted value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub company_name: String,
    /// Exact-case role labels. Membership is case-sensitive, unlike
    /// `offer_profiles` dedup, which folds case. Two identity rules for one
    /// concept, kept separate on purpose.
    #[serde(rename = "role")]
    pub roles: BTreeSet<String>,
    pub offer_profiles: Vec<OfferProfile>,
    #[serde(rename = "engagement_type")]
    pub engagement_types: BTreeSet<EngagementType>,
    pub compensation: Compensation,
    pub selection_stats: SelectionStats,
    pub eligibility: Eligibility,
    pub timeline: Timeline,
    pub flags: Flags,
    pub notes: String,
    pub metadata: Metadata,
}

impl CompanyRecord {
    pub fn new(company_name: &str) -> Self {
        CompanyRecord {
            company_name: company_name.to_string(),
            roles: BTreeSet::new(),
            offer_profiles: Vec::new(),
            engagement_types: BTreeSet::new(),
            compensation: Compensation::default(),
            selection_stats: SelectionStats::default(),
            eligibility: Eligibility::default(),
            timeline: Timeline::default(),
            flags: Flags::default(),
            notes: String::new(),
            metadata: Metadata::default(),
        }
    }
}

/// One compensation band offered by a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferProfile {
    pub role: String,
    pub ctc_lpa: f64,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EngagementType {
    #[serde(rename = "Full Time")]
    FullTime,
    Internship,
    #[serde(rename = "PPO")]
    Ppo,
}

impl fmt::Display for EngagementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngagementType::FullTime => write!(f, "Full Time"),
            EngagementType::Internship => write!(f, "Internship"),
            EngagementType::Ppo => write!(f, "PPO"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Compensation {
    pub ctc_lpa: Option<f64>,
    pub base_lpa: Option<f64>,
    /// Reserved; no current extraction rule populates this.
    pub variable_lpa: Option<f64>,
    pub bonus_lpa: Option<f64>,
    /// Reserved; no current extraction rule populates this.
    pub esop_lpa: Option<f64>,
    pub stipend_monthly: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionStats {
    /// Running sum across every message with a selection-count signal.
    pub students_selected: Option<u32>,
    /// Most recent matching message wins.
    pub students_shortlisted: Option<u32>,
    /// Reserved.
    pub offered_internship: Option<u32>,
    /// Reserved.
    pub converted_to_ppo: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Eligibility {
    pub cgpa_cutoff: Option<f64>,
    pub allowed_branches: BTreeSet<String>,
}

/// Reserved in the schema; current extraction rules never populate it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    pub selection_date: Option<String>,
    pub internship_duration_months: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flags {
    /// Sticky: once true, later messages never reset it.
    pub is_result_confirmed: bool,
    /// Sticky: once true, later messages never reset it.
    pub is_withdrawn: bool,
    pub data_confidence_score: f64,
}

impl Default for Flags {
    fn default() -> Self {
        Flags {
            is_result_confirmed: false,
            is_withdrawn: false,
            data_confidence_score: 0.8,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Normalized source text, in input order, kept for audit.
    pub raw_messages: Vec<String>,
}
