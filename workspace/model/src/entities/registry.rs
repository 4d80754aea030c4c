use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;
use utoipa::ToSchema;

use super::{Numbered, ProgramCode, renumber};
use crate::error::{ModelError, Result};
use crate::numeric::lenient_f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SponsorStatus {
    Active,
    Inactive,
}

/// Reads `active`/`inactive` in any case; any other value reads as unset.
fn lenient_status<'de, D>(deserializer: D) -> std::result::Result<Option<SponsorStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "active" => Some(SponsorStatus::Active),
            "inactive" => Some(SponsorStatus::Inactive),
            other => {
                debug!(status = other, "Unknown sponsor status read as unset");
                None
            }
        },
        _ => None,
    })
}

/// One sponsorship: a sponsor paying a monthly amount for a named student.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Sponsor {
    /// 1-based position within the registry; reassigned on deletion
    #[serde(default)]
    pub cid: u32,
    /// Full name of the sponsored student, must exist in the same program
    pub student_name: String,
    pub sponsor_name: String,
    /// Monthly amount in EUR
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
    /// `None` counts as active
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<SponsorStatus>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

impl Sponsor {
    pub fn is_active(&self) -> bool {
        !matches!(self.status, Some(SponsorStatus::Inactive))
    }
}

impl Numbered for Sponsor {
    fn number(&self) -> u32 {
        self.cid
    }

    fn set_number(&mut self, number: u32) {
        self.cid = number;
    }
}

/// Derived figures of a registry, rebuilt by every recalculation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RegistryMetadata {
    /// Number of sponsorship entries in the registry
    #[serde(default)]
    pub total_sponsorships: usize,
    #[serde(default)]
    pub active_sponsors: usize,
    #[serde(default)]
    pub inactive_sponsors: usize,
    /// Sum of active sponsors' amounts, in EUR
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_monthly_funding: f64,
}

/// The sponsors funding one program's students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Registry {
    pub program: ProgramCode,
    #[serde(default)]
    pub sponsors: Vec<Sponsor>,
    #[serde(default)]
    pub metadata: RegistryMetadata,
}

impl Registry {
    pub fn new(program: ProgramCode) -> Self {
        Self {
            program,
            sponsors: Vec::new(),
            metadata: RegistryMetadata::default(),
        }
    }

    pub fn sponsor(&self, cid: u32) -> Result<&Sponsor> {
        self.sponsors
            .iter()
            .find(|s| s.cid == cid)
            .ok_or(ModelError::SponsorNotFound { program: self.program, cid })
    }

    pub fn sponsor_mut(&mut self, cid: u32) -> Result<&mut Sponsor> {
        let program = self.program;
        self.sponsors
            .iter_mut()
            .find(|s| s.cid == cid)
            .ok_or(ModelError::SponsorNotFound { program, cid })
    }

    /// Appends a sponsor with the next CID and returns that CID.
    pub fn push_sponsor(&mut self, mut sponsor: Sponsor) -> u32 {
        let cid = self.sponsors.len() as u32 + 1;
        sponsor.cid = cid;
        self.sponsors.push(sponsor);
        cid
    }

    /// Removes a sponsor and renumbers the rest in their original order.
    pub fn remove_sponsor(&mut self, cid: u32) -> Result<Sponsor> {
        let index = self
            .sponsors
            .iter()
            .position(|s| s.cid == cid)
            .ok_or(ModelError::SponsorNotFound { program: self.program, cid })?;
        let removed = self.sponsors.remove(index);
        renumber(&mut self.sponsors);
        Ok(removed)
    }
}
