//! Lead records and pipeline status.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::de::null_as_default;
use super::{Category, EntityKind, Record};
use crate::utils::time::parse_date;

/// Pipeline stage of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Proposal,
    Won,
    Lost,
    Expired,
}

impl LeadStatus {
    /// All stages in pipeline order.
    pub const ALL: [LeadStatus; 6] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Proposal,
        LeadStatus::Won,
        LeadStatus::Lost,
        LeadStatus::Expired,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Proposal => "proposal",
            LeadStatus::Won => "won",
            LeadStatus::Lost => "lost",
            LeadStatus::Expired => "expired",
        }
    }

    /// Still being worked on.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            LeadStatus::New | LeadStatus::Contacted | LeadStatus::Proposal
        )
    }

    /// Closed without a sale.
    pub fn is_closed_lost(self) -> bool {
        matches!(self, LeadStatus::Lost | LeadStatus::Expired)
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AiInsights {
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
    #[serde(rename = "nextSteps", default, deserialize_with = "null_as_default")]
    pub next_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Lead {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: LeadStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub estimated_value: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub seller_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    /// Category joined in by the backend query; lookup only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_insights: Option<AiInsights>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

/// Where a lead stands relative to its expiration date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryState {
    NoDate,
    Upcoming,
    ExpiringToday,
    Expired,
}

impl Lead {
    pub fn new(id: impl Into<String>, name: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            phone: None,
            source: None,
            status: LeadStatus::New,
            estimated_value: 0.0,
            seller_id: String::new(),
            company_id: None,
            category_id: None,
            expiration_date: None,
            categories: None,
            ai_score: None,
            ai_insights: None,
            created_at: created_at.into(),
            extra: Map::new(),
        }
    }

    pub fn expiration(&self) -> Option<NaiveDate> {
        self.expiration_date.as_deref().and_then(parse_date)
    }

    pub fn expiry_state(&self, today: NaiveDate) -> ExpiryState {
        match self.expiration() {
            None => ExpiryState::NoDate,
            Some(date) if date < today => ExpiryState::Expired,
            Some(date) if date == today => ExpiryState::ExpiringToday,
            Some(_) => ExpiryState::Upcoming,
        }
    }

    /// Sort for the monitor view: soonest expiration first, undated last.
    pub fn sort_by_expiration(leads: &mut [Lead]) {
        leads.sort_by_key(|lead| {
            let date = lead.expiration();
            (date.is_none(), date)
        });
    }
}

impl Record for Lead {
    const KIND: EntityKind = EntityKind::Leads;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> Option<&str> {
        Some(&self.created_at)
    }
}
