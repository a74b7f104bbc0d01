//! Dataset pipeline: deduplication and field/date filtering
//!
//! Turns the raw crawl output into the stable dataset served by the read
//! API. Both steps preserve the input order.

use crate::config::FilterConfig;
use crate::models::UserRecord;
use crate::ConfigError;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Record fields that can be required by the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Id,
    Login,
    CreatedAt,
    AvatarUrl,
    Bio,
}

impl RecordField {
    /// Returns true if the record holds a non-empty value for this field
    pub fn is_present(&self, record: &UserRecord) -> bool {
        match self {
            Self::Id | Self::CreatedAt => true,
            Self::Login => !record.login.is_empty(),
            Self::AvatarUrl => !record.avatar_url.is_empty(),
            Self::Bio => record.bio.as_deref().is_some_and(|bio| !bio.is_empty()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Login => "login",
            Self::CreatedAt => "created_at",
            Self::AvatarUrl => "avatar_url",
            Self::Bio => "bio",
        }
    }
}

impl FromStr for RecordField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Self::Id),
            "login" => Ok(Self::Login),
            "created_at" => Ok(Self::CreatedAt),
            "avatar_url" => Ok(Self::AvatarUrl),
            "bio" => Ok(Self::Bio),
            other => Err(format!("unknown record field '{}'", other)),
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed filter settings
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    /// Fields that must be present and non-empty
    pub required_fields: Vec<RecordField>,

    /// Records created before this instant are dropped
    pub created_after: DateTime<Utc>,
}

impl FilterCriteria {
    /// Parses the configured field names and cut-off date
    ///
    /// The date is interpreted as midnight UTC.
    pub fn from_config(config: &FilterConfig) -> Result<Self, ConfigError> {
        let required_fields = config
            .required_fields
            .iter()
            .map(|f| f.parse::<RecordField>().map_err(ConfigError::Validation))
            .collect::<Result<Vec<_>, _>>()?;

        let date = NaiveDate::parse_from_str(&config.created_after, "%Y-%m-%d").map_err(|e| {
            ConfigError::Validation(format!("Invalid created-after date: {}", e))
        })?;

        Ok(Self {
            required_fields,
            created_after: date.and_time(chrono::NaiveTime::MIN).and_utc(),
        })
    }
}

/// Removes records whose `id` was already seen, keeping the first one
pub fn remove_duplicates(users: Vec<UserRecord>) -> Vec<UserRecord> {
    let total = users.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<UserRecord> = users.into_iter().filter(|u| seen.insert(u.id)).collect();

    tracing::info!(removed = total - unique.len(), "Duplicates removed");
    unique
}

/// Keeps records that have every required field and were created on or
/// after the cut-off
pub fn filter_users(criteria: &FilterCriteria, users: Vec<UserRecord>) -> Vec<UserRecord> {
    let total = users.len();
    let kept: Vec<UserRecord> = users
        .into_iter()
        .filter(|u| criteria.required_fields.iter().all(|f| f.is_present(u)))
        .filter(|u| u.created_at >= criteria.created_after)
        .collect();

    tracing::info!(removed = total - kept.len(), "Filtered out users");
    kept
}

/// Deduplicates then filters
pub fn build_dataset(criteria: &FilterCriteria, users: Vec<UserRecord>) -> Vec<UserRecord> {
    filter_users(criteria, remove_duplicates(users))
}
