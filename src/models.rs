//! Record types shared by the crawler, the dataset pipeline and the read API
//!
//! Remote payloads are deserialized into explicit DTOs first and converted
//! into [`UserRecord`] at the boundary, so a malformed payload is rejected by
//! serde instead of leaking partially-populated records downstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A harvested user, persisted verbatim after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable identity of the user
    pub id: u64,

    /// Login used to look up the detail record
    pub login: String,

    /// Account creation time
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,

    /// Avatar image URL
    pub avatar_url: String,

    /// Free-form biography, absent when the source has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl UserRecord {
    /// Builds a record from a detail payload
    ///
    /// The `login` is the one the detail was requested with. An empty or
    /// null `bio` is dropped rather than stored as an empty string.
    pub fn from_detail(login: &str, detail: UserDetailPayload) -> Self {
        Self {
            id: detail.id,
            login: login.to_string(),
            created_at: detail.created_at,
            avatar_url: detail.avatar_url,
            bio: detail.bio.filter(|bio| !bio.is_empty()),
        }
    }
}

/// Projection of a record used by list and search responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: u64,
    pub login: String,
}

impl From<&UserRecord> for UserSummary {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            login: record.login.clone(),
        }
    }
}

/// One entry of the listing endpoint; only the login is consumed
#[derive(Debug, Clone, Deserialize)]
pub struct ListingEntry {
    pub login: String,
}

/// Body of the detail endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct UserDetailPayload {
    pub id: u64,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub avatar_url: String,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Serde adapter writing timestamps as `%Y-%m-%dT%H:%M:%SZ`
///
/// Parsing accepts any RFC 3339 timestamp (`Z` or a numeric offset) and
/// normalises it to UTC.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
