//! Alumni profiles: the read-only profile table plus the two pure views derived
//! from each record (the indexed document and the display card).
//!
//! Source records are LinkedIn-style JSON objects. Every field is optional and
//! loosely typed; a field with an unexpected shape reads as absent instead of
//! failing the whole load.

pub mod document;
pub mod projection;

pub use document::build_document;
pub use projection::{project, ProfileCard};

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tokio::fs;
use tracing::{info, warn};

use crate::types::{AppError, AppResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub first_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub last_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub headline: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub about: Option<String>,
    /// Bullet-separated, e.g. `"Python • SQL"`
    #[serde(deserialize_with = "lenient_string")]
    pub top_skills: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub location: Location,
    #[serde(deserialize_with = "lenient")]
    pub current_position: Vec<CurrentPosition>,
    #[serde(deserialize_with = "lenient")]
    pub experience: Vec<Experience>,
    #[serde(deserialize_with = "lenient")]
    pub profile_picture: ProfilePicture,
    #[serde(deserialize_with = "lenient_string")]
    pub photo: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    #[serde(deserialize_with = "lenient_string")]
    pub linkedin_text: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub parsed: ParsedLocation,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParsedLocation {
    #[serde(deserialize_with = "lenient_string")]
    pub text: Option<String>,
}

impl Location {
    /// Parsed text when present, else the raw LinkedIn text
    pub fn display(&self) -> Option<&str> {
        non_empty(self.parsed.text.as_deref()).or_else(|| non_empty(self.linkedin_text.as_deref()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurrentPosition {
    #[serde(deserialize_with = "lenient_string")]
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    #[serde(deserialize_with = "lenient_string")]
    pub position: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub company_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfilePicture {
    #[serde(deserialize_with = "lenient_string")]
    pub url: Option<String>,
}

/// Any value that does not fit `T` reads as `T::default()`.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Strings as-is, numbers and booleans stringified, anything else absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Read a JSON array of profile records. A non-array top level yields no profiles.
pub async fn load_profiles(path: impl AsRef<Path>) -> AppResult<Vec<Profile>> {
    let path = path.as_ref();
    let read_error = |e: std::io::Error| AppError::DataSource(format!("Failed to read {}: {}", path.display(), e));
    if !fs::try_exists(path).await.map_err(read_error)? {
        return Err(AppError::DataSource(format!(
            "Data file not found: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path).await.map_err(read_error)?;
    let value: Value = serde_json::from_str(&raw)
        .map_err(|e| AppError::DataSource(format!("Invalid JSON in {}: {}", path.display(), e)))?;

    let Value::Array(records) = value else {
        warn!(path = %path.display(), "Profile source is not a JSON array");
        return Ok(Vec::new());
    };

    Ok(records
        .into_iter()
        .map(|record| Profile::deserialize(record).unwrap_or_default())
        .collect())
}

/// In-memory profile set, read-only after construction.
///
/// Listing keeps every record in load order; id lookup resolves duplicates to
/// the last record carrying that id.
#[derive(Debug, Default)]
pub struct ProfileTable {
    entries: Vec<(String, Profile)>,
    by_id: HashMap<String, usize>,
}

impl ProfileTable {
    pub fn new(profiles: Vec<Profile>) -> Self {
        let entries: Vec<(String, Profile)> = profiles
            .into_iter()
            .enumerate()
            .map(|(position, profile)| {
                let id = non_empty(profile.id.as_deref())
                    .map(str::to_string)
                    .unwrap_or_else(|| position.to_string());
                (id, profile)
            })
            .collect();
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(i, (id, _))| (id.clone(), i))
            .collect();
        Self { entries, by_id }
    }

    /// Load and index the profile source; an empty source is an error.
    pub async fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let table = Self::new(load_profiles(path).await?);
        if table.is_empty() {
            return Err(AppError::DataSource(format!(
                "No profiles found in {}",
                path.display()
            )));
        }
        info!(profiles = table.len(), path = %path.display(), "Loaded profiles");
        Ok(table)
    }

    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.by_id.get(id).map(|&i| &self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (id, profile) pairs in load order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Profile)> {
        self.entries.iter().map(|(id, p)| (id.as_str(), p))
    }
}
