//! Agent record and its public projection.
//!
//! `AgentRecord` mirrors the document stored by the chat application: a
//! handful of known display fields, several legacy spellings of the same
//! concepts, and whatever else the owning application decided to keep on
//! the document. `AgentView` is the only shape allowed to leave the public
//! surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Category reported for records that carry none.
pub const DEFAULT_CATEGORY: &str = "General";

/// Sentinel used by the legacy visibility fields.
const PUBLIC_SENTINEL: &str = "public";

/// Avatar reference as stored on the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Avatar {
    /// Plain URL string.
    Url(String),
    /// Structured file reference.
    File(AvatarFile),
}

/// Structured avatar reference produced by the file upload pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvatarFile {
    /// Path or URL of the uploaded image.
    #[serde(default)]
    pub filepath: Option<String>,
    /// Storage backend that holds the file (`local`, `s3`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Nested `{ visibility: "..." }` object used by older schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibilityScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

/// Visibility fields that earlier schemas stored on the record itself.
///
/// Only consulted when the catalog runs in legacy-field mode; the grant
/// table is authoritative otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyVisibility {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketplace_visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<VisibilityScope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharing: Option<VisibilityScope>,
}

impl LegacyVisibility {
    /// Whether any legacy field marks the record as public.
    pub fn is_public(&self) -> bool {
        let sentinel = |v: &Option<String>| v.as_deref() == Some(PUBLIC_SENTINEL);
        let scoped = |s: &Option<VisibilityScope>| s.as_ref().is_some_and(|s| sentinel(&s.visibility));

        sentinel(&self.visibility)
            || sentinel(&self.marketplace_visibility)
            || self.is_public == Some(true)
            || self.public == Some(true)
            || scoped(&self.permissions)
            || scoped(&self.sharing)
    }
}

/// Agent document as stored by the owning application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    /// Opaque unique identifier (`_id` is accepted on input).
    #[serde(alias = "_id")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    /// Direct avatar URL written by older clients; wins over `avatar`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Avatar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_tags", skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted: Option<bool>,
    /// Legacy synonym of `promoted`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    /// Legacy synonym of `promoted`.
    #[serde(rename = "is_promoted", default, skip_serializing_if = "Option::is_none")]
    pub is_promoted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub legacy: LegacyVisibility,
    /// Every other field on the document. Never exposed publicly.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keeps only the string members of a `tags` value; anything that is not
/// an array yields no tags.
fn lenient_tags<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(
            items.into_iter().filter_map(|v| v.as_str().map(ToString::to_string)).collect(),
        ),
        _ => None,
    })
}

impl AgentRecord {
    /// Creates a record with only an id and a name set.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), ..Self::default() }
    }

    /// Whether any of the promoted synonyms is set.
    pub fn is_promoted(&self) -> bool {
        [self.promoted, self.featured, self.is_promoted].into_iter().any(|f| f == Some(true))
    }

    /// Whether the record is public under the legacy field scheme.
    pub fn is_legacy_public(&self) -> bool {
        self.legacy.is_public()
    }

    /// Stored category, if it is a non-empty string.
    pub fn category_value(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }

    /// First non-empty of `description` and `shortDescription`.
    pub fn display_description(&self) -> &str {
        [self.description.as_deref(), self.short_description.as_deref()]
            .into_iter()
            .flatten()
            .find(|d| !d.is_empty())
            .unwrap_or("")
    }

    /// Resolves the single display URL for the avatar. Empty when unknown;
    /// clients substitute their own placeholder.
    pub fn avatar_display_url(&self) -> &str {
        if let Some(url) = self.avatar_url.as_deref().filter(|u| !u.is_empty()) {
            return url;
        }
        match &self.avatar {
            Some(Avatar::Url(url)) => url,
            Some(Avatar::File(file)) => file.filepath.as_deref().unwrap_or(""),
            None => "",
        }
    }

    /// Case-insensitive substring match over name and both descriptions.
    /// `needle` must already be lowercased.
    pub fn matches_text(&self, needle: &str) -> bool {
        [Some(self.name.as_str()), self.description.as_deref(), self.short_description.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle))
    }

    /// Whitelist projection safe for anonymous callers.
    pub fn sanitize(&self) -> AgentView {
        AgentView::from(self)
    }
}

/// Public view of an agent. Exactly these eight keys are serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub avatar_url: String,
    pub category: String,
    pub tags: Vec<String>,
    pub promoted: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&AgentRecord> for AgentView {
    fn from(record: &AgentRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            description: record.display_description().to_string(),
            avatar_url: record.avatar_display_url().to_string(),
            category: record.category_value().unwrap_or(DEFAULT_CATEGORY).to_string(),
            tags: record.tags.clone().unwrap_or_default(),
            promoted: record.is_promoted(),
            updated_at: record.updated_at,
        }
    }
}
