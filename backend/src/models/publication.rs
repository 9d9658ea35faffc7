//! Publication versions and their metadata.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{text_enum, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Queued,
    Scheduled,
    Published,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Queued => "queued",
            VersionStatus::Scheduled => "scheduled",
            VersionStatus::Published => "published",
        }
    }
}

impl FromStr for VersionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(VersionStatus::Queued),
            "scheduled" => Ok(VersionStatus::Scheduled),
            "published" => Ok(VersionStatus::Published),
            other => Err(UnknownVariant::new("version status", other)),
        }
    }
}

text_enum!(VersionStatus);

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicationVersion {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub version: i32,
    pub status: VersionStatus,
    pub notes: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: sqlx::types::Json<Value>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersionRequest {
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// Defaults to the latest version
    pub version_id: Option<Uuid>,
    pub publish_date: Option<NaiveDate>,
    /// Publish immediately instead of scheduling
    #[serde(default)]
    pub publish_now: bool,
}

impl PublishRequest {
    /// Target status and publication timestamp.
    pub fn resolve(&self) -> crate::error::Result<(VersionStatus, DateTime<Utc>)> {
        let date = self.publish_date.ok_or_else(|| {
            crate::error::AppError::Validation("Publish date is required".to_string())
        })?;
        let status = if self.publish_now {
            VersionStatus::Published
        } else {
            VersionStatus::Scheduled
        };
        Ok((status, date.and_time(chrono::NaiveTime::MIN).and_utc()))
    }

    pub fn activity_message(&self) -> String {
        match (self.publish_now, self.publish_date) {
            (true, _) | (false, None) => "Publication published.".to_string(),
            (false, Some(date)) => format!("Publication scheduled for {}.", date),
        }
    }

    pub fn response_message(&self) -> &'static str {
        if self.publish_now {
            "Publication published successfully."
        } else {
            "Publication scheduled successfully."
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnpublishRequest {
    /// Unpublish every published or scheduled version when absent
    pub version_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicationAuthor {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub affiliation: Option<String>,
    pub email: Option<String>,
    pub orcid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct Identifiers {
    pub doi: Option<String>,
    pub isbn: Option<String>,
    pub issn: Option<String>,
}

/// Partial update of a version's metadata. Absent fields are kept; `null`
/// clears a field to its empty value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub prefix: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub subtitle: Option<Option<String>>,
    #[serde(default, rename = "abstract", deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub abstract_text: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Vec<String>>)]
    pub keywords: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Vec<String>>)]
    pub categories: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Vec<String>>)]
    pub citations: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Vec<PublicationAuthor>>)]
    pub authors: Option<Option<Vec<PublicationAuthor>>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<Identifiers>)]
    pub identifiers: Option<Option<Identifiers>>,
}

impl MetadataPatch {
    /// Names of the fields present in the patch, as sent.
    pub fn fields(&self) -> Vec<&'static str> {
        let present = [
            ("title", self.title.is_some()),
            ("prefix", self.prefix.is_some()),
            ("subtitle", self.subtitle.is_some()),
            ("abstract", self.abstract_text.is_some()),
            ("keywords", self.keywords.is_some()),
            ("categories", self.categories.is_some()),
            ("citations", self.citations.is_some()),
            ("authors", self.authors.is_some()),
            ("identifiers", self.identifiers.is_some()),
        ];
        present
            .into_iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// New submission title, when the patch sets a non-empty one.
    pub fn new_title(&self) -> Option<&str> {
        self.title
            .as_ref()
            .and_then(|title| title.as_deref())
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }

    /// Merge the patch over `current`, which is treated as empty unless it
    /// is a JSON object.
    pub fn apply(&self, current: &Value) -> Value {
        let mut merged = match current {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };

        let texts = [
            ("title", &self.title),
            ("prefix", &self.prefix),
            ("subtitle", &self.subtitle),
            ("abstract", &self.abstract_text),
        ];
        for (key, field) in texts {
            if let Some(value) = field {
                merged.insert(key.to_string(), Value::from(value.clone().unwrap_or_default()));
            }
        }

        let lists = [
            ("keywords", &self.keywords),
            ("categories", &self.categories),
            ("citations", &self.citations),
        ];
        for (key, field) in lists {
            if let Some(value) = field {
                merged.insert(key.to_string(), Value::from(value.clone().unwrap_or_default()));
            }
        }

        if let Some(authors) = &self.authors {
            let authors = authors.clone().unwrap_or_default();
            merged.insert(
                "authors".to_string(),
                serde_json::to_value(authors).unwrap_or_else(|_| Value::Array(Vec::new())),
            );
        }

        if let Some(identifiers) = &self.identifiers {
            let identifiers = identifiers.clone().unwrap_or_default();
            let trimmed = |value: &Option<String>| value.as_deref().map(str::trim).unwrap_or("").to_string();
            merged.insert(
                "identifiers".to_string(),
                serde_json::json!({
                    "doi": trimmed(&identifiers.doi),
                    "isbn": trimmed(&identifiers.isbn),
                    "issn": trimmed(&identifiers.issn),
                }),
            );
        }

        Value::Object(merged)
    }
}

/// Deserialize a present field as `Some(..)`, keeping explicit `null` as
/// `Some(None)`.
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
