use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Label shown for images that carry no tags
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(rename = "uploadedAt", default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub documentation: Option<String>,
    // Older uploads send null instead of an empty list
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Image {
    pub fn uploaded_at_utc(&self) -> Option<DateTime<Utc>> {
        self.uploaded_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// First tag, or "Uncategorized"
    pub fn primary_tag(&self) -> &str {
        self.tags.first().map(String::as_str).unwrap_or(UNCATEGORIZED)
    }

    /// Documentation text if it is present and not blank
    pub fn documentation(&self) -> Option<&str> {
        self.documentation
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Envelope returned by `GET /images/my-images`: `{"data": {"images": [...]}}`.
/// Missing levels decode to an empty list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImagesResponse {
    #[serde(default)]
    data: Option<ImagesData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ImagesData {
    #[serde(default, deserialize_with = "null_as_empty_images")]
    images: Vec<Image>,
}

fn null_as_empty_images<'de, D>(deserializer: D) -> Result<Vec<Image>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Image>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ImagesResponse {
    pub fn into_images(self) -> Vec<Image> {
        self.data.map(|d| d.images).unwrap_or_default()
    }
}
