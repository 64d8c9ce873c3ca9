//! Summary statistics shown on the dashboard.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::models::image::UNCATEGORIZED;
use crate::models::Image;
use crate::utils::format_timestamp;

/// Rough per-image storage estimate used for the usage card
const ESTIMATED_MB_PER_IMAGE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_images: usize,
    /// Estimated storage, e.g. "1.5 MB"
    pub storage_used: String,
    /// Time of the most recent upload, or "N/A"
    pub last_upload: String,
}

impl DashboardStats {
    /// `images` is expected newest first, as the API returns it.
    pub fn from_images(images: &[Image]) -> Self {
        let storage_mb = images.len() as f64 * ESTIMATED_MB_PER_IMAGE;
        let last_upload = images
            .first()
            .and_then(|i| i.uploaded_at.as_deref())
            .map(format_timestamp)
            .unwrap_or_else(|| "N/A".to_string());

        Self {
            total_images: images.len(),
            storage_used: format!("{:.1} MB", storage_mb),
            last_upload,
        }
    }
}

/// Point on the uploads-per-day graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyUploads {
    pub date: NaiveDate,
    pub uploads: usize,
}

/// Uploads per calendar day (UTC), oldest first. Images without a
/// parseable timestamp are skipped.
pub fn daily_uploads(images: &[Image]) -> Vec<DailyUploads> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in images
        .iter()
        .filter_map(|i| i.uploaded_at_utc())
        .map(|dt| dt.date_naive())
    {
        *per_day.entry(date).or_default() += 1;
    }
    per_day
        .into_iter()
        .map(|(date, uploads)| DailyUploads { date, uploads })
        .collect()
}

/// Slice of the tag pie chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub name: String,
    pub value: usize,
}

/// Images per tag, most used first. An image counts once for each of its
/// tags; untagged images count as "Uncategorized".
pub fn tag_distribution(images: &[Image]) -> Vec<TagCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for image in images {
        if image.tags.is_empty() {
            *counts.entry(UNCATEGORIZED).or_default() += 1;
        }
        for tag in &image.tags {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }

    let mut distribution: Vec<TagCount> = counts
        .into_iter()
        .map(|(name, value)| TagCount {
            name: name.to_string(),
            value,
        })
        .collect();
    distribution.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    distribution
}

/// Drop a deleted image from the local list
pub fn remove_image(images: &mut Vec<Image>, id: &str) -> bool {
    let before = images.len();
    images.retain(|i| i.id != id);
    images.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str, uploaded_at: &str, tags: &[&str]) -> Image {
        Image {
            id: id.to_string(),
            image_url: format!("https://cdn.example.com/{}.jpg", id),
            uploaded_at: Some(uploaded_at.to_string()),
            documentation: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn sample() -> Vec<Image> {
        vec![
            image("c", "2024-07-25T09:00:00Z", &["fitness"]),
            image("b", "2024-07-24T18:30:00Z", &["food", "fitness"]),
            image("a", "2024-07-24T07:00:00Z", &[]),
        ]
    }

    #[test]
    fn test_stats() {
        let stats = DashboardStats::from_images(&sample());
        assert_eq!(stats.total_images, 3);
        assert_eq!(stats.storage_used, "1.5 MB");
        assert_eq!(stats.last_upload, "Jul 25, 2024 09:00");
    }

    #[test]
    fn test_stats_empty() {
        let stats = DashboardStats::from_images(&[]);
        assert_eq!(stats.total_images, 0);
        assert_eq!(stats.storage_used, "0.0 MB");
        assert_eq!(stats.last_upload, "N/A");
    }

    #[test]
    fn test_daily_uploads() {
        let days = daily_uploads(&sample());
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 7, 24).unwrap());
        assert_eq!(days[0].uploads, 2);
        assert_eq!(days[1].uploads, 1);
    }

    #[test]
    fn test_tag_distribution() {
        let tags = tag_distribution(&sample());
        assert_eq!(
            tags,
            vec![
                TagCount { name: "fitness".into(), value: 2 },
                TagCount { name: "Uncategorized".into(), value: 1 },
                TagCount { name: "food".into(), value: 1 },
            ]
        );
    }

    #[test]
    fn test_remove_image() {
        let mut images = sample();
        assert!(remove_image(&mut images, "b"));
        assert_eq!(images.len(), 2);
        assert!(!remove_image(&mut images, "b"));
    }
}
