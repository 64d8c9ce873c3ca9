//! Client-side pagination of the image list, plus the detail view.

use crate::models::Image;
use crate::utils::format_timestamp;

/// Images shown per gallery page
pub const ITEMS_PER_PAGE: usize = 12;

/// Number of pages needed for `count` images; zero when there are none
pub fn total_pages(count: usize) -> usize {
    count.div_ceil(ITEMS_PER_PAGE)
}

/// One page of the gallery
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    /// 1-based page number actually shown
    pub number: usize,
    pub total_pages: usize,
    pub items: &'a [Image],
}

impl<'a> Page<'a> {
    /// Page `requested` of `images`, clamped into range.
    pub fn of(images: &'a [Image], requested: usize) -> Self {
        let total = total_pages(images.len());
        let number = requested.clamp(1, total.max(1));
        let start = ((number - 1) * ITEMS_PER_PAGE).min(images.len());
        let end = (start + ITEMS_PER_PAGE).min(images.len());
        Self {
            number,
            total_pages: total,
            items: &images[start..end],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.number > 1
    }
}

/// What the detail modal shows for one image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDetail {
    pub id: String,
    pub image_url: String,
    pub uploaded: String,
    pub documentation: Option<String>,
    pub tags: Vec<String>,
}

impl ImageDetail {
    pub fn from_image(image: &Image) -> Self {
        Self {
            id: image.id.clone(),
            image_url: image.image_url.clone(),
            uploaded: image
                .uploaded_at
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_else(|| "N/A".to_string()),
            documentation: image.documentation().map(str::to_string),
            tags: image.tags.clone(),
        }
    }
}

/// Find an image by id and build its detail view
pub fn find_detail(images: &[Image], id: &str) -> Option<ImageDetail> {
    images.iter().find(|i| i.id == id).map(ImageDetail::from_image)
}
