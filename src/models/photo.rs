//! Photo model and its wire representation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pixel dimensions of a photo, known before the image itself is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Size {
    /// Create a new size
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Height divided by width, for laying out a cell of a given width.
    ///
    /// Returns `None` for a zero width.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.width == 0 {
            None
        } else {
            Some(f64::from(self.height) / f64::from(self.width))
        }
    }
}

/// A photo in the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    /// Provider-side identifier, unique within the feed
    pub id: String,
    /// Dimensions reported by the API
    pub size: Size,
    /// Creation time, `None` when upstream sent nothing usable
    pub created_at: Option<DateTime<Utc>>,
    /// Free-form description
    pub description: Option<String>,
    /// Small image for the list
    pub thumbnail_url: String,
    /// Full-resolution image
    pub full_url: String,
    /// Whether the signed-in user likes this photo
    pub is_liked: bool,
}

/// URL set attached to every photo record
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoUrls {
    /// Thumbnail (about 200px wide)
    pub thumb: String,
    /// Original resolution
    pub full: String,
    /// Unprocessed original, not used by the feed
    #[serde(default)]
    pub raw: Option<String>,
    /// 1080px wide, not used by the feed
    #[serde(default)]
    pub regular: Option<String>,
    /// 400px wide, not used by the feed
    #[serde(default)]
    pub small: Option<String>,
}

/// One element of the photo list endpoint's JSON array
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoRecord {
    /// Photo id
    pub id: String,
    /// ISO-8601 timestamp, may be absent
    #[serde(default)]
    pub created_at: Option<String>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the current user liked the photo
    #[serde(default)]
    pub liked_by_user: bool,
    /// Image URLs
    pub urls: PhotoUrls,
}

impl PhotoRecord {
    /// Convert into the feed model.
    ///
    /// Returns `None` if either image URL is empty, since such a photo can
    /// never be displayed.
    pub fn into_photo(self) -> Option<Photo> {
        if self.urls.thumb.is_empty() || self.urls.full.is_empty() {
            tracing::warn!(id = %self.id, "Skipping photo without image URLs");
            return None;
        }

        let created_at = self.created_at.as_deref().and_then(parse_timestamp);

        Some(Photo {
            id: self.id,
            size: Size::new(self.width, self.height),
            created_at,
            description: self.description,
            thumbnail_url: self.urls.thumb,
            full_url: self.urls.full,
            is_liked: self.liked_by_user,
        })
    }
}

/// Parse an ISO-8601 timestamp, yielding `None` instead of a fallback value.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(raw, error = %e, "Unparsable photo timestamp");
            None
        }
    }
}
