//! Media library entries supplied by the ingestion layer.
//!
//! The mixer only consumes `url` and the optional `duration` hint; the other
//! fields are carried for display.

use serde::{Deserialize, Serialize};

/// A clip available for assignment to layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryItem {
    pub id: String,
    pub name: String,
    pub url: String,

    /// Thumbnail image (data URL or path).
    #[serde(default)]
    pub thumbnail: Option<String>,

    /// Duration in seconds, when already probed.
    #[serde(default)]
    pub duration: Option<f64>,

    /// Resolution as `WIDTHxHEIGHT`.
    #[serde(default)]
    pub resolution: Option<String>,

    #[serde(default)]
    pub is_uploading: bool,

    /// Ingestion failure message.
    #[serde(default)]
    pub error: Option<String>,
}

impl LibraryItem {
    /// A bare entry for a URL, as produced by "add URL".
    pub fn from_url(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            thumbnail: None,
            duration: None,
            resolution: None,
            is_uploading: false,
            error: None,
        }
    }

    /// Whether the item can be assigned to a layer.
    pub fn is_usable(&self) -> bool {
        !self.url.is_empty() && self.error.is_none()
    }

    /// Duration hint usable as an initial layer duration.
    pub fn duration_hint(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_items() {
        let mut item = LibraryItem::from_url("1", "clip", "sim://clip");
        assert!(item.is_usable());
        item.error = Some("Failed to process video".to_string());
        assert!(!item.is_usable());
    }

    #[test]
    fn test_duration_hint_filters_garbage() {
        let mut item = LibraryItem::from_url("1", "clip", "sim://clip");
        item.duration = Some(f64::NAN);
        assert_eq!(item.duration_hint(), None);
        item.duration = Some(12.5);
        assert_eq!(item.duration_hint(), Some(12.5));
    }
}
