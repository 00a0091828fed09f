use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AssetId;

/// Image descriptor as known to the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub image_id: i64,
    pub date_created: DateTime<Utc>,
    pub src: String,
    pub name: Option<String>,
    pub alt: Option<String>,
}

impl ProductImage {
    /// Create a descriptor for an image hosted at `src`
    pub fn new<S: Into<String>>(image_id: i64, src: S) -> Self {
        Self {
            image_id,
            date_created: Utc::now(),
            src: src.into(),
            name: None,
            alt: None,
        }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_alt<S: Into<String>>(mut self, alt: S) -> Self {
        self.alt = Some(alt.into());
        self
    }

    pub fn with_date_created(mut self, date_created: DateTime<Utc>) -> Self {
        self.date_created = date_created;
        self
    }
}

/// Local image source queued for upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    id: AssetId,
    pub uri: String,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
}

impl ImageAsset {
    /// Create an asset from a source URI
    pub fn new<S: Into<String>>(uri: S) -> Self {
        Self {
            id: AssetId::new(),
            uri: uri.into(),
            filename: None,
            mime_type: None,
        }
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_mime_type<S: Into<String>>(mut self, mime_type: S) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Identity used to match list entries across status transitions
    pub fn id(&self) -> AssetId {
        self.id
    }
}
