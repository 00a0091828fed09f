use std::sync::Arc;

use crate::error::MediaError;

use super::{ImageAsset, ProductImage};

/// Upload state of a single image in a product's ordered image list.
///
/// The list order is display order. Failed entries stay in the list so the
/// caller can offer a retry.
#[derive(Debug, Clone)]
pub enum ImageStatus {
    /// Queued locally, upload not started yet
    Pending { asset: ImageAsset },
    /// Upload in flight
    Uploading { asset: ImageAsset },
    /// Uploaded, known to the remote store
    Remote { image: ProductImage },
    /// Upload failed; retryable
    Failed {
        asset: ImageAsset,
        error: Arc<MediaError>,
    },
}

impl ImageStatus {
    /// True while the image still needs or is undergoing an upload
    pub fn is_pending_upload(&self) -> bool {
        matches!(self, Self::Pending { .. } | Self::Uploading { .. })
    }

    /// The local asset behind this entry, when there is one
    pub fn asset(&self) -> Option<&ImageAsset> {
        match self {
            Self::Pending { asset } | Self::Uploading { asset } | Self::Failed { asset, .. } => {
                Some(asset)
            }
            Self::Remote { .. } => None,
        }
    }

    /// The remote image descriptor, once uploaded
    pub fn image(&self) -> Option<&ProductImage> {
        match self {
            Self::Remote { image } => Some(image),
            _ => None,
        }
    }
}

// Failed entries compare by asset plus error display text; MediaError holds
// a boxed source and cannot derive Eq itself.
impl PartialEq for ImageStatus {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Pending { asset: a }, Self::Pending { asset: b }) => a == b,
            (Self::Uploading { asset: a }, Self::Uploading { asset: b }) => a == b,
            (Self::Remote { image: a }, Self::Remote { image: b }) => a == b,
            (
                Self::Failed {
                    asset: a,
                    error: a_err,
                },
                Self::Failed {
                    asset: b,
                    error: b_err,
                },
            ) => a == b && (Arc::ptr_eq(a_err, b_err) || a_err.to_string() == b_err.to_string()),
            _ => false,
        }
    }
}

/// Ordered-list helpers over a product's image statuses
pub trait ImageStatusList {
    /// True iff any entry is still pending or uploading
    fn has_pending_upload(&self) -> bool;

    /// Remote image descriptors, in display order
    fn images(&self) -> Vec<ProductImage>;

    /// Remote image ids, in display order
    fn image_ids(&self) -> Vec<i64>;
}

impl ImageStatusList for [ImageStatus] {
    fn has_pending_upload(&self) -> bool {
        self.iter().any(ImageStatus::is_pending_upload)
    }

    fn images(&self) -> Vec<ProductImage> {
        self.iter().filter_map(|status| status.image().cloned()).collect()
    }

    fn image_ids(&self) -> Vec<i64> {
        self.iter()
            .filter_map(|status| status.image().map(|image| image.image_id))
            .collect()
    }
}

/// Status list plus the error behind the latest mutation, published by a
/// session after every change
#[derive(Debug, Clone)]
pub struct ImageStatusUpdate {
    pub statuses: Vec<ImageStatus>,
    pub error: Option<Arc<MediaError>>,
}
