use async_trait::async_trait;

use crate::error::MediaResult;
use crate::types::{ImageAsset, ProductId, ProductImage, SiteId};

/// Uploads a single image to the site's media library.
///
/// Transport, chunking, and authentication live behind this seam; the
/// coordinator only sequences calls and tracks the resulting status.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload one image and resolve to its remote descriptor
    async fn upload_image(
        &self,
        site_id: SiteId,
        product_id: ProductId,
        asset: &ImageAsset,
    ) -> MediaResult<ProductImage>;
}

/// Persists a product's ordered image list on the remote store
#[async_trait]
pub trait ProductImagesRemote: Send + Sync {
    /// Replace the product's image list and resolve to the saved list
    async fn save_product_images(
        &self,
        site_id: SiteId,
        product_id: ProductId,
        images: Vec<ProductImage>,
    ) -> MediaResult<Vec<ProductImage>>;
}
