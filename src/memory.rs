use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::error::{MediaError, MediaResult};
use crate::store::{MediaStore, ProductImagesRemote};
use crate::types::{ImageAsset, ProductId, ProductImage, SiteId};

/// A recorded remote save request
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub site_id: SiteId,
    pub product_id: ProductId,
    pub images: Vec<ProductImage>,
}

/// In-memory media library for tests and local development.
///
/// Uploads resolve immediately with sequential image ids unless the gate is
/// held; saves echo the submitted list back. Individual calls can be
/// scripted to fail.
pub struct MemoryMediaLibrary {
    next_image_id: AtomicI64,
    gate: Mutex<Option<Arc<Semaphore>>>,
    upload_failures: Mutex<VecDeque<String>>,
    save_failures: Mutex<VecDeque<String>>,
    save_requests: Mutex<Vec<SaveRequest>>,
}

impl MemoryMediaLibrary {
    pub fn new() -> Self {
        Self {
            next_image_id: AtomicI64::new(1),
            gate: Mutex::new(None),
            upload_failures: Mutex::new(VecDeque::new()),
            save_failures: Mutex::new(VecDeque::new()),
            save_requests: Mutex::new(Vec::new()),
        }
    }

    /// Make subsequent uploads wait until released
    pub fn hold_uploads(&self) {
        *self.gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held upload proceed
    pub fn release_upload(&self) {
        self.release_uploads(1);
    }

    /// Let `count` held uploads proceed
    pub fn release_uploads(&self, count: usize) {
        if let Some(gate) = self.gate.lock().as_ref() {
            gate.add_permits(count);
        }
    }

    /// Fail the next upload with the given reason
    pub fn fail_next_upload<S: Into<String>>(&self, reason: S) {
        self.upload_failures.lock().push_back(reason.into());
    }

    /// Fail the next save with the given reason
    pub fn fail_next_save<S: Into<String>>(&self, reason: S) {
        self.save_failures.lock().push_back(reason.into());
    }

    /// Save requests received so far, in order
    pub fn save_requests(&self) -> Vec<SaveRequest> {
        self.save_requests.lock().clone()
    }
}

impl Default for MemoryMediaLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaLibrary {
    async fn upload_image(
        &self,
        _site_id: SiteId,
        _product_id: ProductId,
        asset: &ImageAsset,
    ) -> MediaResult<ProductImage> {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| MediaError::upload_failed("upload gate closed"))?;
            permit.forget();
        }
        if let Some(reason) = self.upload_failures.lock().pop_front() {
            return Err(MediaError::upload_failed(reason));
        }
        let image_id = self.next_image_id.fetch_add(1, Ordering::SeqCst);
        let mut image = ProductImage::new(image_id, format!("https://media.example.com/{image_id}"));
        if let Some(filename) = &asset.filename {
            image = image.with_name(filename.clone());
        }
        Ok(image)
    }
}

#[async_trait]
impl ProductImagesRemote for MemoryMediaLibrary {
    async fn save_product_images(
        &self,
        site_id: SiteId,
        product_id: ProductId,
        images: Vec<ProductImage>,
    ) -> MediaResult<Vec<ProductImage>> {
        if let Some(reason) = self.save_failures.lock().pop_front() {
            return Err(MediaError::save_failed(reason));
        }
        self.save_requests.lock().push(SaveRequest {
            site_id,
            product_id,
            images: images.clone(),
        });
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_uploads_get_sequential_image_ids() {
        let library = MemoryMediaLibrary::new();
        let asset = ImageAsset::new("file:///a.jpg").with_filename("a.jpg");
        let first =
            assert_ok!(library.upload_image(SiteId(1), ProductId(2), &asset).await);
        let second =
            assert_ok!(library.upload_image(SiteId(1), ProductId(2), &asset).await);
        assert_eq!(first.image_id, 1);
        assert_eq!(second.image_id, 2);
        assert_eq!(first.name.as_deref(), Some("a.jpg"));
    }

    #[tokio::test]
    async fn test_scripted_failures_apply_once() {
        let library = MemoryMediaLibrary::new();
        let asset = ImageAsset::new("file:///a.jpg");

        library.fail_next_upload("out of space");
        let error = library
            .upload_image(SiteId(1), ProductId(2), &asset)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("out of space"));
        assert_ok!(library.upload_image(SiteId(1), ProductId(2), &asset).await);

        library.fail_next_save("http 500");
        let error = library
            .save_product_images(SiteId(1), ProductId(2), Vec::new())
            .await
            .unwrap_err();
        assert!(error.to_string().contains("http 500"));
        assert!(library.save_requests().is_empty());

        assert_ok!(
            library
                .save_product_images(SiteId(1), ProductId(2), Vec::new())
                .await
        );
        assert_eq!(library.save_requests().len(), 1);
    }
}
