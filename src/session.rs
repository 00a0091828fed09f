use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, warn};

use crate::config::UploaderConfig;
use crate::error::{MediaError, MediaResult};
use crate::store::MediaStore;
use crate::types::{
    AssetId, ImageAsset, ImageStatus, ImageStatusList, ImageStatusUpdate, ProductId, ProductImage,
    SiteId,
};

/// Owns the ordered image-status list for one product and drives each
/// queued image through the media store.
///
/// The session keeps uploading after the screen that created it lets go of
/// its reference; the coordinator retains it for the lifetime of the
/// editing session. Every mutation broadcasts the full status list, in
/// mutation order, together with the error that caused it (if any).
///
/// State machine per image: pending → uploading → remote or failed. Failed
/// entries stay in the list and can be re-driven with [`retry_upload`].
///
/// [`retry_upload`]: ImageUploadSession::retry_upload
pub struct ImageUploadSession {
    site_id: SiteId,
    product_id: ProductId,
    store: Arc<dyn MediaStore>,
    state: Mutex<SessionState>,
    upload_permits: Arc<Semaphore>,
}

struct SessionState {
    statuses: Vec<ImageStatus>,
    updates_tx: broadcast::Sender<ImageStatusUpdate>,
}

impl ImageUploadSession {
    pub(crate) fn new(
        site_id: SiteId,
        product_id: ProductId,
        original_statuses: Vec<ImageStatus>,
        store: Arc<dyn MediaStore>,
        config: &UploaderConfig,
    ) -> Arc<Self> {
        let (updates_tx, _) = broadcast::channel(config.status_channel_capacity);
        Arc::new(Self {
            site_id,
            product_id,
            store,
            state: Mutex::new(SessionState {
                statuses: original_statuses,
                updates_tx,
            }),
            upload_permits: Arc::new(Semaphore::new(config.max_concurrent_uploads)),
        })
    }

    pub fn site_id(&self) -> SiteId {
        self.site_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Snapshot of the current ordered status list
    pub fn image_statuses(&self) -> Vec<ImageStatus> {
        self.state.lock().statuses.clone()
    }

    /// True iff any image is still pending or uploading
    pub fn has_pending_upload(&self) -> bool {
        self.state.lock().statuses.has_pending_upload()
    }

    /// Subscribe to status updates
    pub fn subscribe(&self) -> broadcast::Receiver<ImageStatusUpdate> {
        self.state.lock().updates_tx.subscribe()
    }

    /// Atomically snapshot the current list and subscribe.
    ///
    /// Mutations broadcast while holding the same lock this takes, so the
    /// receiver is registered before any later mutation can publish — a
    /// caller acting on the snapshot cannot miss the transition that
    /// invalidates it.
    pub fn subscribe_with_snapshot(
        &self,
    ) -> (Vec<ImageStatus>, broadcast::Receiver<ImageStatusUpdate>) {
        let state = self.state.lock();
        (state.statuses.clone(), state.updates_tx.subscribe())
    }

    /// Queue a local asset and start uploading it
    pub fn upload_image(self: &Arc<Self>, asset: ImageAsset) {
        {
            let mut state = self.state.lock();
            state.statuses.push(ImageStatus::Pending {
                asset: asset.clone(),
            });
            Self::publish(&mut state, None);
        }
        self.spawn_upload(asset);
    }

    /// Re-drive a failed entry.
    ///
    /// Returns false when no failed entry carries the given asset id.
    pub fn retry_upload(self: &Arc<Self>, asset_id: AssetId) -> bool {
        let asset = {
            let state = self.state.lock();
            state.statuses.iter().find_map(|status| match status {
                ImageStatus::Failed { asset, .. } if asset.id() == asset_id => Some(asset.clone()),
                _ => None,
            })
        };
        match asset {
            Some(asset) => {
                self.spawn_upload(asset);
                true
            }
            None => false,
        }
    }

    /// Append images that already exist in the site's media library
    pub fn add_wordpress_media(&self, images: Vec<ProductImage>) {
        if images.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        state
            .statuses
            .extend(images.into_iter().map(|image| ImageStatus::Remote { image }));
        Self::publish(&mut state, None);
    }

    /// Remove the first entry equal to `status`.
    ///
    /// An upload already in flight for a removed entry keeps running; its
    /// result is discarded when it lands.
    pub fn remove_image(&self, status: &ImageStatus) -> bool {
        let mut state = self.state.lock();
        match state.statuses.iter().position(|current| current == status) {
            Some(index) => {
                state.statuses.remove(index);
                Self::publish(&mut state, None);
                true
            }
            None => false,
        }
    }

    fn publish(state: &mut SessionState, error: Option<Arc<MediaError>>) {
        let update = ImageStatusUpdate {
            statuses: state.statuses.clone(),
            error,
        };
        let _ = state.updates_tx.send(update);
    }

    fn spawn_upload(self: &Arc<Self>, asset: ImageAsset) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let Ok(permit) = session.upload_permits.clone().acquire_owned().await else {
                // the semaphore lives as long as the session
                return;
            };
            let _permit = permit;
            if !session.mark_uploading(asset.id()) {
                debug!(asset_id = %asset.id(), "image removed before its upload started");
                return;
            }
            let result = session
                .store
                .upload_image(session.site_id, session.product_id, &asset)
                .await;
            session.finish_upload(&asset, result);
        });
    }

    /// Pending or failed → uploading. False when the entry is gone.
    fn mark_uploading(&self, asset_id: AssetId) -> bool {
        let mut state = self.state.lock();
        let entry = state.statuses.iter_mut().find(|status| match status {
            ImageStatus::Pending { asset } | ImageStatus::Failed { asset, .. } => {
                asset.id() == asset_id
            }
            _ => false,
        });
        let Some(entry) = entry else {
            return false;
        };
        let Some(asset) = entry.asset().cloned() else {
            return false;
        };
        *entry = ImageStatus::Uploading { asset };
        Self::publish(&mut state, None);
        true
    }

    fn finish_upload(&self, asset: &ImageAsset, result: MediaResult<ProductImage>) {
        let mut state = self.state.lock();
        let position = state.statuses.iter().position(|status| {
            matches!(status, ImageStatus::Uploading { asset: current } if current.id() == asset.id())
        });
        let Some(index) = position else {
            debug!(asset_id = %asset.id(), "image removed while uploading, discarding result");
            return;
        };
        match result {
            Ok(image) => {
                debug!(
                    site_id = %self.site_id,
                    product_id = %self.product_id,
                    image_id = image.image_id,
                    "image upload finished"
                );
                state.statuses[index] = ImageStatus::Remote { image };
                Self::publish(&mut state, None);
            }
            Err(error) => {
                warn!(
                    site_id = %self.site_id,
                    product_id = %self.product_id,
                    asset_id = %asset.id(),
                    %error,
                    "image upload failed"
                );
                let error = Arc::new(error);
                state.statuses[index] = ImageStatus::Failed {
                    asset: asset.clone(),
                    error: Arc::clone(&error),
                };
                Self::publish(&mut state, Some(error));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryMediaLibrary;
    use std::time::Duration;

    fn session_with_library() -> (Arc<ImageUploadSession>, Arc<MemoryMediaLibrary>) {
        let library = Arc::new(MemoryMediaLibrary::new());
        let session = ImageUploadSession::new(
            SiteId(1),
            ProductId(42),
            Vec::new(),
            library.clone(),
            &UploaderConfig::default(),
        );
        (session, library)
    }

    async fn settled_statuses(session: &ImageUploadSession) -> Vec<ImageStatus> {
        let (mut statuses, mut updates) = session.subscribe_with_snapshot();
        while statuses.has_pending_upload() {
            let update = tokio::time::timeout(Duration::from_secs(1), updates.recv())
                .await
                .expect("timed out waiting for uploads to settle")
                .expect("session status stream ended");
            statuses = update.statuses;
        }
        statuses
    }

    #[tokio::test]
    async fn test_upload_transitions_in_order() {
        let (session, _library) = session_with_library();
        let (statuses, mut updates) = session.subscribe_with_snapshot();
        assert!(statuses.is_empty());

        session.upload_image(ImageAsset::new("file:///a.jpg"));

        let update = updates.recv().await.unwrap();
        assert!(matches!(update.statuses[0], ImageStatus::Pending { .. }));
        let update = updates.recv().await.unwrap();
        assert!(matches!(update.statuses[0], ImageStatus::Uploading { .. }));
        let update = updates.recv().await.unwrap();
        assert!(matches!(update.statuses[0], ImageStatus::Remote { .. }));
        assert!(update.error.is_none());
        assert!(!session.has_pending_upload());
    }

    #[tokio::test]
    async fn test_failed_upload_stays_in_list_for_retry() {
        let (session, library) = session_with_library();
        library.fail_next_upload("flaky network");
        session.upload_image(ImageAsset::new("file:///b.jpg"));

        let statuses = settled_statuses(&session).await;
        let asset_id = match &statuses[0] {
            ImageStatus::Failed { asset, .. } => asset.id(),
            other => panic!("expected a failed entry, got {other:?}"),
        };

        assert!(session.retry_upload(asset_id));
        let statuses = settled_statuses(&session).await;
        assert!(matches!(statuses[0], ImageStatus::Remote { .. }));

        // nothing failed anymore, so there is nothing to retry
        assert!(!session.retry_upload(asset_id));
    }

    #[tokio::test]
    async fn test_removed_entry_discards_its_upload() {
        let (session, library) = session_with_library();
        library.hold_uploads();
        session.upload_image(ImageAsset::new("file:///c.jpg"));

        let status = session.image_statuses()[0].clone();
        assert!(session.remove_image(&status));
        library.release_upload();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(session.image_statuses().is_empty());
        assert!(!session.remove_image(&status));
    }

    #[tokio::test]
    async fn test_library_media_lands_as_remote_entries() {
        let (session, _library) = session_with_library();
        session.add_wordpress_media(vec![
            ProductImage::new(11, "https://media.example.com/11"),
            ProductImage::new(12, "https://media.example.com/12"),
        ]);
        assert_eq!(session.image_statuses().image_ids(), vec![11, 12]);
        assert!(!session.has_pending_upload());
    }
}
