use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::error::MediaResult;
use crate::session::ImageUploadSession;
use crate::store::ProductImagesRemote;
use crate::types::{ImageStatus, ImageStatusList, ProductId, ProductImage, SiteId};

/// Completion callback for a deferred image save
pub(crate) type OnProductSave = Box<dyn FnOnce(MediaResult<Vec<ProductImage>>) + Send + 'static>;

/// Issues exactly one remote "save product images" request per scheduling,
/// after the observed session reports no pending upload.
///
/// The list captured at the moment the zero-pending condition is observed
/// becomes the submitted save list; the coordinator compares it against the
/// session's current list to detect edits made after the save was queued.
pub struct DeferredImagesSaver {
    site_id: SiteId,
    product_id: ProductId,
    remote: Arc<dyn ProductImagesRemote>,
    state: Mutex<SaverState>,
}

#[derive(Default)]
struct SaverState {
    statuses_to_save: Vec<ImageStatus>,
    save_pending: bool,
}

impl DeferredImagesSaver {
    pub(crate) fn new(
        site_id: SiteId,
        product_id: ProductId,
        remote: Arc<dyn ProductImagesRemote>,
    ) -> Arc<Self> {
        Arc::new(Self {
            site_id,
            product_id,
            remote,
            state: Mutex::new(SaverState::default()),
        })
    }

    /// The list submitted by the save currently on its way, empty otherwise
    pub fn image_statuses_to_save(&self) -> Vec<ImageStatus> {
        self.state.lock().statuses_to_save.clone()
    }

    /// Wait for the session's uploads to settle, then save its images.
    ///
    /// No-op while an earlier save for this product is still scheduled or
    /// in flight; the save request fires at most once per scheduling, and a
    /// failure is surfaced through the callback without retry.
    pub(crate) fn save_when_no_upload_pending(
        self: &Arc<Self>,
        session: Arc<ImageUploadSession>,
        on_product_save: OnProductSave,
    ) {
        {
            let mut state = self.state.lock();
            if state.save_pending {
                debug!(
                    site_id = %self.site_id,
                    product_id = %self.product_id,
                    "a save is already scheduled for this product"
                );
                return;
            }
            state.save_pending = true;
        }

        let saver = Arc::clone(self);
        tokio::spawn(async move {
            let (mut statuses, mut updates) = session.subscribe_with_snapshot();
            while statuses.has_pending_upload() {
                match updates.recv().await {
                    Ok(update) => statuses = update.statuses,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "status updates lagged, re-reading session state");
                        statuses = session.image_statuses();
                    }
                    Err(RecvError::Closed) => {
                        statuses = session.image_statuses();
                        if statuses.has_pending_upload() {
                            // the session went away mid-upload; nothing left
                            // to wait on
                            saver.state.lock().save_pending = false;
                            return;
                        }
                    }
                }
            }
            saver.state.lock().statuses_to_save = statuses.clone();

            let images = statuses.images();
            info!(
                site_id = %saver.site_id,
                product_id = %saver.product_id,
                image_count = images.len(),
                "saving product images"
            );
            let result = saver
                .remote
                .save_product_images(saver.site_id, saver.product_id, images)
                .await;
            if let Err(error) = &result {
                warn!(
                    site_id = %saver.site_id,
                    product_id = %saver.product_id,
                    %error,
                    "saving product images failed"
                );
            }
            {
                let mut state = saver.state.lock();
                state.statuses_to_save.clear();
                state.save_pending = false;
            }
            on_product_save(result);
        });
    }
}
