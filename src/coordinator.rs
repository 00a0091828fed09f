use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::config::UploaderConfig;
use crate::error::{MediaError, MediaResult};
use crate::saver::DeferredImagesSaver;
use crate::session::ImageUploadSession;
use crate::store::{MediaStore, ProductImagesRemote};
use crate::types::{
    ImageStatus, ImageStatusList, ProductId, ProductImage, ProductKey, SiteId,
};

/// Outward notification of a background upload failure
#[derive(Debug, Clone)]
pub struct ImageUploadEvent {
    pub site_id: SiteId,
    pub product_id: ProductId,
    pub statuses: Vec<ImageStatus>,
    pub error: Arc<MediaError>,
}

struct SessionEntry {
    session: Arc<ImageUploadSession>,
    /// Key the forwarder stamps on outward events; rewritten when a local
    /// product receives its remote id.
    key_cell: Arc<RwLock<ProductKey>>,
}

#[derive(Default)]
struct RegistryState {
    sessions: HashMap<ProductKey, SessionEntry>,
    savers: HashMap<ProductKey, Arc<DeferredImagesSaver>>,
}

/// Registry of per-product upload machinery.
///
/// Maps a [`ProductKey`] to its upload session and deferred saver, re-keys
/// entries when a locally-created product receives its remote id, and
/// multiplexes per-session status streams into one outward event stream.
/// Entries are superseded, never swept: the coordinator is a process-scoped
/// cache owned by whatever application context constructs the product
/// editing screens.
///
/// The outward stream carries only failures, so whichever screen is active
/// can surface background-upload errors; per-product emission can be paused
/// with [`stop_emitting_status_updates`] while the uploads themselves keep
/// running.
///
/// [`stop_emitting_status_updates`]: ImageUploadCoordinator::stop_emitting_status_updates
pub struct ImageUploadCoordinator {
    store: Arc<dyn MediaStore>,
    remote: Arc<dyn ProductImagesRemote>,
    config: UploaderConfig,
    state: RwLock<RegistryState>,
    excluded: Arc<RwLock<HashSet<ProductKey>>>,
    events_tx: broadcast::Sender<ImageUploadEvent>,
}

impl ImageUploadCoordinator {
    /// Create a coordinator over the given collaborators
    pub fn new(
        store: Arc<dyn MediaStore>,
        remote: Arc<dyn ProductImagesRemote>,
        config: UploaderConfig,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(config.event_channel_capacity);
        Self {
            store,
            remote,
            config,
            state: RwLock::new(RegistryState::default()),
            excluded: Arc::new(RwLock::new(HashSet::new())),
            events_tx,
        }
    }

    /// Subscribe to background upload failures across all products
    pub fn status_updates(&self) -> broadcast::Receiver<ImageUploadEvent> {
        self.events_tx.subscribe()
    }

    /// Session accessor for the product editing flows.
    ///
    /// Returns the existing session while it still has an upload pending;
    /// otherwise starts a fresh session seeded from `original_statuses`,
    /// discarding any finished session's history — a new editing session
    /// begins from the caller's baseline, not from stale completed state.
    pub fn upload_session(
        &self,
        key: ProductKey,
        original_statuses: Vec<ImageStatus>,
    ) -> Arc<ImageUploadSession> {
        let mut state = self.state.write();
        if let Some(entry) = state.sessions.get(&key) {
            if entry.session.has_pending_upload() {
                return Arc::clone(&entry.session);
            }
        }
        debug!(
            site_id = %key.site_id,
            product_id = %key.product_id,
            is_local_id = key.is_local_id,
            "starting a new image upload session"
        );
        let session = ImageUploadSession::new(
            key.site_id,
            key.product_id,
            original_statuses,
            Arc::clone(&self.store),
            &self.config,
        );
        let key_cell = self.spawn_status_forwarder(key, &session);
        state.sessions.insert(
            key,
            SessionEntry {
                session: Arc::clone(&session),
                key_cell,
            },
        );
        session
    }

    /// Move a locally-created product's entry to its remote id, keeping the
    /// session (and any uploads in flight) intact.
    ///
    /// Called as soon as the remote store confirms the product, so images
    /// that started uploading before creation can be saved against the real
    /// id. No-op when nothing is registered under the local key.
    pub fn replace_local_id(
        &self,
        site_id: SiteId,
        local_product_id: ProductId,
        remote_product_id: ProductId,
    ) {
        let local_key = ProductKey::local(site_id, local_product_id);
        let mut state = self.state.write();
        let Some(entry) = state.sessions.remove(&local_key) else {
            return;
        };
        let remote_key = ProductKey::remote(site_id, remote_product_id);
        debug!(
            site_id = %site_id,
            local_product_id = %local_product_id,
            remote_product_id = %remote_product_id,
            "re-keying upload session to remote product id"
        );
        *entry.key_cell.write() = remote_key;
        state.sessions.insert(remote_key, entry);
    }

    /// Resume outward error notifications for the product
    pub fn start_emitting_status_updates(&self, key: ProductKey) {
        self.excluded.write().remove(&key);
    }

    /// Suppress outward error notifications for the product.
    ///
    /// The uploads themselves keep running; only notification is paused,
    /// for screens that are not currently visible.
    pub fn stop_emitting_status_updates(&self, key: ProductKey) {
        self.excluded.write().insert(key);
    }

    /// Whether the product's images differ from what is (or is about to
    /// be) persisted remotely.
    ///
    /// False when no session is registered. When a save is on its way, only
    /// edits made after its list was captured count; otherwise any pending
    /// upload or any difference in remote image ids against
    /// `original_images` counts.
    pub fn has_unsaved_changes_on_images(
        &self,
        key: ProductKey,
        original_images: &[ProductImage],
    ) -> bool {
        let state = self.state.read();
        let Some(entry) = state.sessions.get(&key) else {
            return false;
        };
        let statuses = entry.session.image_statuses();
        if let Some(saver) = state.savers.get(&key) {
            let statuses_to_save = saver.image_statuses_to_save();
            if !statuses_to_save.is_empty() {
                return statuses != statuses_to_save;
            }
        }
        let original_ids: Vec<i64> = original_images.iter().map(|image| image.image_id).collect();
        statuses.has_pending_upload() || statuses.image_ids() != original_ids
    }

    /// Schedule a deferred save once every upload for the product settles.
    ///
    /// No-op when the product only exists locally (a remote save needs the
    /// real product id), when no session is registered, or when the session
    /// has no upload pending — in the latter cases there is nothing to wait
    /// for, and the callback is not invoked.
    pub fn save_product_images_when_no_upload_pending<F>(&self, key: ProductKey, on_product_save: F)
    where
        F: FnOnce(MediaResult<Vec<ProductImage>>) + Send + 'static,
    {
        if key.is_local_id {
            debug!(
                site_id = %key.site_id,
                product_id = %key.product_id,
                "ignoring save for a product that does not exist remotely yet"
            );
            return;
        }
        let (session, saver) = {
            let mut state = self.state.write();
            let Some(entry) = state.sessions.get(&key) else {
                return;
            };
            if !entry.session.has_pending_upload() {
                return;
            }
            let session = Arc::clone(&entry.session);
            let saver = Arc::clone(state.savers.entry(key).or_insert_with(|| {
                DeferredImagesSaver::new(key.site_id, key.product_id, Arc::clone(&self.remote))
            }));
            (session, saver)
        };
        saver.save_when_no_upload_pending(session, Box::new(on_product_save));
    }

    /// Forward a session's updates to the outward stream. Only updates that
    /// carry an error leave the coordinator, and only while the key is not
    /// excluded.
    fn spawn_status_forwarder(
        &self,
        key: ProductKey,
        session: &Arc<ImageUploadSession>,
    ) -> Arc<RwLock<ProductKey>> {
        let key_cell = Arc::new(RwLock::new(key));
        let cell = Arc::clone(&key_cell);
        let excluded = Arc::clone(&self.excluded);
        let events_tx = self.events_tx.clone();
        let mut updates = session.subscribe();
        tokio::spawn(async move {
            loop {
                let update = match updates.recv().await {
                    Ok(update) => update,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "status updates lagged behind the forwarder");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(error) = update.error else {
                    continue;
                };
                let key = *cell.read();
                if excluded.read().contains(&key) {
                    continue;
                }
                let _ = events_tx.send(ImageUploadEvent {
                    site_id: key.site_id,
                    product_id: key.product_id,
                    statuses: update.statuses,
                    error,
                });
            }
        });
        key_cell
    }
}
