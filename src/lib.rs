//! # storefront-media: background product image upload coordination
//!
//! `storefront-media` keeps product images uploading after the merchant
//! leaves the editing screen, and defers the remote "save product images"
//! call until every upload for the product has settled.
//!
//! ## Key pieces
//!
//! - **[`ImageUploadCoordinator`]**: process-scoped registry mapping a
//!   product to its upload machinery; re-keys entries when a locally
//!   created product receives its remote id and multiplexes per-product
//!   status streams into one outward failure stream.
//! - **[`ImageUploadSession`]**: per-product handler owning the ordered
//!   image-status list and driving each queued image through the store.
//! - **[`DeferredImagesSaver`]**: waits for a session to report no pending
//!   upload, then issues exactly one remote save.
//! - **[`MediaStore`] / [`ProductImagesRemote`]**: the transport seams.
//!   Implement them over your HTTP client; the coordinator never talks to
//!   the network itself.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use storefront_media::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let library = Arc::new(MemoryMediaLibrary::new());
//! let uploader = ImageUploadCoordinator::new(
//!     library.clone(),
//!     library.clone(),
//!     UploaderConfig::default(),
//! );
//!
//! // Background upload failures surface here for whichever screen is
//! // currently visible.
//! let _failures = uploader.status_updates();
//!
//! let key = ProductKey::remote(SiteId(1), ProductId(606));
//! let session = uploader.upload_session(key, Vec::new());
//! session.upload_image(ImageAsset::new("file:///photos/front.jpg"));
//!
//! // The upload keeps running even if `session` is dropped here; the
//! // coordinator retains it until a new editing session starts.
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod memory;
pub mod retry;
pub mod saver;
pub mod session;
pub mod store;
pub mod types;

pub use config::UploaderConfig;
pub use coordinator::{ImageUploadCoordinator, ImageUploadEvent};
pub use error::{MediaError, MediaResult};
pub use memory::{MemoryMediaLibrary, SaveRequest};
pub use retry::{RetryPolicy, RetryingMediaStore};
pub use saver::DeferredImagesSaver;
pub use session::ImageUploadSession;
pub use store::{MediaStore, ProductImagesRemote};
pub use types::{
    AssetId, ImageAsset, ImageStatus, ImageStatusList, ImageStatusUpdate, ProductId, ProductImage,
    ProductKey, SiteId,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ImageAsset, ImageStatus, ImageStatusList, ImageUploadCoordinator, MediaResult, MediaStore,
        MemoryMediaLibrary, ProductId, ProductImage, ProductImagesRemote, ProductKey, SiteId,
        UploaderConfig,
    };
}
