pub mod ids;
pub mod image;
pub mod key;
pub mod status;

pub use ids::{AssetId, ProductId, SiteId};
pub use image::{ImageAsset, ProductImage};
pub use key::ProductKey;
pub use status::{ImageStatus, ImageStatusList, ImageStatusUpdate};
