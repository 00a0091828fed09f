use super::{ProductId, SiteId};

/// Composite identity of a product's upload machinery in the registry.
///
/// Two keys are equal iff site, product, and the local-id flag all match.
/// The flag keeps a locally-created product (negative client id) from ever
/// colliding with a remote product that happens to share the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductKey {
    pub site_id: SiteId,
    pub product_id: ProductId,
    pub is_local_id: bool,
}

impl ProductKey {
    pub fn new(site_id: SiteId, product_id: ProductId, is_local_id: bool) -> Self {
        Self {
            site_id,
            product_id,
            is_local_id,
        }
    }

    /// Key for a product that only exists locally (pre-creation)
    pub fn local(site_id: SiteId, product_id: ProductId) -> Self {
        Self::new(site_id, product_id, true)
    }

    /// Key for a product confirmed by the remote store
    pub fn remote(site_id: SiteId, product_id: ProductId) -> Self {
        Self::new(site_id, product_id, false)
    }
}
