use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::MediaResult;
use crate::store::MediaStore;
use crate::types::{ImageAsset, ProductId, ProductImage, SiteId};

/// Bounded retry with a fixed delay between attempts
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt; exceeding the bound is a
    /// terminal failure
    pub max_retries: u32,

    /// Fixed delay before each retry
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }
}

/// Decorator adding bounded retry to a media store.
///
/// The upload pipeline itself never retries; wrap the store when the
/// transport is flaky enough to warrant a second attempt before a failure
/// reaches the status list.
pub struct RetryingMediaStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: MediaStore> RetryingMediaStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<S: MediaStore> MediaStore for RetryingMediaStore<S> {
    async fn upload_image(
        &self,
        site_id: SiteId,
        product_id: ProductId,
        asset: &ImageAsset,
    ) -> MediaResult<ProductImage> {
        let mut attempt = 0;
        loop {
            match self.inner.upload_image(site_id, product_id, asset).await {
                Ok(image) => return Ok(image),
                Err(error) if attempt < self.policy.max_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.policy.max_retries,
                        %error,
                        "image upload attempt failed, retrying after delay"
                    );
                    tokio::time::sleep(self.policy.delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
