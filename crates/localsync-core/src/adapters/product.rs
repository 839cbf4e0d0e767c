//! Product adapter: picks live or cached product data for display

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use crate::cache::ProductCache;
use crate::connectivity::ConnectivityMonitor;
use crate::engine::SyncEngine;
use crate::sync::SyncCallback;
use crate::types::Product;

/// Where displayed product data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSource {
    Live,
    Cached,
}

/// Product data ready for a screen, with flags for degraded UI
#[derive(Debug, Clone, PartialEq)]
pub struct ProductView {
    pub product: Option<Product>,
    pub source: Option<ProductSource>,
    pub is_offline: bool,
    /// A cached copy exists for this product
    pub has_offline_data: bool,
}

pub struct ProductAdapter {
    cache: ProductCache,
    connectivity: Arc<ConnectivityMonitor>,
}

impl ProductAdapter {
    pub fn new(engine: &SyncEngine) -> Self {
        Self {
            cache: engine.product_cache().clone(),
            connectivity: engine.connectivity().clone(),
        }
    }

    /// Choose what to show for `product_id`.
    ///
    /// Online, live data wins and is written through to the cache. Offline,
    /// the cached copy is served and its `viewedAt` refreshed; `live` is only
    /// used when nothing is cached.
    pub fn select(&self, product_id: &str, live: Option<Product>) -> ProductView {
        let is_offline = !self.connectivity.is_online();

        let live = match live {
            Some(product) if !is_offline => return self.serve_live(product, is_offline),
            other => other,
        };

        match self.cache.read_one(product_id) {
            Some(cached) => {
                self.cache.touch(product_id);
                debug!(product_id, is_offline, "Serving cached product");
                ProductView {
                    product: Some(cached.product),
                    source: Some(ProductSource::Cached),
                    is_offline,
                    has_offline_data: true,
                }
            }
            None => match live {
                Some(product) => self.serve_live(product, is_offline),
                None => ProductView {
                    product: None,
                    source: None,
                    is_offline,
                    has_offline_data: false,
                },
            },
        }
    }

    fn serve_live(&self, product: Product, is_offline: bool) -> ProductView {
        let has_offline_data = self.cache.save(&product);
        ProductView {
            product: Some(product),
            source: Some(ProductSource::Live),
            is_offline,
            has_offline_data,
        }
    }

    /// Recently viewed products, most recent first
    pub fn recently_viewed(&self, limit: usize) -> Vec<Product> {
        self.cache
            .recently_viewed(limit)
            .into_iter()
            .map(|cached| cached.product)
            .collect()
    }

    pub fn is_offline(&self) -> bool {
        !self.connectivity.is_online()
    }

    pub fn has_offline_data(&self) -> bool {
        !self.cache.read_all().is_empty()
    }

    /// Sync callback that refreshes every cached product from the backend
    pub fn sync_callback<F, Fut>(self: &Arc<Self>, fetch: F) -> SyncCallback
    where
        F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<Product>>> + Send + 'static,
    {
        let adapter = self.clone();
        let fetch = Arc::new(fetch);
        Arc::new(move || {
            let adapter = adapter.clone();
            let fetch = fetch.clone();
            async move {
                let ids = adapter.cache.ids();
                if ids.is_empty() {
                    return Ok(());
                }
                let products = fetch(ids).await?;
                let refreshed = adapter.cache.refresh(&products);
                debug!(refreshed, "Cached products refreshed");
                Ok(())
            }
            .boxed()
        })
    }
}
