//! Marketplace source adapters

pub mod amazon;
pub mod ozon;
pub mod state_walk;
pub mod wildberries;

use std::sync::Arc;

use async_trait::async_trait;

use crate::infrastructure::http::ResilientClient;
use crate::shared::errors::SourceError;
use crate::shared::types::{Marketplace, Offer};

pub use amazon::AmazonAdapter;
pub use ozon::OzonAdapter;
pub use wildberries::WildberriesAdapter;

/// Trait for marketplace-specific adapters.
/// This provides a unified interface for different source implementations.
#[async_trait]
pub trait MarketplaceAdapter: Send + Sync {
    /// Get the marketplace this adapter handles
    fn marketplace(&self) -> Marketplace;

    /// Search the marketplace and return normalized offers.
    /// Adapters truncate results to a small fixed count per call.
    async fn search(&self, product_name: &str) -> Result<Vec<Offer>, SourceError>;
}

/// Hands out an adapter per marketplace. The application layer depends on
/// this seam rather than on the concrete factory.
pub trait AdapterSource: Send + Sync {
    fn create_adapter(&self, marketplace: Marketplace) -> Box<dyn MarketplaceAdapter>;
}

/// Factory for creating marketplace adapters
pub struct AdapterFactory {
    client: Arc<ResilientClient>,
}

impl AdapterFactory {
    pub fn new(client: Arc<ResilientClient>) -> Self {
        Self { client }
    }
}

impl AdapterSource for AdapterFactory {
    /// Create an adapter for the specified marketplace
    fn create_adapter(&self, marketplace: Marketplace) -> Box<dyn MarketplaceAdapter> {
        match marketplace {
            Marketplace::Amazon => Box::new(AmazonAdapter::new(Arc::clone(&self.client))),
            Marketplace::Wildberries => {
                Box::new(WildberriesAdapter::new(Arc::clone(&self.client)))
            }
            Marketplace::Ozon => Box::new(OzonAdapter::new(Arc::clone(&self.client))),
        }
    }
}

pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";
