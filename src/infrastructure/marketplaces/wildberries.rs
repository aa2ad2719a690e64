use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;

use super::{MarketplaceAdapter, BROWSER_USER_AGENT};
use crate::infrastructure::http::{RequestOptions, ResilientClient};
use crate::shared::errors::SourceError;
use crate::shared::types::{Marketplace, Offer};

const SEARCH_URL: &str = "https://search.wb.ru/exactmatch/ru/common/v5/search";
const MAX_OFFERS: usize = 8;

/// Структура ответа поискового API Wildberries
#[derive(Debug, Deserialize)]
struct WbSearchResponse {
    #[serde(default)]
    data: WbData,
}

#[derive(Debug, Default, Deserialize)]
struct WbData {
    #[serde(default)]
    products: Vec<WbProduct>,
}

#[derive(Debug, Deserialize)]
struct WbProduct {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    name: String,
    /// Prices come in minor units (kopecks).
    #[serde(rename = "salePriceU")]
    sale_price_u: Option<f64>,
    #[serde(rename = "priceU")]
    price_u: Option<f64>,
    #[serde(rename = "reviewRating")]
    review_rating: Option<f64>,
}

/// Wildberries search-API adapter. The public search endpoint answers with
/// structured JSON, so no markup fallback is needed here.
pub struct WildberriesAdapter {
    client: Arc<ResilientClient>,
}

impl WildberriesAdapter {
    pub fn new(client: Arc<ResilientClient>) -> Self {
        Self { client }
    }

    fn map_product(&self, item: &WbProduct) -> Option<Offer> {
        let price_minor = item.sale_price_u.or(item.price_u)?;
        if item.name.is_empty() {
            return None;
        }
        // Ratings above a plausible bound are stored x100 by the API.
        let rating = item.review_rating.map(|r| if r > 10.0 { r / 100.0 } else { r });
        Some(Offer {
            title: item.name.clone(),
            price: price_minor / 100.0,
            currency: "RUB".to_string(),
            marketplace: Marketplace::Wildberries,
            rating,
            url: format!("https://www.wildberries.ru/catalog/{}/detail.aspx", item.id),
            image_url: format!("https://images.wbstatic.net/c516x688/new/{}-1.jpg", item.id),
            parsed_at: Utc::now(),
        })
    }
}

#[async_trait]
impl MarketplaceAdapter for WildberriesAdapter {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Wildberries
    }

    async fn search(&self, product_name: &str) -> Result<Vec<Offer>, SourceError> {
        let options = RequestOptions::default()
            .header("User-Agent", BROWSER_USER_AGENT)
            .header("Accept", "application/json")
            .header("Origin", "https://www.wildberries.ru")
            .header("Referer", "https://www.wildberries.ru/")
            .query("appType", "1")
            .query("curr", "rub")
            .query("dest", "-1257786")
            .query("query", product_name)
            .query("resultset", "catalog")
            .query("sort", "popular")
            .query("limit", "20")
            .query("page", "1");

        let response = self.client.get(SEARCH_URL, &options).await?;
        let payload: WbSearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let offers: Vec<Offer> = payload
            .data
            .products
            .iter()
            .filter_map(|item| self.map_product(item))
            .take(MAX_OFFERS)
            .collect();
        if offers.is_empty() {
            warn!("Wildberries search for '{}' yielded no offers", product_name);
        }
        Ok(offers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http::ProxyPool;

    fn adapter() -> WildberriesAdapter {
        let pool = Arc::new(ProxyPool::new(None));
        WildberriesAdapter::new(Arc::new(ResilientClient::new(pool, None, 1, 0)))
    }

    #[test]
    fn test_minor_unit_price_and_rating_rescale() {
        let item = WbProduct {
            id: 42,
            name: "Ноутбук".to_string(),
            sale_price_u: Some(1_299_900.0),
            price_u: Some(1_499_900.0),
            review_rating: Some(470.0),
        };
        let offer = adapter().map_product(&item).unwrap();
        assert_eq!(offer.price, 12999.0); // kopecks / 100
        assert_eq!(offer.rating, Some(4.7)); // 470 rescaled
        assert_eq!(offer.currency, "RUB");
        assert!(offer.url.contains("/catalog/42/"));
    }

    #[test]
    fn test_missing_price_drops_item() {
        let item = WbProduct {
            id: 1,
            name: "No price".to_string(),
            sale_price_u: None,
            price_u: None,
            review_rating: None,
        };
        assert!(adapter().map_product(&item).is_none());
    }
}
