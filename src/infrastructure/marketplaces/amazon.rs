use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use tracing::warn;

use super::{MarketplaceAdapter, BROWSER_USER_AGENT};
use crate::infrastructure::http::{RequestOptions, ResilientClient};
use crate::shared::errors::SourceError;
use crate::shared::types::{Marketplace, Offer};
use crate::shared::utils::parse_price_text;

const MAX_OFFERS: usize = 5;

/// Selector rules for the search result markup. Amazon serves no usable
/// embedded state on the search page, so markup extraction is the only
/// strategy here.
struct MarkupRules {
    result_block: Regex,
    title: Regex,
    price_whole: Regex,
    image: Regex,
    link: Regex,
    rating: Regex,
}

impl MarkupRules {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            result_block: Regex::new(r#"data-component-type="s-search-result""#)?,
            title: Regex::new(r"(?s)<h2[^>]*>.*?<span[^>]*>([^<]+)</span>")?,
            price_whole: Regex::new(r#"class="a-price-whole"[^>]*>([\d,.]+)"#)?,
            image: Regex::new(r#"<img[^>]+class="s-image"[^>]+src="([^"]+)""#)?,
            link: Regex::new(r#"class="a-link-normal[^"]*"[^>]*href="([^"]+)""#)?,
            rating: Regex::new(r#"class="a-icon-alt"[^>]*>([\d.]+)"#)?,
        })
    }
}

/// Amazon search-page adapter.
pub struct AmazonAdapter {
    client: Arc<ResilientClient>,
}

impl AmazonAdapter {
    pub fn new(client: Arc<ResilientClient>) -> Self {
        Self { client }
    }

    fn parse_page(&self, html: &str, rules: &MarkupRules) -> Vec<Offer> {
        // Split the page into per-result chunks; the marker itself belongs to
        // the chunk that follows it.
        let mut blocks: Vec<&str> = Vec::new();
        let mut starts: Vec<usize> = rules
            .result_block
            .find_iter(html)
            .map(|m| m.start())
            .collect();
        starts.push(html.len());
        for window in starts.windows(2) {
            blocks.push(&html[window[0]..window[1]]);
        }

        blocks
            .iter()
            .filter_map(|block| self.map_result_block(block, rules))
            .take(MAX_OFFERS)
            .collect()
    }

    /// Missing title or price discards the single item, never the page.
    fn map_result_block(&self, block: &str, rules: &MarkupRules) -> Option<Offer> {
        let title = rules
            .title
            .captures(block)
            .map(|c| c[1].trim().to_string())
            .filter(|t| !t.is_empty())?;
        let price = rules
            .price_whole
            .captures(block)
            .and_then(|c| parse_price_text(&c[1]))?;

        let image_url = rules
            .image
            .captures(block)
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        let url = rules
            .link
            .captures(block)
            .map(|c| format!("https://amazon.com{}", &c[1]))
            .unwrap_or_default();
        let rating = rules
            .rating
            .captures(block)
            .and_then(|c| c[1].parse::<f64>().ok());

        Some(Offer {
            title,
            price,
            currency: "USD".to_string(),
            marketplace: Marketplace::Amazon,
            rating,
            url,
            image_url,
            parsed_at: Utc::now(),
        })
    }
}

#[async_trait]
impl MarketplaceAdapter for AmazonAdapter {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Amazon
    }

    async fn search(&self, product_name: &str) -> Result<Vec<Offer>, SourceError> {
        let url = format!(
            "https://www.amazon.com/s?k={}",
            product_name.replace(' ', "+")
        );
        let options = RequestOptions::default()
            .header("User-Agent", BROWSER_USER_AGENT)
            .header("Accept-Language", "en-US,en;q=0.9")
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header("Referer", "https://www.amazon.com/");

        let response = self.client.get(&url, &options).await?;
        let html = response
            .text()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let rules = MarkupRules::compile().map_err(|e| SourceError::Parse(e.to_string()))?;
        let offers = self.parse_page(&html, &rules);
        if offers.is_empty() {
            warn!("Amazon search for '{}' yielded no offers", product_name);
        }
        Ok(offers)
    }
}
