use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::state_walk::find_items_list;
use super::{MarketplaceAdapter, BROWSER_USER_AGENT};
use crate::infrastructure::http::{RequestOptions, ResilientClient};
use crate::shared::errors::SourceError;
use crate::shared::types::{Marketplace, Offer};
use crate::shared::utils::parse_price_text;

const MAX_OFFERS: usize = 6;
const STATE_ITEM_LIMIT: usize = 5;

/// Ozon adapter. The site rotates between server-rendered state blobs,
/// an internal composer API and obfuscated markup, so extraction runs an
/// ordered strategy list and stops at the first non-empty result:
/// 1. `__NEXT_DATA__` embedded page state,
/// 2. composer-api internal endpoint,
/// 3. direct markup cards.
pub struct OzonAdapter {
    client: Arc<ResilientClient>,
}

impl OzonAdapter {
    pub fn new(client: Arc<ResilientClient>) -> Self {
        Self { client }
    }

    fn default_options(&self) -> RequestOptions {
        RequestOptions::default()
            .header("User-Agent", BROWSER_USER_AGENT)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header("Accept-Language", "ru,en;q=0.9")
            .header("Referer", "https://www.ozon.ru/")
    }

    /// Strategy 1: machine-readable page state embedded in the markup.
    fn parse_from_state(&self, html: &str) -> Vec<Offer> {
        let Ok(script) =
            Regex::new(r#"(?s)<script id="__NEXT_DATA__"[^>]*>(.*?)</script>"#)
        else {
            return Vec::new();
        };
        let Some(captures) = script.captures(html) else {
            return Vec::new();
        };
        let state: Value = match serde_json::from_str(&captures[1]) {
            Ok(state) => state,
            Err(e) => {
                debug!("Ozon state parse failed: {}", e);
                return Vec::new();
            }
        };
        let Some(items) = find_items_list(&state) else {
            return Vec::new();
        };
        items
            .iter()
            .take(STATE_ITEM_LIMIT)
            .filter_map(map_state_item)
            .collect()
    }

    /// Strategy 2: internal composer-api endpoint. Often sits behind
    /// Cloudflare; returns empty on block but helps when markup is
    /// obfuscated.
    async fn composer_api_search(&self, product_name: &str) -> Vec<Offer> {
        let payload = serde_json::json!({
            "url": format!("/search/?text={}", product_name.replace(' ', "+")),
            "action": "state/get",
        });
        let options = self
            .default_options()
            .header("Content-Type", "application/json")
            .header("Origin", "https://www.ozon.ru")
            .json(payload);

        let response = match self
            .client
            .post("https://www.ozon.ru/api/composer-api.bx/_action", &options)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("Ozon composer api error: {}", e);
                return Vec::new();
            }
        };
        let data: Value = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                debug!("Ozon composer api payload error: {}", e);
                return Vec::new();
            }
        };

        // widgetStates maps widget ids to JSON-encoded strings.
        let Some(widgets) = data.get("widgetStates").and_then(Value::as_object) else {
            return Vec::new();
        };
        for widget_json in widgets.values().filter_map(Value::as_str) {
            let Ok(widget) = serde_json::from_str::<Value>(widget_json) else {
                continue;
            };
            let items = match &widget {
                Value::Object(map) => map
                    .get("items")
                    .or_else(|| map.get("products"))
                    .and_then(Value::as_array),
                Value::Array(values) if !values.is_empty() => Some(values),
                _ => None,
            };
            let Some(items) = items else { continue };
            let offers: Vec<Offer> = items.iter().filter_map(map_state_item).collect();
            if !offers.is_empty() {
                return offers;
            }
        }
        Vec::new()
    }

    /// Strategy 3: markup cards, the least stable path.
    fn parse_from_cards(&self, html: &str) -> Vec<Offer> {
        let Ok(card) = Regex::new(
            r#"(?s)<a[^>]+class="tile-hover-target"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#,
        ) else {
            return Vec::new();
        };
        let Ok(title_rule) = Regex::new(r"(?s)<span[^>]*>([^<]+)</span>") else {
            return Vec::new();
        };
        let Ok(price_rule) = Regex::new(r"([\d][\d\s]*)\s*₽") else {
            return Vec::new();
        };

        let mut offers = Vec::new();
        for captures in card.captures_iter(html).take(STATE_ITEM_LIMIT) {
            let href = &captures[1];
            let body = &captures[2];
            let Some(title) = title_rule
                .captures(body)
                .map(|c| c[1].trim().to_string())
                .filter(|t| !t.is_empty())
            else {
                continue;
            };
            let Some(price) = price_rule
                .captures(body)
                .and_then(|c| parse_price_text(&c[1]))
            else {
                continue;
            };
            let url = if href.starts_with('/') {
                format!("https://www.ozon.ru{}", href)
            } else {
                href.to_string()
            };
            offers.push(Offer {
                title,
                price,
                currency: "RUB".to_string(),
                marketplace: Marketplace::Ozon,
                rating: None,
                url,
                image_url: String::new(),
                parsed_at: Utc::now(),
            });
        }
        offers
    }
}

/// Map one raw state item to an Offer. Field names differ between widgets,
/// so several aliases are probed; a missing title or price drops the item.
fn map_state_item(item: &Value) -> Option<Offer> {
    let title = item
        .get("name")
        .or_else(|| item.get("title"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|t| !t.is_empty())?;

    let price_raw = item.get("price").or_else(|| item.get("priceValue"))?;
    let price_text = match price_raw {
        Value::Object(map) => map
            .get("price")
            .or_else(|| map.get("value"))
            .map(value_to_text)?,
        other => value_to_text(other),
    };
    let price = parse_price_text(&price_text)?;

    let url_suffix = item
        .get("url")
        .or_else(|| item.get("action"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let url = if url_suffix.is_empty() {
        String::new()
    } else {
        format!("https://www.ozon.ru{}", url_suffix)
    };

    let image_url = item
        .get("image")
        .or_else(|| item.get("tileImage"))
        .or_else(|| item.get("primaryImage"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| extract_image_from_media(item))
        .unwrap_or_default();

    let rating = item
        .get("rating")
        .or_else(|| item.get("mark"))
        .and_then(Value::as_f64);

    Some(Offer {
        title,
        price,
        currency: "RUB".to_string(),
        marketplace: Marketplace::Ozon,
        rating,
        url,
        image_url,
        parsed_at: Utc::now(),
    })
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn extract_image_from_media(item: &Value) -> Option<String> {
    let media = item.get("media").or_else(|| item.get("images"))?;
    let first = match media {
        Value::Array(values) => values.first()?,
        other => other,
    };
    first
        .get("url")
        .or_else(|| first.get("src"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl MarketplaceAdapter for OzonAdapter {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Ozon
    }

    async fn search(&self, product_name: &str) -> Result<Vec<Offer>, SourceError> {
        let url = format!(
            "https://www.ozon.ru/search/?text={}",
            product_name.replace(' ', "+")
        );
        let response = self.client.get(&url, &self.default_options()).await?;
        let html = response
            .text()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let mut offers = self.parse_from_state(&html);
        if offers.is_empty() {
            offers = self.composer_api_search(product_name).await;
        }
        if offers.is_empty() {
            offers = self.parse_from_cards(&html);
        }
        if offers.is_empty() {
            warn!("Ozon search for '{}' yielded no offers", product_name);
        }
        offers.truncate(MAX_OFFERS);
        Ok(offers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_state_item_nested_price() {
        let item = json!({
            "title": "Смартфон",
            "price": { "value": "49 990" },
            "url": "/product/123",
            "rating": 4.8
        });
        let offer = map_state_item(&item).unwrap();
        assert_eq!(offer.price, 49990.0);
        assert_eq!(offer.rating, Some(4.8));
        assert_eq!(offer.url, "https://www.ozon.ru/product/123");
    }

    #[test]
    fn test_map_state_item_requires_title() {
        let item = json!({ "price": 100 });
        assert!(map_state_item(&item).is_none());
    }

    #[test]
    fn test_state_strategy_from_embedded_script() {
        let pool = Arc::new(crate::infrastructure::http::ProxyPool::new(None));
        let adapter = OzonAdapter::new(Arc::new(ResilientClient::new(pool, None, 1, 0)));
        let html = r#"<script id="__NEXT_DATA__" type="application/json">
            {"props":{"pageProps":{"fallback":{"w":{"items":[
                {"name":"Товар","price":"1290","url":"/p/1"}
            ]}}}}}</script>"#;
        let offers = adapter.parse_from_state(html);
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].price, 1290.0);
    }
}
