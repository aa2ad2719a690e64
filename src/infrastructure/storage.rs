//! Storage seams for the records the core reads and writes.
//!
//! Real persistence is owned by the surrounding application; the core only
//! depends on these traits. The in-memory implementations back the binary
//! and keep the domain tests hermetic.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::shared::types::{CurrencyRate, Offer, PricePoint, SaleEvent, TrackedQuery};

/// Persisted currency rates. Read and written by the core.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Most recently updated record for the code, if any.
    async fn latest(&self, code: &str) -> Option<CurrencyRate>;
    async fn upsert(&self, rate: CurrencyRate);
}

/// Persisted sale events. Read-only from the core's perspective.
#[async_trait]
pub trait SaleEventStore: Send + Sync {
    async fn all(&self) -> Vec<SaleEvent>;
}

/// Append-only price history per tracked query. The core never deletes
/// history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, query_id: Uuid, point: PricePoint);
    /// Points in ascending collected_at order.
    async fn for_query(&self, query_id: Uuid) -> Vec<PricePoint>;
}

/// Tracked queries and their current offers.
#[async_trait]
pub trait QueryStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Option<TrackedQuery>;
    async fn save(&self, query: TrackedQuery);
    async fn offers(&self, query_id: Uuid) -> Vec<Offer>;
    /// Purge the query's offers and repopulate with a fresh snapshot.
    async fn replace_offers(&self, query_id: Uuid, offers: Vec<Offer>);
}

#[derive(Default)]
pub struct InMemoryRateStore {
    rates: RwLock<HashMap<String, CurrencyRate>>,
}

#[async_trait]
impl RateStore for InMemoryRateStore {
    async fn latest(&self, code: &str) -> Option<CurrencyRate> {
        self.rates.read().ok()?.get(code).cloned()
    }

    async fn upsert(&self, rate: CurrencyRate) {
        if let Ok(mut rates) = self.rates.write() {
            rates.insert(rate.code.clone(), rate);
        }
    }
}

#[derive(Default)]
pub struct InMemorySaleEventStore {
    events: RwLock<Vec<SaleEvent>>,
}

impl InMemorySaleEventStore {
    pub fn with_events(events: Vec<SaleEvent>) -> Self {
        Self {
            events: RwLock::new(events),
        }
    }
}

#[async_trait]
impl SaleEventStore for InMemorySaleEventStore {
    async fn all(&self) -> Vec<SaleEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }
}

#[derive(Default)]
pub struct InMemoryHistoryStore {
    points: RwLock<HashMap<Uuid, Vec<PricePoint>>>,
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, query_id: Uuid, point: PricePoint) {
        if let Ok(mut points) = self.points.write() {
            let series = points.entry(query_id).or_default();
            series.push(point);
            series.sort_by_key(|p| p.collected_at);
        }
    }

    async fn for_query(&self, query_id: Uuid) -> Vec<PricePoint> {
        self.points
            .read()
            .ok()
            .and_then(|points| points.get(&query_id).cloned())
            .unwrap_or_default()
    }
}

#[derive(Default)]
pub struct InMemoryQueryStore {
    queries: RwLock<HashMap<Uuid, TrackedQuery>>,
    offers: RwLock<HashMap<Uuid, Vec<Offer>>>,
}

#[async_trait]
impl QueryStore for InMemoryQueryStore {
    async fn find_by_name(&self, name: &str) -> Option<TrackedQuery> {
        self.queries
            .read()
            .ok()?
            .values()
            .find(|q| q.name == name)
            .cloned()
    }

    async fn save(&self, query: TrackedQuery) {
        if let Ok(mut queries) = self.queries.write() {
            queries.insert(query.id, query);
        }
    }

    async fn offers(&self, query_id: Uuid) -> Vec<Offer> {
        self.offers
            .read()
            .ok()
            .and_then(|offers| offers.get(&query_id).cloned())
            .unwrap_or_default()
    }

    async fn replace_offers(&self, query_id: Uuid, offers: Vec<Offer>) {
        if let Ok(mut map) = self.offers.write() {
            map.insert(query_id, offers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::Marketplace;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_history_keeps_ascending_order() {
        let store = InMemoryHistoryStore::default();
        let id = Uuid::new_v4();
        let now = Utc::now();
        let point = |offset: i64, price: f64| PricePoint {
            price,
            currency: "RUB".to_string(),
            marketplace: Marketplace::Ozon,
            collected_at: now + Duration::seconds(offset),
        };
        store.append(id, point(10, 105.0)).await;
        store.append(id, point(0, 100.0)).await;
        let series = store.for_query(id).await;
        assert_eq!(series[0].price, 100.0);
        assert_eq!(series[1].price, 105.0);
    }

    #[tokio::test]
    async fn test_rate_store_upsert_replaces() {
        let store = InMemoryRateStore::default();
        let rate = |value: f64| CurrencyRate {
            code: "USD".to_string(),
            rate: value,
            updated_at: Utc::now(),
        };
        store.upsert(rate(90.0)).await;
        store.upsert(rate(92.5)).await;
        assert_eq!(store.latest("USD").await.unwrap().rate, 92.5);
    }
}
