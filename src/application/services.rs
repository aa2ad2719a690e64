//! Application services: offer aggregation and forecast orchestration.

use std::sync::Arc;

use chrono::{Datelike, Duration, Utc};
use futures::future::join_all;
use tracing::{info, warn};

use crate::domain::forecast::Forecaster;
use crate::domain::seasonal::SeasonalCalendar;
use crate::infrastructure::currency::CurrencyNormalizer;
use crate::infrastructure::marketplaces::{AdapterSource, MarketplaceAdapter};
use crate::infrastructure::storage::{HistoryStore, QueryStore, SaleEventStore};
use crate::shared::errors::ForecastError;
use crate::shared::types::{
    ForecastOutcome, Marketplace, Offer, PricePoint, PurchaseTiming, TrackedQuery,
};

/// Aggregates marketplace offers and maintains the tracked-query lifecycle.
pub struct OfferService {
    factory: Arc<dyn AdapterSource>,
    query_store: Arc<dyn QueryStore>,
    history_store: Arc<dyn HistoryStore>,
    reuse_window: Duration,
}

impl OfferService {
    pub fn new(
        factory: Arc<dyn AdapterSource>,
        query_store: Arc<dyn QueryStore>,
        history_store: Arc<dyn HistoryStore>,
        reuse_window_secs: i64,
    ) -> Self {
        Self {
            factory,
            query_store,
            history_store,
            reuse_window: Duration::seconds(reuse_window_secs),
        }
    }

    /// Run all requested adapters concurrently and aggregate their offers.
    /// Never raises to the caller: an adapter error becomes an empty
    /// contribution and is logged, so one marketplace's outage cannot block
    /// or corrupt the others.
    pub async fn fetch_offers(
        &self,
        product_name: &str,
        marketplaces: &[Marketplace],
    ) -> Vec<Offer> {
        let adapters: Vec<Box<dyn MarketplaceAdapter>> = marketplaces
            .iter()
            .map(|mp| self.factory.create_adapter(*mp))
            .collect();
        aggregate_adapters(&adapters, product_name).await
    }

    /// Tracked-query lifecycle: a recent-enough non-forced result is reused;
    /// otherwise the query's offers are purged and repopulated, and a
    /// history point is appended per fresh offer (in collected currency).
    pub async fn search(
        &self,
        product_name: &str,
        category: &str,
        marketplaces: &[Marketplace],
        force: bool,
    ) -> (TrackedQuery, Vec<Offer>) {
        let existing = self.query_store.find_by_name(product_name).await;
        if let Some(query) = &existing {
            if !force {
                if let Some(fetched_at) = query.last_fetched_at {
                    if Utc::now() - fetched_at <= self.reuse_window {
                        let offers = self.query_store.offers(query.id).await;
                        if !offers.is_empty() {
                            info!("Reusing offers for '{}' fetched at {}", product_name, fetched_at);
                            return (query.clone(), offers);
                        }
                    }
                }
            }
        }

        let mut query = existing
            .unwrap_or_else(|| TrackedQuery::new(product_name, category, marketplaces.to_vec()));
        let offers = self.fetch_offers(product_name, marketplaces).await;

        self.query_store.replace_offers(query.id, offers.clone()).await;
        for offer in &offers {
            self.history_store
                .append(
                    query.id,
                    PricePoint {
                        price: offer.price,
                        currency: offer.currency.clone(),
                        marketplace: offer.marketplace,
                        collected_at: offer.parsed_at,
                    },
                )
                .await;
        }
        query.last_fetched_at = Some(Utc::now());
        self.query_store.save(query.clone()).await;
        (query, offers)
    }
}

/// Failure-isolated aggregation over an adapter set. Split out so tests can
/// drive it with stub adapters.
pub async fn aggregate_adapters(
    adapters: &[Box<dyn MarketplaceAdapter>],
    product_name: &str,
) -> Vec<Offer> {
    let searches = adapters.iter().map(|adapter| async move {
        match adapter.search(product_name).await {
            Ok(offers) => offers,
            Err(e) => {
                warn!("{} adapter failed: {}", adapter.marketplace(), e);
                Vec::new()
            }
        }
    });
    join_all(searches).await.into_iter().flatten().collect()
}

/// Deterministic demo offers for when every real adapter is blocked.
pub fn generate_demo_offers(product_name: &str) -> Vec<Offer> {
    let base = 50.0 + (product_name.bytes().map(u64::from).sum::<u64>() % 300) as f64;
    let now = Utc::now();
    let demo = |marketplace: Marketplace, price: f64, currency: &str, rating: f64| Offer {
        title: format!("{} — {} demo", product_name, marketplace),
        price: (price * 100.0).round() / 100.0,
        currency: currency.to_string(),
        marketplace,
        rating: Some(rating),
        url: String::new(),
        image_url: String::new(),
        parsed_at: now,
    };
    vec![
        demo(Marketplace::Amazon, base * 1.05, "USD", 4.6),
        demo(Marketplace::Wildberries, base * 92.0, "RUB", 4.3),
        demo(Marketplace::Ozon, base * 95.0, "RUB", 4.5),
    ]
}

/// Normalizes history to the base currency and runs the forecaster.
pub struct ForecastService {
    normalizer: Arc<CurrencyNormalizer>,
    forecaster: Forecaster,
    events: Arc<dyn SaleEventStore>,
    seasonal: SeasonalCalendar,
}

impl ForecastService {
    pub fn new(
        normalizer: Arc<CurrencyNormalizer>,
        forecaster: Forecaster,
        events: Arc<dyn SaleEventStore>,
    ) -> Self {
        Self {
            normalizer,
            forecaster,
            events,
            seasonal: SeasonalCalendar::new(),
        }
    }

    /// Forecast over a chronologically ordered history. Suppression is an
    /// outcome; only malformed input is an error.
    pub async fn predict(
        &self,
        history: &[PricePoint],
        category: &str,
        marketplace: Marketplace,
    ) -> Result<ForecastOutcome, ForecastError> {
        let mut normalized = Vec::with_capacity(history.len());
        for point in history {
            let price = self
                .normalizer
                .normalize(point.price, &point.currency)
                .await
                .map_err(|e| ForecastError::InvalidInput(e.to_string()))?;
            normalized.push(price);
        }
        // The most recent observation decides the one-hot marketplace.
        let marketplace = history.last().map(|p| p.marketplace).unwrap_or(marketplace);
        let events = self.events.all().await;
        self.forecaster
            .predict(&normalized, category, marketplace, &events)
    }

    pub fn purchase_timing(&self, category: &str) -> PurchaseTiming {
        self.seasonal.predict_best_purchase_time_now(category)
    }

    /// Expected category discount for the current month.
    pub fn seasonal_discount(&self, category: &str) -> f64 {
        self.seasonal
            .category_discount(category, Utc::now().month())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use crate::infrastructure::storage::{
        InMemoryHistoryStore, InMemoryQueryStore, InMemoryRateStore, InMemorySaleEventStore,
    };
    use crate::shared::errors::{FetchError, SourceError};
    use crate::shared::types::SuppressReason;

    struct StubAdapter {
        marketplace: Marketplace,
        offers: usize,
        fail: bool,
    }

    #[async_trait]
    impl MarketplaceAdapter for StubAdapter {
        fn marketplace(&self) -> Marketplace {
            self.marketplace
        }

        async fn search(&self, product_name: &str) -> Result<Vec<Offer>, SourceError> {
            if self.fail {
                return Err(SourceError::Fetch(FetchError::NetworkFailure(
                    "blocked".to_string(),
                )));
            }
            Ok((0..self.offers)
                .map(|i| Offer {
                    title: format!("{} #{}", product_name, i),
                    price: 100.0 + i as f64,
                    currency: "RUB".to_string(),
                    marketplace: self.marketplace,
                    rating: None,
                    url: String::new(),
                    image_url: String::new(),
                    parsed_at: Utc::now(),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_adapter_failure_is_isolated() {
        let adapters: Vec<Box<dyn MarketplaceAdapter>> = vec![
            Box::new(StubAdapter {
                marketplace: Marketplace::Amazon,
                offers: 3,
                fail: false,
            }),
            Box::new(StubAdapter {
                marketplace: Marketplace::Wildberries,
                offers: 0,
                fail: true,
            }),
            Box::new(StubAdapter {
                marketplace: Marketplace::Ozon,
                offers: 2,
                fail: false,
            }),
        ];
        let offers = aggregate_adapters(&adapters, "laptop").await;
        assert_eq!(offers.len(), 5); // only the succeeding adapters contribute
        assert!(offers.iter().all(|o| o.marketplace != Marketplace::Wildberries));
    }

    /// Adapter source that counts how many searches actually hit a source.
    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    impl AdapterSource for CountingSource {
        fn create_adapter(&self, marketplace: Marketplace) -> Box<dyn MarketplaceAdapter> {
            Box::new(CountingAdapter {
                marketplace,
                calls: Arc::clone(&self.calls),
            })
        }
    }

    struct CountingAdapter {
        marketplace: Marketplace,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MarketplaceAdapter for CountingAdapter {
        fn marketplace(&self) -> Marketplace {
            self.marketplace
        }

        async fn search(&self, product_name: &str) -> Result<Vec<Offer>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![offer(&format!("{} fresh", product_name), 200.0)])
        }
    }

    fn offer(title: &str, price: f64) -> Offer {
        Offer {
            title: title.to_string(),
            price,
            currency: "RUB".to_string(),
            marketplace: Marketplace::Ozon,
            rating: None,
            url: String::new(),
            image_url: String::new(),
            parsed_at: Utc::now(),
        }
    }

    fn lifecycle_fixture() -> (
        OfferService,
        Arc<InMemoryQueryStore>,
        Arc<InMemoryHistoryStore>,
        Arc<AtomicUsize>,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let query_store = Arc::new(InMemoryQueryStore::default());
        let history_store = Arc::new(InMemoryHistoryStore::default());
        let service = OfferService::new(
            Arc::new(CountingSource {
                calls: Arc::clone(&calls),
            }),
            Arc::clone(&query_store) as Arc<dyn QueryStore>,
            Arc::clone(&history_store) as Arc<dyn HistoryStore>,
            3600,
        );
        (service, query_store, history_store, calls)
    }

    #[tokio::test]
    async fn test_search_reuses_recent_result_without_fetching() {
        let (service, query_store, history_store, calls) = lifecycle_fixture();
        let mut seeded = TrackedQuery::new("phone", "electronics", vec![Marketplace::Ozon]);
        seeded.last_fetched_at = Some(Utc::now());
        let stored = offer("phone stored", 150.0);
        query_store.replace_offers(seeded.id, vec![stored.clone()]).await;
        query_store.save(seeded.clone()).await;

        let (query, offers) = service
            .search("phone", "electronics", &[Marketplace::Ozon], false)
            .await;

        assert_eq!(query.id, seeded.id);
        assert_eq!(offers, vec![stored]);
        assert_eq!(calls.load(Ordering::SeqCst), 0); // no adapter was invoked
        assert!(history_store.for_query(seeded.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_forced_replaces_offers_and_appends_history() {
        let (service, query_store, history_store, calls) = lifecycle_fixture();
        let mut seeded = TrackedQuery::new("phone", "electronics", vec![Marketplace::Ozon]);
        seeded.last_fetched_at = Some(Utc::now());
        query_store
            .replace_offers(seeded.id, vec![offer("phone stored", 150.0)])
            .await;
        query_store.save(seeded.clone()).await;

        let (query, offers) = service
            .search("phone", "electronics", &[Marketplace::Ozon], true)
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].price, 200.0);
        assert_eq!(query_store.offers(query.id).await, offers); // old snapshot purged
        let history = history_store.for_query(query.id).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].price, 200.0);
        let saved = query_store.find_by_name("phone").await.unwrap();
        assert!(saved.last_fetched_at.unwrap() >= seeded.last_fetched_at.unwrap());
    }

    #[tokio::test]
    async fn test_search_stale_result_refetches() {
        let (service, query_store, _history_store, calls) = lifecycle_fixture();
        let mut seeded = TrackedQuery::new("phone", "electronics", vec![Marketplace::Ozon]);
        seeded.last_fetched_at = Some(Utc::now() - Duration::seconds(7200));
        query_store
            .replace_offers(seeded.id, vec![offer("phone stored", 150.0)])
            .await;
        query_store.save(seeded).await;

        let (_, offers) = service
            .search("phone", "electronics", &[Marketplace::Ozon], false)
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1); // outside the reuse window
        assert_eq!(offers[0].price, 200.0);
    }

    #[tokio::test]
    async fn test_demo_offers_deterministic() {
        let a = generate_demo_offers("laptop");
        let b = generate_demo_offers("laptop");
        assert_eq!(a[0].price, b[0].price);
        assert_eq!(a.len(), 3);
    }

    fn forecast_service() -> ForecastService {
        let normalizer = Arc::new(CurrencyNormalizer::new(
            "RUB",
            Arc::new(InMemoryRateStore::default()),
            1,
        ));
        ForecastService::new(
            normalizer,
            Forecaster::new("RUB", None),
            Arc::new(InMemorySaleEventStore::default()),
        )
    }

    fn point(price: f64, offset_secs: i64) -> PricePoint {
        PricePoint {
            price,
            currency: "RUB".to_string(),
            marketplace: Marketplace::Ozon,
            collected_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn test_predict_short_history_suppressed() {
        let service = forecast_service();
        let history = vec![point(100.0, 0), point(110.0, 10)];
        let outcome = service
            .predict(&history, "books", Marketplace::Ozon)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ForecastOutcome::NoForecast(SuppressReason::InsufficientData)
        );
    }

    #[tokio::test]
    async fn test_predict_base_currency_history() {
        let service = forecast_service();
        let history = vec![point(100.0, 0), point(105.0, 10), point(110.0, 20)];
        let outcome = service
            .predict(&history, "books", Marketplace::Ozon)
            .await
            .unwrap();
        let result = outcome.forecast().expect("accepted");
        assert_eq!(result.current_price, 110.0);
        assert_eq!(result.base_currency, "RUB");
    }

    #[tokio::test]
    async fn test_predict_negative_price_is_error() {
        let service = forecast_service();
        let history = vec![point(100.0, 0), point(-5.0, 10), point(110.0, 20)];
        assert!(service
            .predict(&history, "books", Marketplace::Ozon)
            .await
            .is_err());
    }
}
