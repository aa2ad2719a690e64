use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;

use pricewatch::application::services::generate_demo_offers;
use pricewatch::application::{ForecastService, OfferService};
use pricewatch::domain::forecast::{BoostedRefiner, Forecaster};
use pricewatch::infrastructure::currency::CurrencyNormalizer;
use pricewatch::infrastructure::http::{ProxyPool, ResilientClient};
use pricewatch::infrastructure::marketplaces::AdapterFactory;
use pricewatch::infrastructure::storage::{
    HistoryStore, InMemoryHistoryStore, InMemoryQueryStore, InMemoryRateStore,
    InMemorySaleEventStore,
};
use pricewatch::shared::config::ConfigLoader;
use pricewatch::shared::types::{ForecastOutcome, Marketplace, MARKETPLACES};

#[derive(Parser, Debug)]
#[command(version, about = "Marketplace price tracker with short-horizon purchase forecasts")]
struct Args {
    /// Product name to search and forecast
    product: Option<String>,

    /// Marketplaces to query (comma-separated)
    #[arg(long, default_value = "amazon,wildberries,ozon")]
    marketplaces: String,

    /// Product category for seasonal analysis
    #[arg(long, default_value = "electronics")]
    category: String,

    /// Path to config file (optional)
    #[arg(long)]
    config: Option<String>,

    /// Static proxy endpoint (overrides config)
    #[arg(long)]
    proxy_url: Option<String>,

    /// Per-request timeout in seconds (overrides config)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Force a refresh even when a recent result exists
    #[arg(long)]
    force: bool,

    /// Fall back to deterministic demo offers when all sources are blocked
    #[arg(long)]
    demo: bool,

    /// Refresh persisted currency rates (comma-separated codes) and exit
    #[arg(long)]
    refresh_rates: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_config(path).map_err(|e| anyhow!(e.to_string()))?,
        None => ConfigLoader::load_default(),
    };
    if args.proxy_url.is_some() {
        config.proxy_url = args.proxy_url.clone();
    }
    if let Some(timeout) = args.timeout_secs {
        config.request_timeout_secs = timeout;
    }

    let rate_store = Arc::new(InMemoryRateStore::default());
    let normalizer = Arc::new(CurrencyNormalizer::new(
        &config.base_currency,
        rate_store,
        config.rate_timeout_secs,
    ));

    if let Some(codes) = &args.refresh_rates {
        let codes: Vec<&str> = codes.split(',').map(str::trim).collect();
        println!("🔄 Refreshing currency rates: {}", codes.join(", "));
        normalizer.refresh(&codes).await;
        return Ok(());
    }

    let product = args
        .product
        .clone()
        .ok_or_else(|| anyhow!("product name is required"))?;
    let marketplaces = parse_marketplaces(&args.marketplaces)?;

    let proxy_pool = Arc::new(ProxyPool::new(config.proxy_url.clone()));
    let client = Arc::new(ResilientClient::new(
        proxy_pool,
        config.proxy_url.clone(),
        config.request_timeout_secs,
        config.proxy_attempts,
    ));

    let query_store = Arc::new(InMemoryQueryStore::default());
    let history_store = Arc::new(InMemoryHistoryStore::default());
    let event_store = Arc::new(InMemorySaleEventStore::default());

    let offer_service = OfferService::new(
        Arc::new(AdapterFactory::new(client)),
        query_store,
        Arc::clone(&history_store) as Arc<dyn HistoryStore>,
        config.reuse_window_secs,
    );
    let forecast_service = ForecastService::new(
        Arc::clone(&normalizer),
        Forecaster::new(
            &config.base_currency,
            Some(Arc::new(BoostedRefiner::default())),
        ),
        event_store,
    );

    run(
        &args, &product, &marketplaces, &offer_service, &forecast_service, &history_store,
    )
    .await
}

async fn run(
    args: &Args,
    product: &str,
    marketplaces: &[Marketplace],
    offer_service: &OfferService,
    forecast_service: &ForecastService,
    history_store: &Arc<InMemoryHistoryStore>,
) -> Result<()> {
    println!("🔍 Searching '{}' on {} marketplace(s)...", product, marketplaces.len());
    let (query, mut offers) = offer_service
        .search(product, &args.category, marketplaces, args.force)
        .await;

    if offers.is_empty() && args.demo {
        println!("⚠️  All sources blocked, using demo offers");
        offers = generate_demo_offers(product);
    }
    if offers.is_empty() {
        println!("❌ No offers found for '{}'", product);
        return Ok(());
    }

    println!("📦 {} offer(s):", offers.len());
    for offer in &offers {
        let rating = offer
            .rating
            .map(|r| format!(" ★{:.1}", r))
            .unwrap_or_default();
        println!(
            "   [{}] {} — {:.2} {}{}",
            offer.marketplace, offer.title, offer.price, offer.currency, rating
        );
    }

    let history = history_store.for_query(query.id).await;
    let marketplace = offers.last().map(|o| o.marketplace).unwrap_or(Marketplace::Ozon);
    match forecast_service
        .predict(&history, &args.category, marketplace)
        .await?
    {
        ForecastOutcome::Forecast(forecast) => {
            println!(
                "📈 Forecast (~30 days): {:.2} {} (now {:.2}, confidence {:.2})",
                forecast.forecast_price,
                forecast.base_currency,
                forecast.current_price,
                forecast.confidence
            );
            println!(
                "   trend {:+.2}, volatility {:.3}, {} point(s), sale discount {}%",
                forecast.trend, forecast.volatility, forecast.points, forecast.sale_discount
            );
        }
        ForecastOutcome::NoForecast(reason) => {
            println!("🤐 No forecast: {}", reason);
        }
    }

    let timing = forecast_service.purchase_timing(&args.category);
    println!(
        "🗓️  Best month to buy: {} (≈{}% off). {}",
        timing.best_month, timing.expected_discount, timing.recommendation
    );
    println!(
        "   Expected '{}' discount this month: {}%",
        args.category,
        forecast_service.seasonal_discount(&args.category)
    );
    Ok(())
}

fn parse_marketplaces(raw: &str) -> Result<Vec<Marketplace>> {
    let mut result = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let marketplace = Marketplace::parse(part)
            .ok_or_else(|| anyhow!("unknown marketplace: {}", part))?;
        if !result.contains(&marketplace) {
            result.push(marketplace);
        }
    }
    if result.is_empty() {
        result = MARKETPLACES.to_vec();
    }
    Ok(result)
}
