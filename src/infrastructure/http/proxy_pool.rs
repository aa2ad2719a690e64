use std::sync::Mutex;
use std::time::Duration;

use rand::seq::SliceRandom;
use tracing::warn;

const PROXY_LIST_URL: &str = "https://api.proxyscrape.com/v2/?request=displayproxies&protocol=http&timeout=2000&country=all&ssl=all&anonymity=all";
const POOL_CAP: usize = 30;

/// Very lightweight free-proxy pool. Pulls HTTP proxies from proxyscrape;
/// reliability is low, use only when no static proxy is configured.
///
/// Shared process-wide state with relaxed consistency: each endpoint is
/// independently valid, so concurrent refreshes race harmlessly.
pub struct ProxyPool {
    static_proxy: Option<String>,
    pool: Mutex<Vec<String>>,
    refresh_timeout: Duration,
}

impl ProxyPool {
    pub fn new(static_proxy: Option<String>) -> Self {
        Self {
            static_proxy,
            pool: Mutex::new(Vec::new()),
            refresh_timeout: Duration::from_secs(8),
        }
    }

    /// One proxy endpoint, or None when the pool cannot be filled.
    /// A configured static proxy always wins.
    pub async fn get_proxy(&self) -> Option<String> {
        if let Some(url) = &self.static_proxy {
            return Some(url.clone());
        }
        if self.pool.lock().ok()?.is_empty() {
            self.refresh_pool().await;
        }
        let pool = self.pool.lock().ok()?;
        pool.choose(&mut rand::thread_rng()).cloned()
    }

    async fn refresh_pool(&self) {
        let client = match reqwest::Client::builder()
            .timeout(self.refresh_timeout)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                warn!("Proxy pool client build failed: {}", e);
                return;
            }
        };

        match client.get(PROXY_LIST_URL).send().await {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(body) = resp.text().await {
                    let endpoints: Vec<String> = body
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(|line| format!("http://{}", line))
                        .take(POOL_CAP)
                        .collect();
                    if let Ok(mut pool) = self.pool.lock() {
                        *pool = endpoints;
                    }
                }
            }
            Ok(resp) => warn!("Proxy list returned status {}", resp.status()),
            Err(e) => warn!("Proxy pool refresh error: {}", e),
        }
    }

    #[cfg(test)]
    pub fn with_endpoints(endpoints: Vec<String>) -> Self {
        Self {
            static_proxy: None,
            pool: Mutex::new(endpoints),
            refresh_timeout: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_proxy_wins() {
        let pool = ProxyPool::new(Some("http://corp-proxy:3128".to_string()));
        assert_eq!(
            pool.get_proxy().await,
            Some("http://corp-proxy:3128".to_string())
        );
    }

    #[tokio::test]
    async fn test_seeded_pool_draw() {
        let pool = ProxyPool::with_endpoints(vec!["http://1.2.3.4:80".to_string()]);
        assert_eq!(pool.get_proxy().await, Some("http://1.2.3.4:80".to_string()));
    }
}
