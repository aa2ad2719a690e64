use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response};
use tracing::{debug, warn};

use super::proxy_pool::ProxyPool;
use crate::shared::errors::FetchError;

/// Per-request options passed by source adapters.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub json_body: Option<serde_json::Value>,
}

impl RequestOptions {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.json_body = Some(body);
        self
    }
}

/// Bounded-retry HTTP execution with proxy rotation.
///
/// Fallback chain: one direct attempt (optionally through the static proxy),
/// then up to `proxy_attempts` attempts through rotating pool endpoints, then
/// one final direct attempt whose error propagates to the caller. Worst-case
/// latency is therefore timeout x (1 + proxy_attempts + 1), and the caller
/// always gets either a successful response or a concrete error.
pub struct ResilientClient {
    proxy_pool: Arc<ProxyPool>,
    static_proxy: Option<String>,
    timeout: Duration,
    proxy_attempts: usize,
}

impl ResilientClient {
    pub fn new(
        proxy_pool: Arc<ProxyPool>,
        static_proxy: Option<String>,
        timeout_secs: u64,
        proxy_attempts: usize,
    ) -> Self {
        Self {
            proxy_pool,
            static_proxy,
            timeout: Duration::from_secs(timeout_secs),
            proxy_attempts,
        }
    }

    pub async fn get(&self, url: &str, options: &RequestOptions) -> Result<Response, FetchError> {
        self.execute(Method::GET, url, options).await
    }

    pub async fn post(&self, url: &str, options: &RequestOptions) -> Result<Response, FetchError> {
        self.execute(Method::POST, url, options).await
    }

    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<Response, FetchError> {
        // 1. Direct attempt, through the static proxy when one is configured.
        match self
            .attempt(method.clone(), url, options, self.static_proxy.as_deref())
            .await
        {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) => debug!("Direct attempt to {} returned {}", url, resp.status()),
            Err(e) => debug!("Direct attempt to {} failed: {}", url, e),
        }

        // 2. Rotate through pool proxies, stop at first success.
        for _ in 0..self.proxy_attempts {
            let Some(proxy) = self.proxy_pool.get_proxy().await else {
                break;
            };
            match self
                .attempt(method.clone(), url, options, Some(&proxy))
                .await
            {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(_) => continue,
                Err(e) => {
                    debug!("Proxy {} attempt failed: {}", proxy, e);
                    continue;
                }
            }
        }

        // 3. Final unprotected attempt; its error is the one the caller sees.
        let resp = self
            .attempt(method, url, options, None)
            .await
            .map_err(|e| {
                warn!("Request to {} exhausted all fallbacks: {}", url, e);
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::NetworkFailure(e.to_string())
                }
            })?;
        if !resp.status().is_success() {
            return Err(FetchError::BadStatus(resp.status().as_u16()));
        }
        Ok(resp)
    }

    async fn attempt(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
        proxy: Option<&str>,
    ) -> Result<Response, reqwest::Error> {
        let mut builder = Client::builder().timeout(self.timeout);
        if let Some(proxy_url) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        let client = builder.build()?;

        let mut request = client.request(method, url);
        for (name, value) in &options.headers {
            request = request.header(name, value);
        }
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.json_body {
            request = request.json(body);
        }
        request.send().await
    }
}
