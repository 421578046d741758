use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Telegram init data is forwarded on every request for backend auth.
pub const INIT_DATA_HEADER: &str = "X-Telegram-Init-Data";

pub const REGISTER_ENDPOINT: &str = "/user/user";
pub const CURRENT_USER_ENDPOINT: &str = "/user/user/me";

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);
const CURRENT_USER_CACHE_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status, when the server answered at all.
    pub status: Option<u16>,
    /// User-facing message: the server's own comment when present, else a
    /// status-code default.
    pub message: String,
    /// Raw parsed error body for callers that inspect it.
    pub body: Option<Value>,
}

impl ApiError {
    fn transport(err: impl std::fmt::Display) -> Self {
        Self {
            status: None,
            message: format!("Network error: {}", err),
            body: None,
        }
    }
}

fn default_message(status: u16) -> String {
    match status {
        400 => "Invalid request data",
        401 => "Authorization required",
        403 => "Access denied",
        404 => "Not found",
        429 => "Too many requests, try again later",
        500 => "Server error",
        503 => "Service temporarily unavailable",
        _ => return format!("Request failed with status {}", status),
    }
    .to_string()
}

fn server_comment(body: &Value) -> Option<String> {
    for field in ["comment", "message", "error"] {
        if let Some(text) = body.get(field).and_then(|v| v.as_str()) {
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}

type SharedRequest = Shared<BoxFuture<'static, Result<Value, ApiError>>>;

/// In-flight entry, tagged so a request evicts only itself on completion.
/// `clear_cache` can drop an entry while its request still runs; without
/// the tag, that old request would evict whichever newer entry took over
/// the key.
struct InflightEntry {
    token: u64,
    request: SharedRequest,
}

pub type ReferrerProvider = Arc<dyn Fn() -> Option<i64> + Send + Sync>;

struct CacheEntry {
    data: Value,
    expires_at: Instant,
}

/// Request layer every other component talks through: de-duplicates
/// concurrent identical requests, caches responses for a short TTL, and
/// translates HTTP failures into [`ApiError`].
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    init_data: String,
    inflight: Arc<Mutex<HashMap<String, InflightEntry>>>,
    inflight_token: Arc<AtomicU64>,
    cache: Arc<Mutex<HashMap<String, CacheEntry>>>,
    referrer: Arc<RwLock<Option<ReferrerProvider>>>,
}

impl ApiClient {
    pub fn new(base_url: String, init_data: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            init_data,
            inflight: Arc::new(Mutex::new(HashMap::new())),
            inflight_token: Arc::new(AtomicU64::new(0)),
            cache: Arc::new(Mutex::new(HashMap::new())),
            referrer: Arc::new(RwLock::new(None)),
        }
    }

    /// Registered by the host-bridge integration; consulted only by the
    /// bare register call. Cleared on teardown.
    pub fn set_referrer_provider(&self, provider: ReferrerProvider) {
        *self.referrer.write().unwrap() = Some(provider);
    }

    pub fn clear_referrer_provider(&self) {
        *self.referrer.write().unwrap() = None;
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(Method::GET, endpoint, None, None).await
    }

    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::transport(format!("invalid request body: {}", e)))?;
        self.request(Method::POST, endpoint, Some(body), None).await
    }

    /// POST with no body; `cacheable` opts the call in or out of the
    /// response cache and the in-flight de-duplication.
    pub async fn post_empty<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        cacheable: Option<bool>,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, endpoint, None, cacheable).await
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        cacheable: Option<bool>,
    ) -> Result<T, ApiError> {
        let value = self.request_value(method, endpoint, body, cacheable).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::transport(format!("unexpected response shape: {}", e)))
    }

    async fn request_value(
        &self,
        method: Method,
        endpoint: &str,
        mut body: Option<Value>,
        cacheable: Option<bool>,
    ) -> Result<Value, ApiError> {
        // A bare register call carries the referral source, when one is known.
        if method == Method::POST && endpoint == REGISTER_ENDPOINT && body.is_none() {
            let provider = self.referrer.read().unwrap().clone();
            if let Some(referrer_id) = provider.and_then(|p| p()) {
                body = Some(serde_json::json!({ "referrer_id": referrer_id }));
            }
        }

        let key = cache_key(&method, endpoint, body.as_ref());
        let dedup = method == Method::GET || (method == Method::POST && cacheable != Some(false));
        let cache_eligible = method == Method::GET || cacheable == Some(true);

        if cache_eligible {
            if let Some(hit) = self.cached(&key) {
                return Ok(hit);
            }
        }

        if !dedup {
            return self
                .execute(method, endpoint.to_string(), body, cache_eligible, key)
                .await;
        }

        // Identical concurrent requests share one network round-trip.
        let request = {
            let mut inflight = self.inflight.lock().unwrap();
            if let Some(existing) = inflight.get(&key) {
                existing.request.clone()
            } else {
                let token = self.inflight_token.fetch_add(1, Ordering::Relaxed);
                let this = self.clone();
                let endpoint = endpoint.to_string();
                let entry_key = key.clone();
                let request: SharedRequest = async move {
                    let result = this
                        .execute(method, endpoint, body, cache_eligible, entry_key.clone())
                        .await;
                    let mut inflight = this.inflight.lock().unwrap();
                    if inflight.get(&entry_key).is_some_and(|e| e.token == token) {
                        inflight.remove(&entry_key);
                    }
                    result
                }
                .boxed()
                .shared();
                inflight.insert(key, InflightEntry {
                    token,
                    request: request.clone(),
                });
                request
            }
        };
        request.await
    }

    async fn execute(
        &self,
        method: Method,
        endpoint: String,
        body: Option<Value>,
        cache_eligible: bool,
        key: String,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(INIT_DATA_HEADER, &self.init_data);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ApiError::transport)?;
        let status = response.status();
        if !status.is_success() {
            let parsed: Option<Value> = response.json().await.ok();
            let message = parsed
                .as_ref()
                .and_then(server_comment)
                .unwrap_or_else(|| default_message(status.as_u16()));
            return Err(ApiError {
                status: Some(status.as_u16()),
                message,
                body: parsed,
            });
        }

        let data: Value = response.json().await.map_err(ApiError::transport)?;

        if cache_eligible {
            let ttl = if endpoint.contains(CURRENT_USER_ENDPOINT) {
                CURRENT_USER_CACHE_TTL
            } else {
                DEFAULT_CACHE_TTL
            };
            self.cache.lock().unwrap().insert(
                key,
                CacheEntry {
                    data: data.clone(),
                    expires_at: Instant::now() + ttl,
                },
            );
        } else if method != Method::GET {
            // A mutation may touch anything this app caches; the cache has
            // no tags, so drop all of it.
            self.cache.lock().unwrap().clear();
        }

        Ok(data)
    }

    fn cached(&self, key: &str) -> Option<Value> {
        let mut cache = self.cache.lock().unwrap();
        match cache.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.data.clone()),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    /// Drops matching entries from both the response cache and the
    /// in-flight map, or everything when no filter is given.
    pub fn clear_cache(&self, filter: Option<&str>) {
        let mut cache = self.cache.lock().unwrap();
        let mut inflight = self.inflight.lock().unwrap();
        match filter {
            Some(substring) => {
                cache.retain(|key, _| !key.contains(substring));
                inflight.retain(|key, _| !key.contains(substring));
            }
            None => {
                cache.clear();
                inflight.clear();
            }
        }
    }
}

fn cache_key(method: &Method, endpoint: &str, body: Option<&Value>) -> String {
    match body {
        Some(body) => format!("{}:{}:{}", method, endpoint, body),
        None => format!("{}:{}:null", method, endpoint),
    }
}
