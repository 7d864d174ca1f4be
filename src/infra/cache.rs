//! Time-boxed page cache for rendered responses.
//!
//! Entries are keyed by request path and query string and expire a fixed
//! window after they were stored. Expired entries are dropped lazily, on
//! lookup or on the next insert.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use metrics::{counter, gauge};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::infra::telemetry::{
    PAGE_CACHE_CLEAR_TOTAL, PAGE_CACHE_ENTRIES, PAGE_CACHE_HIT_TOTAL, PAGE_CACHE_MISS_TOTAL,
};

/// Monotonic time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut elapsed = self
            .elapsed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *elapsed += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let elapsed = self
            .elapsed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.origin + *elapsed
    }
}

#[derive(Clone)]
struct Entry {
    response: CachedResponse,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct PageCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl PageCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            clock,
        }
    }

    pub fn with_system_clock(ttl: Duration) -> Self {
        Self::new(ttl, Arc::new(SystemClock))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &str) -> Option<Response<Body>> {
        let now = self.clock.now();
        {
            let guard = self.entries.read().await;
            match guard.get(key) {
                Some(entry) if entry.expires_at > now => {
                    counter!(PAGE_CACHE_HIT_TOTAL).increment(1);
                    return Some(entry.response.clone().into_response());
                }
                Some(_) => {}
                None => {
                    counter!(PAGE_CACHE_MISS_TOTAL).increment(1);
                    return None;
                }
            }
        }

        let mut guard = self.entries.write().await;
        if guard
            .get(key)
            .is_some_and(|entry| entry.expires_at <= self.clock.now())
        {
            guard.remove(key);
        }
        gauge!(PAGE_CACHE_ENTRIES).set(guard.len() as f64);
        counter!(PAGE_CACHE_MISS_TOTAL).increment(1);
        None
    }

    pub async fn put(&self, key: String, response: CachedResponse) {
        let now = self.clock.now();
        let mut guard = self.entries.write().await;
        guard.retain(|_, entry| entry.expires_at > now);
        guard.insert(
            key,
            Entry {
                response,
                expires_at: now + self.ttl,
            },
        );
        gauge!(PAGE_CACHE_ENTRIES).set(guard.len() as f64);
    }

    pub async fn store_response(
        &self,
        key: &str,
        response: Response,
    ) -> Result<Response, (Response, CacheStoreError)> {
        match buffer_response(response).await {
            Ok((rebuilt, cached)) => {
                self.put(key.to_string(), cached).await;
                Ok(rebuilt)
            }
            Err((rebuilt, error)) => Err((rebuilt, error)),
        }
    }

    /// Drop every entry regardless of age.
    pub async fn clear(&self) {
        let mut guard = self.entries.write().await;
        guard.clear();
        counter!(PAGE_CACHE_CLEAR_TOTAL).increment(1);
        gauge!(PAGE_CACHE_ENTRIES).set(0.0);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[derive(Clone)]
pub struct CachedResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        let stored_headers = headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            status,
            headers: stored_headers,
            body,
        }
    }

    fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        headers.clear();
        for (name, value) in self.headers {
            headers.append(name, value);
        }

        response
    }
}

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("failed to buffer response body: {0}")]
    Buffer(String),
}

/// Only plain 200 responses that set no cookies are shared between requests.
pub fn should_store_response(response: &Response) -> bool {
    response.status() == StatusCode::OK && !response.headers().contains_key(header::SET_COOKIE)
}

pub async fn buffer_response(
    response: Response,
) -> Result<(Response, CachedResponse), (Response, CacheStoreError)> {
    let (parts, body) = response.into_parts();
    match BodyExt::collect(body).await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            let cached = CachedResponse::new(parts.status, &parts.headers, bytes.clone());
            let rebuilt = Response::from_parts(parts, Body::from(bytes));
            Ok((rebuilt, cached))
        }
        Err(error) => {
            let rebuilt = Response::from_parts(parts, Body::empty());
            Err((rebuilt, CacheStoreError::Buffer(error.to_string())))
        }
    }
}
