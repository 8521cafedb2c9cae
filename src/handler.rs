use crate::cache::{CacheStore, CanonicalKey, KeyCanonicalizer};
use crate::error::{GatewayError, UpstreamError};
use crate::inference::InferenceGateway;
use crate::model::{HistoryWindow, Request};
use crate::prompt::PromptBuilder;
use crate::stats::CacheStats;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

type Pending = Arc<OnceCell<Result<String, UpstreamError>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    /// Served from the cache without touching upstream.
    Cache,
    /// This request performed the upstream (or fallback) call.
    Upstream,
    /// Waited on another request's in-flight call for the same key.
    Coalesced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
}

/// Ties cache lookup, prompt assembly and the inference call together.
///
/// Concurrent misses for the same key share a single in-flight call: the
/// first arrival initializes the slot, later ones await it. A successful
/// answer is stored in the cache before any waiter sees it; failures are
/// never cached.
pub struct RequestHandler {
    cache: Arc<CacheStore>,
    gateway: Arc<InferenceGateway>,
    canonicalizer: KeyCanonicalizer,
    prompts: PromptBuilder,
    in_flight: Mutex<HashMap<CanonicalKey, Pending>>,
    pub stats: CacheStats,
}

impl RequestHandler {
    pub fn new(cache: Arc<CacheStore>, gateway: Arc<InferenceGateway>, window: HistoryWindow) -> Self {
        Self {
            cache,
            gateway,
            canonicalizer: KeyCanonicalizer::new(window),
            prompts: PromptBuilder::new(window),
            in_flight: Mutex::new(HashMap::new()),
            stats: CacheStats::default(),
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn gateway(&self) -> &InferenceGateway {
        &self.gateway
    }

    pub fn key_for(&self, request: &Request) -> CanonicalKey {
        self.canonicalizer.canonicalize(request)
    }

    pub async fn handle(
        &self,
        request: Request,
        deadline: Option<Duration>,
    ) -> Result<Answer, GatewayError> {
        if request.message.trim().is_empty() {
            return Err(GatewayError::Validation("message is required".to_string()));
        }

        let key = self.canonicalizer.canonicalize(&request);
        if let Some(text) = self.cache.get(&key) {
            self.stats.record_hit();
            info!(key = %key.short(), "Cache hit");
            return Ok(Answer {
                text,
                source: AnswerSource::Cache,
            });
        }
        self.stats.record_miss();

        let mut joined = true;
        let slot = self
            .in_flight
            .lock()
            .entry(key)
            .or_insert_with(|| {
                joined = false;
                Pending::default()
            })
            .clone();
        if joined {
            debug!(key = %key.short(), "Joining in-flight upstream call");
        }
        // Releases the slot on every exit path, including cancellation.
        let guard = InFlightGuard {
            handler: self,
            key,
            slot,
        };

        let mut initialized_here = false;
        let wait = guard.slot.get_or_init(|| {
            initialized_here = true;
            self.fetch(key, &request)
        });
        let result = match deadline {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| UpstreamError::DeadlineExceeded(limit.as_millis() as u64))
                .and_then(|r| r.clone()),
            None => wait.await.clone(),
        };
        drop(guard);

        let source = if initialized_here {
            AnswerSource::Upstream
        } else {
            self.stats.record_coalesced();
            AnswerSource::Coalesced
        };
        let text = result?;
        Ok(Answer { text, source })
    }

    async fn fetch(&self, key: CanonicalKey, request: &Request) -> Result<String, UpstreamError> {
        info!(key = %key.short(), mode = self.gateway.mode(), "Cache miss, calling inference gateway");
        let prompt = self.prompts.build(request);
        let text = self.gateway.answer(&prompt).await?;
        self.cache.put(key, text.clone());
        Ok(text)
    }

    /// Drops the in-flight slot once it has settled, or once the last waiter
    /// gave up on it, unless a newer slot has already replaced it.
    fn release(&self, key: &CanonicalKey, slot: &Pending) {
        let mut in_flight = self.in_flight.lock();
        // map + this waiter
        let abandoned = Arc::strong_count(slot) <= 2;
        if !slot.initialized() && !abandoned {
            return;
        }
        if in_flight.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            in_flight.remove(key);
        }
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.lock().len()
    }
}

struct InFlightGuard<'a> {
    handler: &'a RequestHandler,
    key: CanonicalKey,
    slot: Pending,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.handler.release(&self.key, &self.slot);
    }
}
