use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use serde::Serialize;
use time::{Duration, OffsetDateTime};

use super::{Clock, NarrativeBackend, NarrativeProfile, NarrativeRequest, SystemClock};
use crate::config::NarrativeConfig;

pub const QUOTA_MESSAGE: &str = "Analysis paused (Daily Quota Reached). Please check back tomorrow.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeOrigin {
    Cache,
    Backend,
    QuotaExhausted,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Narrative {
    pub text: String,
    pub origin: NarrativeOrigin,
}

struct CacheEntry {
    text: String,
    stored_at: OffsetDateTime,
}

struct State {
    cache: HashMap<String, CacheEntry>,
    used: u32,
    window_start: OffsetDateTime,
}

impl State {
    fn roll_window(&mut self, now: OffsetDateTime, window: Duration) {
        if now - self.window_start >= window {
            tracing::info!(used = self.used, "narrative quota window reset");
            self.used = 0;
            self.window_start = now;
        }
    }

    fn cached(&mut self, key: &str, now: OffsetDateTime, ttl: Duration) -> Option<String> {
        let fresh = now - self.cache.get(key)?.stored_at < ttl;
        if fresh {
            self.cache.get(key).map(|e| e.text.clone())
        } else {
            self.cache.remove(key);
            None
        }
    }
}

fn cache_key(prompt: &str, system: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(prompt.len() as u64).to_le_bytes());
    hasher.update(prompt.as_bytes());
    hasher.update(system.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Cached, rate-limited front for a [`NarrativeBackend`].
///
/// Cache hits never count against the quota. A backend failure hands the
/// reserved request back and serves the request's fallback text.
pub struct NarrativeService<B, C = SystemClock> {
    backend: B,
    clock: C,
    daily_limit: u32,
    ttl: Duration,
    window: Duration,
    state: Mutex<State>,
}

impl<B: NarrativeBackend> NarrativeService<B> {
    pub fn new(backend: B, cfg: &NarrativeConfig) -> Self {
        Self::with_clock(backend, SystemClock, cfg)
    }
}

impl<B: NarrativeBackend, C: Clock> NarrativeService<B, C> {
    pub fn with_clock(backend: B, clock: C, cfg: &NarrativeConfig) -> Self {
        let window_start = clock.now();
        Self {
            backend,
            clock,
            daily_limit: cfg.daily_limit,
            ttl: Duration::hours(cfg.cache_ttl_hours),
            window: Duration::hours(cfg.quota_window_hours),
            state: Mutex::new(State {
                cache: HashMap::new(),
                used: 0,
                window_start,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests counted against the current window.
    pub fn used(&self) -> u32 {
        let mut state = self.lock();
        state.roll_window(self.clock.now(), self.window);
        state.used
    }

    pub async fn narrate(&self, request: &NarrativeRequest, profile: &NarrativeProfile) -> Narrative {
        let system = profile.system_instruction();
        let prompt = request.prompt(&profile.currency);
        let key = cache_key(&prompt, &system);
        let now = self.clock.now();

        {
            let mut state = self.lock();
            state.roll_window(now, self.window);

            if let Some(text) = state.cached(&key, now, self.ttl) {
                metrics::counter!("narrative_cache_hits_total").increment(1);
                tracing::debug!(kind = request.kind(), "narrative cache hit");
                return Narrative {
                    text,
                    origin: NarrativeOrigin::Cache,
                };
            }

            if state.used >= self.daily_limit {
                metrics::counter!("narrative_quota_exhausted_total").increment(1);
                tracing::warn!(limit = self.daily_limit, "narrative daily quota reached");
                return Narrative {
                    text: QUOTA_MESSAGE.to_string(),
                    origin: NarrativeOrigin::QuotaExhausted,
                };
            }
            state.used += 1;
            tracing::debug!(
                kind = request.kind(),
                used = state.used,
                limit = self.daily_limit,
                "calling narrative backend"
            );
        }

        match self.backend.generate(&prompt, &system).await {
            Ok(text) if !text.trim().is_empty() => {
                let mut state = self.lock();
                let ttl = self.ttl;
                state.cache.retain(|_, e| now - e.stored_at < ttl);
                state.cache.insert(
                    key,
                    CacheEntry {
                        text: text.clone(),
                        stored_at: now,
                    },
                );
                Narrative {
                    text,
                    origin: NarrativeOrigin::Backend,
                }
            }
            Ok(_) => {
                tracing::warn!(kind = request.kind(), "narrative backend returned no text");
                Narrative {
                    text: request.fallback().to_string(),
                    origin: NarrativeOrigin::Fallback,
                }
            }
            Err(e) => {
                metrics::counter!("narrative_backend_failures_total").increment(1);
                tracing::warn!(error = %e, kind = request.kind(), "narrative backend failed, serving fallback");
                let mut state = self.lock();
                state.used = state.used.saturating_sub(1);
                Narrative {
                    text: request.fallback().to_string(),
                    origin: NarrativeOrigin::Fallback,
                }
            }
        }
    }
}
