//! Human-readable commentary on computed metrics.
//!
//! Text generation sits behind [`NarrativeBackend`]; [`NarrativeService`]
//! adds a TTL cache, a daily request quota and per-request fallbacks so
//! callers always get text back.

use std::sync::{Arc, Mutex, PoisonError};

use time::{Duration, OffsetDateTime};

pub mod request;
pub mod service;

pub use request::{NarrativeProfile, NarrativeRequest};
pub use service::{Narrative, NarrativeOrigin, NarrativeService, QUOTA_MESSAGE};

#[derive(thiserror::Error, Debug)]
pub enum NarrativeError {
    #[error("narrative backend unavailable: {0}")]
    Unavailable(String),
    #[error("narrative backend error: {0}")]
    Backend(String),
}

#[async_trait::async_trait]
pub trait NarrativeBackend: Send + Sync {
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, NarrativeError>;
}

#[async_trait::async_trait]
impl<B: NarrativeBackend + ?Sized> NarrativeBackend for Box<B> {
    async fn generate(&self, prompt: &str, system: &str) -> Result<String, NarrativeError> {
        (**self).generate(prompt, system).await
    }
}

/// Backend for deployments without a text-generation provider.
#[derive(Debug, Clone, Default)]
pub struct UnavailableBackend;

#[async_trait::async_trait]
impl NarrativeBackend for UnavailableBackend {
    async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, NarrativeError> {
        Err(NarrativeError::Unavailable("no provider configured".to_string()))
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> OffsetDateTime {
        (**self).now()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
