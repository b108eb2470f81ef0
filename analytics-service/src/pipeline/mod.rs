use std::{pin::Pin, sync::Arc};

use futures::{Stream, StreamExt};
use time::OffsetDateTime;

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: OffsetDateTime,
}

impl<T> Envelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            received_at: OffsetDateTime::now_utc(),
        }
    }

    /// Replaces the payload, keeping the arrival time.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            payload: f(self.payload),
            received_at: self.received_at,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("transform error: {0}")]
    Transform(String),
    #[error("sink error: {0}")]
    Sink(String),
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct IngestSummary {
    pub accepted: usize,
    pub rejected: usize,
    /// Valid items the sink already held.
    pub skipped: usize,
}

pub type EnvelopeStream<T> =
    Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(&self) -> EnvelopeStream<T>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    async fn run<S>(&self, input: S) -> Result<IngestSummary, PipelineError>
    where
        S: Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static;
}

/// Source, then same-type checks in order, then one converting stage, then
/// the sink. Errors from any step travel downstream as items so the sink can
/// count them.
pub struct Pipeline<S, I, O, K> {
    pub source: S,
    pub checks: Vec<Arc<dyn Transform<I, I>>>,
    pub stage: Arc<dyn Transform<I, O>>,
    pub sink: K,
}

fn chain<I, O>(stream: EnvelopeStream<I>, t: Arc<dyn Transform<I, O>>) -> EnvelopeStream<O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    Box::pin(stream.then(move |item| {
        let t = t.clone();
        async move {
            match item {
                Ok(env) => t.apply(env).await,
                Err(e) => Err(e),
            }
        }
    }))
}

impl<S, I, O, K> Pipeline<S, I, O, K>
where
    I: Send + 'static,
    O: Send + 'static,
    S: Source<I> + 'static,
    K: Sink<O> + 'static,
{
    pub async fn run(self) -> Result<IngestSummary, PipelineError> {
        let mut stream = self.source.stream().await;

        for check in self.checks {
            stream = chain(stream, check);
        }

        let summary = self.sink.run(chain(stream, self.stage)).await?;
        tracing::info!(
            accepted = summary.accepted,
            rejected = summary.rejected,
            skipped = summary.skipped,
            "pipeline finished"
        );
        Ok(summary)
    }
}
