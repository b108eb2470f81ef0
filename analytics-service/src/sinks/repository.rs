use futures::StreamExt;
use resource_client::domain::Reading;

use crate::pipeline::{Envelope, IngestSummary, PipelineError, Sink};
use crate::SharedRepository;

/// Appends priced readings to the shared repository in batches.
pub struct RepositorySink {
    repo: SharedRepository,
    batch_size: usize,
}

impl RepositorySink {
    pub fn new(repo: SharedRepository, batch_size: usize) -> Self {
        Self {
            repo,
            batch_size: batch_size.max(1),
        }
    }

    async fn flush_into(
        &self,
        batch: &mut Vec<Envelope<Reading>>,
        summary: &mut IngestSummary,
    ) -> Result<(), PipelineError> {
        let n = batch.len();
        let added = self.flush_batch(batch).await?;
        summary.accepted += added;
        summary.skipped += n - added;
        Ok(())
    }

    /// Stores the batch and returns how many readings were new.
    async fn flush_batch(&self, batch: &mut Vec<Envelope<Reading>>) -> Result<usize, PipelineError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let n = batch.len();
        let oldest = batch.iter().map(|e| e.received_at).min();
        let readings = batch.drain(..).map(|e| e.payload).collect();

        let added = self.repo.lock().await.add_readings(readings).map_err(|e| {
            tracing::error!(error = %e, batch = n, "repository sink flush failed");
            metrics::counter!("repository_sink_errors_total").increment(1);
            PipelineError::Sink(e.to_string())
        })?;

        if added < n {
            tracing::debug!(batch = n, duplicates = n - added, "skipped readings already stored");
        }
        metrics::counter!("repository_ingested_readings_total").increment(added as u64);
        metrics::counter!("repository_duplicate_readings_total").increment((n - added) as u64);
        if let Some(oldest) = oldest {
            let latency = time::OffsetDateTime::now_utc() - oldest;
            metrics::histogram!("ingest_end_to_end_latency_seconds").record(latency.as_seconds_f64());
        }
        Ok(added)
    }
}

#[async_trait::async_trait]
impl Sink<Reading> for RepositorySink {
    async fn run<S>(&self, mut input: S) -> Result<IngestSummary, PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<Reading>, PipelineError>> + Send + Unpin + 'static,
    {
        let mut summary = IngestSummary::default();
        let mut buffer: Vec<Envelope<Reading>> = Vec::with_capacity(self.batch_size);

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping rejected reading");
                    summary.rejected += 1;
                    continue;
                }
            };

            buffer.push(env);
            if buffer.len() >= self.batch_size {
                self.flush_into(&mut buffer, &mut summary).await?;
            }
        }

        self.flush_into(&mut buffer, &mut summary).await?;

        metrics::counter!("ingest_rejected_readings_total").increment(summary.rejected as u64);
        Ok(summary)
    }
}
