//! Batch generation
//!
//! Independent requests run concurrently; each owns its own state machine
//! and budget, so nothing is shared between them beyond the service handle.

use crate::budget::Budgets;
use crate::error::GenerationFailure;
use crate::orchestrator::ContinuationOrchestrator;
use crate::types::FinalArtifact;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

impl ContinuationOrchestrator {
    /// Generate one component per requirement, at most
    /// [`batch_concurrency`](Self::batch_concurrency) at a time. Results come
    /// back in input order.
    pub async fn generate_batch<S>(
        &self,
        requirements: &[S],
        budgets: Budgets,
        cancel: &CancellationToken,
    ) -> Vec<Result<FinalArtifact, GenerationFailure>>
    where
        S: AsRef<str>,
    {
        let concurrency = self.batch_concurrency().max(1);
        tracing::info!(requests = requirements.len(), concurrency, "batch started");
        stream::iter(requirements)
            .map(|requirement| self.generate_with_cancel(requirement.as_ref(), budgets, cancel))
            .buffered(concurrency)
            .collect()
            .await
    }
}
