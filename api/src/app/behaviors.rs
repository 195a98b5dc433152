//! Dispatcher behaviors

use std::time::Instant;

use async_trait::async_trait;
use tracing::Instrument;

use super::dispatcher::{Behavior, ErasedResponse, Next, RequestInfo};
use crate::error::AppError;

/// Wraps every request in a tracing span and records its outcome
pub struct LoggingBehavior;

#[async_trait]
impl Behavior for LoggingBehavior {
    async fn handle(
        &self,
        info: &RequestInfo,
        next: Next<'_>,
    ) -> Result<ErasedResponse, AppError> {
        let span = tracing::info_span!(
            "request",
            name = %info.name,
            kind = %info.kind,
            tenant = %info.tenant_id,
        );

        async move {
            let started = Instant::now();
            tracing::debug!("Handling request");

            let result = next.run().await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "Request handled"),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(elapsed_ms, error = %e, "Request target not found")
                }
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "Request failed"),
            }

            result
        }
        .instrument(span)
        .await
    }
}
