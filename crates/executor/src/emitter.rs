//! The Emitter: enqueue in fixed order, then flush and close.

use pipeline::{ActionError, AnalyticsClient, EventBatch};
use tracing::{debug, warn};

/// Enqueues `batch` on `client` in send order: group updates, the primary
/// event, then per-job events.
pub fn enqueue(client: &mut dyn AnalyticsClient, batch: &EventBatch) -> Result<(), ActionError> {
    for update in &batch.group_updates {
        client.group_identify(update)?;
    }
    client.capture(&batch.primary)?;
    for event in &batch.job_events {
        client.capture(event)?;
    }
    debug!(
        group_updates = batch.group_updates.len(),
        events = batch.event_count(),
        "enqueued batch"
    );
    Ok(())
}

/// Enqueues `batch` and then flushes and closes `client`.
///
/// The client is closed even if enqueueing fails; the first error wins.
pub async fn emit(client: &mut dyn AnalyticsClient, batch: &EventBatch) -> Result<(), ActionError> {
    emit_then_close(client, batch, || {}).await
}

/// Like [`emit`], calling `before_close` once everything is enqueued and
/// before the flush starts.
pub async fn emit_then_close(
    client: &mut dyn AnalyticsClient,
    batch: &EventBatch,
    before_close: impl FnOnce(),
) -> Result<(), ActionError> {
    let enqueued = enqueue(client, batch);
    if let Err(e) = &enqueued {
        warn!(error = %e, "enqueue failed, closing client");
    }
    before_close();
    let closed = client.flush_and_close().await;
    enqueued.and(closed)
}
