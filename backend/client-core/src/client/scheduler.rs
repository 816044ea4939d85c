use super::{InteractionHandler, Shared};

use std::sync::Arc;

use log::{debug, info};
use tokio::time::sleep as TokioSleep;
use tokio_util::sync::CancellationToken;

/// Background loop: poll, then wait for the current interval or cancellation.
///
/// A failed cycle never ends the loop. Cancellation is observed at loop
/// entry and while sleeping; an in-flight request completes first.
pub(super) async fn polling_loop(
    shared: Arc<Shared>,
    cancel: CancellationToken,
    handler: InteractionHandler,
) {
    info!(
        "Polling started for {} every {:?}",
        shared.session.correlation_id(),
        shared.polling_interval()
    );

    loop {
        if cancel.is_cancelled() {
            break;
        }

        if let Err(e) = shared.run_cycle(&handler).await {
            debug!("Scheduled poll failed ({}), continuing", e.error_category());
        }

        // Re-read every iteration so refresh changes apply on the next sleep
        let interval = shared.polling_interval();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = TokioSleep(interval) => {}
        }
    }

    info!("Polling stopped for {}", shared.session.correlation_id());
}
