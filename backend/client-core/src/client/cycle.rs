//! One fetch, decrypt, decode, deliver pass.

use super::{InteractionHandler, Shared};
use crate::crypto::CryptoProvider;
use crate::error::OastClientError;
use crate::interaction::Interaction;
use crate::protocol::PollResponse;

use log::{debug, error, warn};

impl Shared {
    /// Run one poll cycle and deliver its interactions to `handler`.
    ///
    /// Cycles are serialized: the scheduled loop and manual polls never
    /// overlap, so the handler is never invoked concurrently with itself.
    /// Failures are logged here and returned to the caller.
    pub(super) async fn run_cycle(
        &self,
        handler: &InteractionHandler,
    ) -> Result<usize, OastClientError> {
        let _cycle = self.cycle_lock.lock().await;

        let result = match self
            .http
            .poll(
                self.session.server_url(),
                self.session.token(),
                self.session.correlation_id(),
                self.session.secret_key(),
            )
            .await
        {
            Ok(response) => deliver_batch(self.crypto.as_ref(), &response, handler),
            Err(e) => Err(e),
        };

        match &result {
            Ok(0) => {}
            Ok(delivered) => debug!("Delivered {delivered} interaction(s)"),
            Err(e) if e.is_authentication() => {
                error!("Poll rejected, session is not authorized: {e}")
            }
            Err(e) => warn!("Poll cycle failed: {e}"),
        }

        result
    }
}

/// Decrypt and decode each item of a poll envelope, in server order.
///
/// Encrypted `data` items come first, then the plaintext `extra` and
/// `tld_data` items. The first item that fails to decrypt or decode aborts
/// the rest of the batch; items already delivered stay delivered.
pub(crate) fn deliver_batch(
    crypto: &dyn CryptoProvider,
    response: &PollResponse,
    handler: &InteractionHandler,
) -> Result<usize, OastClientError> {
    let mut delivered = 0;

    for (index, item) in response.encrypted_items().iter().enumerate() {
        let plaintext = crypto
            .decrypt_message(&response.aes_key, item)
            .map_err(|e| OastClientError::decode(index, format!("Failed to decrypt: {e}")))?;

        let interaction = Interaction::from_slice(&plaintext)
            .map_err(|e| OastClientError::decode(index, format!("Invalid interaction: {e}")))?;

        handler(interaction);
        delivered += 1;
    }

    let offset = response.encrypted_items().len();
    for (index, item) in response.plaintext_items().enumerate() {
        let interaction = Interaction::from_slice(item.as_bytes()).map_err(|e| {
            OastClientError::decode(offset + index, format!("Invalid interaction: {e}"))
        })?;

        handler(interaction);
        delivered += 1;
    }

    Ok(delivered)
}
