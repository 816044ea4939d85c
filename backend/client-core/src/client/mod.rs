//! Session controller: registration, polling, bait URLs, and teardown.
//!
//! [`OastClient`] owns the registered [`Session`] and is the only way to
//! drive it. Every state transition is checked synchronously under a lock
//! before any network work begins:
//!
//! - `start_polling`: Idle → Polling
//! - `stop_polling`: Polling → Idle
//! - `close`: Idle → Closed (terminal)
//!
//! While `close` waits on the server, the client stays `Idle` but is marked
//! as closing; a second `close` or a `start_polling` is rejected until the
//! deregistration settles.
//!
//! Polling runs as a tokio task cancelled through a [`CancellationToken`].
//! Dropping the client cancels it as well.

pub(crate) mod cycle;
mod scheduler;
mod state;

pub use state::ClientState;

use crate::config::ClientConfig;
use crate::crypto::CryptoProvider;
use crate::error::OastClientError;
use crate::http::OastHttpClient;
use crate::id::{generate_token, random_id};
use crate::interaction::Interaction;
use crate::protocol::{DeregisterRequest, RegisterRequest};
use crate::session::{Session, SessionInfo};
use crate::{MAX_REFRESH_SECONDS, MIN_REFRESH_SECONDS};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{error, info, warn};
use tokio::runtime::Handle as TokioHandle;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(MIN_REFRESH_SECONDS);

/// Receives each decoded interaction, in arrival order.
pub type InteractionHandler = Arc<dyn Fn(Interaction) + Send + Sync>;

/// Handler that discards interactions.
pub fn noop_handler() -> InteractionHandler {
    Arc::new(|_| {})
}

/// Adapt a bounded channel into a handler for delivery to another task.
///
/// Uses `try_send` so a slow consumer never stalls the poll cycle;
/// interactions that do not fit are logged and dropped.
pub fn channel_handler(sender: mpsc::Sender<Interaction>) -> InteractionHandler {
    Arc::new(move |interaction| {
        if let Err(e) = sender.try_send(interaction) {
            warn!("Dropping interaction, channel unavailable: {e}");
        }
    })
}

/// Shared between the client handle and its polling task.
struct Shared {
    session: Session,
    http: OastHttpClient,
    crypto: Arc<dyn CryptoProvider>,
    nonce_length: usize,
    state: Mutex<ClientState>,
    /// Set while a deregistration is in flight. Only written under the state lock.
    closing: AtomicBool,
    polling_interval_ms: AtomicU64,
    handler: Mutex<InteractionHandler>,
    cancel: Mutex<Option<CancellationToken>>,
    cycle_lock: AsyncMutex<()>,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms.load(Ordering::SeqCst))
    }

    fn set_polling_interval(&self, interval: Duration) {
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.polling_interval_ms.store(millis, Ordering::SeqCst);
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    fn current_handler(&self) -> InteractionHandler {
        self.handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_handler(&self, handler: InteractionHandler) {
        *self.handler.lock().unwrap_or_else(PoisonError::into_inner) = handler;
    }

    fn cancel_polling(&self) {
        if let Some(token) = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            token.cancel();
        }
    }
}

/// Client for one registered collaborator session.
pub struct OastClient {
    shared: Arc<Shared>,
}

impl OastClient {
    /// Register a session with the collaborator server.
    ///
    /// Without `config.session_info`, a fresh correlation ID and secret key are
    /// generated; with it, the saved identity, token and server URL are reused
    /// verbatim. On success the client is `Idle`, or `Polling` when
    /// `keep_alive_interval_ms` is set.
    ///
    /// `handler` receives interactions once polling runs. A no-op handler is
    /// used when none is given.
    ///
    /// # Errors
    ///
    /// - [`OastClientError::Configuration`] if the config is invalid
    /// - [`OastClientError::Registration`] if the public key cannot be encoded,
    ///   the request fails, or the server answers anything but 200
    pub async fn initialize(
        config: ClientConfig,
        crypto: Arc<dyn CryptoProvider>,
        handler: Option<InteractionHandler>,
    ) -> Result<Self, OastClientError> {
        config.validate()?;
        let server_url = config.parsed_server_url()?;

        let (correlation_id, secret_key, token) = match &config.session_info {
            Some(info) => {
                info!("Resuming session {}", info.correlation_id);
                (
                    info.correlation_id.clone(),
                    info.secret_key.clone(),
                    Some(info.token.clone()),
                )
            }
            None => (
                random_id(config.correlation_id_length),
                random_id(config.correlation_id_nonce_length),
                Some(config.token.clone().unwrap_or_else(generate_token)),
            ),
        };

        let public_key = crypto.encode_public_key().map_err(|e| {
            error!("Failed to encode public key: {e}");
            OastClientError::registration(None, format!("Failed to encode public key: {e}"))
        })?;

        let http = OastHttpClient::new(config.request_timeout())?;
        let session = Session::new(server_url, token, correlation_id, secret_key, public_key);

        let session = register_session(&http, session, config.disable_http_fallback)
            .await
            .inspect_err(|e| error!("Registration failed: {e}"))?;

        info!(
            "Registered correlation ID {} with {}",
            session.correlation_id(),
            session.server_url()
        );

        let client = Self {
            shared: Arc::new(Shared {
                session,
                http,
                crypto,
                nonce_length: config.correlation_id_nonce_length,
                state: Mutex::new(ClientState::Idle),
                closing: AtomicBool::new(false),
                polling_interval_ms: AtomicU64::new(0),
                handler: Mutex::new(handler.unwrap_or_else(noop_handler)),
                cancel: Mutex::new(None),
                cycle_lock: AsyncMutex::new(()),
            }),
        };
        client.shared.set_polling_interval(DEFAULT_POLLING_INTERVAL);

        if let Some(interval) = config.keep_alive_interval() {
            client.start_polling(interval, None)?;
        }

        Ok(client)
    }

    /// Start the background polling loop.
    ///
    /// The first cycle runs immediately, then one per `interval`. `handler`
    /// replaces the handler given at initialization; `None` keeps it.
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`OastClientError::State`] if already polling or closed
    /// - [`OastClientError::Configuration`] if `interval` is zero or no runtime is available
    pub fn start_polling(
        &self,
        interval: Duration,
        handler: Option<InteractionHandler>,
    ) -> Result<(), OastClientError> {
        let mut state = self.shared.lock_state();

        match *state {
            ClientState::Polling => {
                return Err(OastClientError::state(*state, "Already polling"));
            }
            ClientState::Closed => {
                return Err(OastClientError::state(*state, "Client is closed"));
            }
            ClientState::Idle => {}
        }

        if self.shared.is_closing() {
            return Err(OastClientError::state(*state, "Close in progress"));
        }

        if interval.is_zero() {
            return Err(OastClientError::configuration(
                "Polling interval must be greater than 0",
            ));
        }

        let runtime = TokioHandle::try_current().map_err(|e| {
            OastClientError::configuration(format!("Polling requires a tokio runtime: {e}"))
        })?;

        if let Some(handler) = handler {
            self.shared.set_handler(handler);
        }
        self.shared.set_polling_interval(interval);

        let cancel = CancellationToken::new();
        *self
            .shared
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(cancel.clone());
        *state = ClientState::Polling;
        drop(state);

        runtime.spawn(scheduler::polling_loop(
            Arc::clone(&self.shared),
            cancel,
            self.shared.current_handler(),
        ));

        Ok(())
    }

    /// Stop the background polling loop.
    ///
    /// A sleeping loop exits without running another cycle; an in-flight
    /// cycle completes first.
    ///
    /// # Errors
    ///
    /// Returns [`OastClientError::State`] if not polling.
    pub fn stop_polling(&self) -> Result<(), OastClientError> {
        let mut state = self.shared.lock_state();

        if *state != ClientState::Polling {
            return Err(OastClientError::state(*state, "Not polling"));
        }

        self.shared.cancel_polling();
        *state = ClientState::Idle;
        info!("Polling stop requested for {}", self.correlation_id());

        Ok(())
    }

    /// Run one poll cycle now, outside the schedule.
    ///
    /// Uses the same handler as the scheduled loop and returns the number of
    /// interactions delivered.
    ///
    /// # Errors
    ///
    /// - [`OastClientError::State`] if not polling
    /// - [`OastClientError::Authentication`] on a 401
    /// - [`OastClientError::Polling`] on other failed responses or transport errors
    /// - [`OastClientError::Decode`] if an item cannot be decrypted or decoded
    pub async fn poll(&self) -> Result<usize, OastClientError> {
        let handler = {
            let state = self.shared.lock_state();
            if *state != ClientState::Polling {
                return Err(OastClientError::state(*state, "Not polling"));
            }
            self.shared.current_handler()
        };

        self.shared.run_cycle(&handler).await
    }

    /// Change the polling interval, in seconds.
    ///
    /// Takes effect on the next sleep of the polling loop.
    ///
    /// # Errors
    ///
    /// Returns [`OastClientError::Configuration`] unless `5 <= seconds <= 3600`.
    pub fn set_refresh_time_second(&self, seconds: u64) -> Result<(), OastClientError> {
        if !(MIN_REFRESH_SECONDS..=MAX_REFRESH_SECONDS).contains(&seconds) {
            return Err(OastClientError::configuration(format!(
                "Refresh time must be between {MIN_REFRESH_SECONDS} and {MAX_REFRESH_SECONDS} seconds, got {seconds}"
            )));
        }

        self.shared.set_polling_interval(Duration::from_secs(seconds));
        Ok(())
    }

    /// Deregister the session. The client is `Closed` afterwards.
    ///
    /// # Errors
    ///
    /// - [`OastClientError::State`] if polling, already closed, or another
    ///   close is in flight
    /// - [`OastClientError::Deregistration`] if the request fails or the server
    ///   answers anything but 200; the client stays `Idle`
    pub async fn close(&self) -> Result<(), OastClientError> {
        let closing = {
            let state = self.shared.lock_state();
            match *state {
                ClientState::Polling => {
                    return Err(OastClientError::state(
                        *state,
                        "Must stop polling before closing",
                    ));
                }
                ClientState::Closed => {
                    return Err(OastClientError::state(*state, "Already closed"));
                }
                ClientState::Idle => {}
            }

            if self.shared.closing.swap(true, Ordering::SeqCst) {
                return Err(OastClientError::state(*state, "Close in progress"));
            }
            ClosingGuard {
                shared: &self.shared,
            }
        };

        let session = &self.shared.session;
        let body = DeregisterRequest {
            correlation_id: session.correlation_id().to_string(),
            secret_key: session.secret_key().as_str().to_string(),
        };

        self.shared
            .http
            .deregister(session.server_url(), session.token(), &body)
            .await
            .inspect_err(|e| error!("Deregistration failed: {e}"))?;

        closing.complete();
        info!("Closed session {}", session.correlation_id());

        Ok(())
    }

    /// New bait address under this session: `https://{correlation_id}{nonce}.{host}`.
    ///
    /// The nonce is fresh on every call. Returns `None` once closed.
    pub fn generate_url(&self) -> Option<String> {
        if self.state() == ClientState::Closed {
            return None;
        }

        let session = &self.shared.session;
        let host = session.host()?;
        if session.correlation_id().is_empty() {
            return None;
        }

        Some(interaction_url(
            session.correlation_id(),
            &random_id(self.shared.nonce_length),
            host,
        ))
    }

    /// Export the session for later resumption via `ClientConfig::session_info`.
    ///
    /// # Errors
    ///
    /// Returns [`OastClientError::Configuration`] if the session is incomplete.
    pub fn save_session(&self) -> Result<SessionInfo, OastClientError> {
        self.shared.session.to_info()
    }

    pub fn state(&self) -> ClientState {
        *self.shared.lock_state()
    }

    pub fn polling_interval(&self) -> Duration {
        self.shared.polling_interval()
    }

    pub fn correlation_id(&self) -> &str {
        self.shared.session.correlation_id()
    }

    pub fn server_url(&self) -> &Url {
        self.shared.session.server_url()
    }

    pub fn session(&self) -> &Session {
        &self.shared.session
    }

    pub fn has_private_key(&self) -> bool {
        self.shared.crypto.has_private_key()
    }
}

/// Clears the closing marker when a close attempt ends, including when the
/// `close` future is dropped mid-request.
struct ClosingGuard<'a> {
    shared: &'a Shared,
}

impl ClosingGuard<'_> {
    /// Idle → Closed. The marker is cleared as the guard drops.
    fn complete(self) {
        *self.shared.lock_state() = ClientState::Closed;
    }
}

impl Drop for ClosingGuard<'_> {
    fn drop(&mut self) {
        let _state = self.shared.lock_state();
        self.shared.closing.store(false, Ordering::SeqCst);
    }
}

impl Drop for OastClient {
    fn drop(&mut self) {
        self.shared.cancel_polling();
    }
}

pub(crate) fn interaction_url(correlation_id: &str, nonce: &str, host: &str) -> String {
    format!("https://{correlation_id}{nonce}.{host}")
}

/// Register, retrying once over plain HTTP when HTTPS fails at the transport level.
async fn register_session(
    http: &OastHttpClient,
    session: Session,
    disable_http_fallback: bool,
) -> Result<Session, OastClientError> {
    let body = RegisterRequest {
        public_key: session.public_key().to_string(),
        secret_key: session.secret_key().as_str().to_string(),
        correlation_id: session.correlation_id().to_string(),
    };

    let error = match http.register(session.server_url(), session.token(), &body).await {
        Ok(()) => return Ok(session),
        Err(e) => e,
    };

    let transport_failure = error.status_code().is_none();
    if disable_http_fallback || !transport_failure || session.server_url().scheme() != "https" {
        return Err(error);
    }

    let mut fallback_url = session.server_url().clone();
    if fallback_url.set_scheme("http").is_err() {
        return Err(error);
    }

    warn!("Registration over HTTPS failed ({error}), retrying with {fallback_url}");
    http.register(&fallback_url, session.token(), &body).await?;

    Ok(session.with_server_url(fallback_url))
}
