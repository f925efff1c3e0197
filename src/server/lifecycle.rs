//! Server lifecycle: an idempotent open/close state machine around the
//! listener.
//!
//! # State Machine
//! ```text
//! Closed ──(open)──► Listening ──(close)──► Closed
//! ```
//! No other transitions exist. Opening while listening and closing while
//! closed are no-ops that complete successfully. Reopening after a close
//! binds afresh.
//!
//! # Design Decisions
//! - Both transitions run under one async lock, so concurrent open/close
//!   calls serialize and a second caller observes the settled state
//! - `is_open()` answers from a dedicated flag flipped only inside those
//!   guarded transitions, after the bind or shutdown has completed; the
//!   serve task and its handle are never introspected for liveness
//! - `close()` stops accepting first, then waits for in-flight requests to
//!   drain (bounded by `shutdown_grace_ms` when set) and surfaces any
//!   serve-task error instead of swallowing it

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use regex::Regex;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::{validate_config, ConfigError, ValidationError, WebhookConfig};
use crate::dispatch::{ErrorListener, ErrorReporter, UpdateProcessor};
use crate::net::{TransportError, TransportMode};
use crate::server::router::{build_router, RouterState};

/// Failure raised while constructing or driving the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configuration failed semantic validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// TLS material could not be selected or loaded.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The configured host did not resolve to a usable address.
    #[error("failed to resolve listen address {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Binding or starting the listener failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The serve task ended with an error, surfaced by `close()`.
    #[error("listener closed with an error: {0}")]
    Close(#[source] std::io::Error),

    /// The serve task panicked or was aborted.
    #[error("listener task failed: {0}")]
    Join(#[source] tokio::task::JoinError),
}

/// Listener resources held while the server is accepting connections.
struct ActiveListener {
    handle: Handle,
    task: JoinHandle<std::io::Result<()>>,
    local_addr: SocketAddr,
}

enum Lifecycle {
    Closed,
    Listening(ActiveListener),
}

/// HTTP(S) webhook receiver with an idempotent open/close lifecycle.
///
/// Construction resolves the transport and loads TLS material; `open()`
/// binds and starts serving; `close()` drains and releases the listener.
/// The same instance can be opened and closed repeatedly.
pub struct WebhookServer {
    config: Arc<WebhookConfig>,
    tls: Option<RustlsConfig>,
    router: Router,
    reporter: Arc<ErrorReporter>,
    lifecycle: Mutex<Lifecycle>,
    open: AtomicBool,
}

impl WebhookServer {
    /// Build a receiver from a validated configuration and the processor
    /// that will consume decoded updates.
    ///
    /// Fails when the configuration is semantically invalid or when the
    /// selected TLS material cannot be read; a receiver must never come up
    /// on a different transport than it was configured for.
    pub async fn new(
        config: WebhookConfig,
        processor: Arc<dyn UpdateProcessor>,
    ) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        // Just validated, so this compile only repeats the earlier one;
        // still no reason to panic if it disagrees.
        let health_pattern = Regex::new(&config.health_endpoint).map_err(|source| {
            ConfigError::Validation(vec![ValidationError::InvalidHealthPattern {
                pattern: config.health_endpoint.clone(),
                source,
            }])
        })?;

        let mode = TransportMode::select(config.tls.as_ref());
        let tls = mode.materialize().await?;

        let config = Arc::new(config);
        let reporter = Arc::new(ErrorReporter::new());
        let router = build_router(RouterState {
            config: config.clone(),
            health_pattern,
            processor,
            reporter: reporter.clone(),
        });

        Ok(Self {
            config,
            tls,
            router,
            reporter,
            lifecycle: Mutex::new(Lifecycle::Closed),
            open: AtomicBool::new(false),
        })
    }

    /// Bind the configured address and start accepting connections.
    ///
    /// Completes once the listener is accepting. Opening an already-open
    /// server is a no-op; the existing listener keeps serving and no second
    /// bind is attempted.
    pub async fn open(&self) -> Result<(), ServerError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if let Lifecycle::Listening(_) = &*lifecycle {
            tracing::debug!("open() on a listening server, nothing to do");
            return Ok(());
        }

        let addr = self.resolve_addr().await?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;
        let std_listener = listener
            .into_std()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let handle = Handle::new();
        let service = self.router.clone().into_make_service();
        let task = match &self.tls {
            Some(tls) => {
                let server =
                    axum_server::from_tcp_rustls(std_listener, tls.clone()).handle(handle.clone());
                tokio::spawn(async move { server.serve(service).await })
            }
            None => {
                let server = axum_server::from_tcp(std_listener).handle(handle.clone());
                tokio::spawn(async move { server.serve(service).await })
            }
        };

        // The bind itself succeeded above; this waits until the accept loop
        // is live so callers observe a server that really receives traffic.
        if handle.listening().await.is_none() {
            return Err(match task.await {
                Ok(Err(source)) => ServerError::Bind { addr, source },
                Ok(Ok(())) => ServerError::Bind {
                    addr,
                    source: std::io::Error::other("listener exited before accepting"),
                },
                Err(source) => ServerError::Join(source),
            });
        }

        *lifecycle = Lifecycle::Listening(ActiveListener {
            handle,
            task,
            local_addr,
        });
        self.open.store(true, Ordering::SeqCst);

        tracing::info!(
            address = %local_addr,
            tls = self.tls.is_some(),
            "Webhook server listening"
        );
        Ok(())
    }

    /// Stop accepting connections and release the listener.
    ///
    /// In-flight requests drain first; `shutdown_grace_ms` bounds the wait
    /// when set, otherwise the call waits for them all. Closing an
    /// already-closed server is a no-op. Errors the serve task ended with
    /// are returned here rather than dropped.
    pub async fn close(&self) -> Result<(), ServerError> {
        let mut lifecycle = self.lifecycle.lock().await;
        let Lifecycle::Listening(listener) = std::mem::replace(&mut *lifecycle, Lifecycle::Closed)
        else {
            tracing::debug!("close() on a closed server, nothing to do");
            return Ok(());
        };

        let grace = self.config.shutdown_grace_ms.map(Duration::from_millis);
        tracing::info!(grace = ?grace, "Webhook server closing");
        listener.handle.graceful_shutdown(grace);

        let result = match listener.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(ServerError::Close(source)),
            Err(source) => Err(ServerError::Join(source)),
        };

        self.open.store(false, Ordering::SeqCst);
        tracing::info!("Webhook server closed");
        result
    }

    /// Whether the server is between a completed `open()` and a completed
    /// `close()`.
    ///
    /// This flag is the single source of truth for liveness; the listener
    /// itself is never queried.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Address the listener is bound to, while open.
    ///
    /// Useful when the configured port is 0 and the OS picked one.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.lifecycle.lock().await {
            Lifecycle::Listening(listener) => Some(listener.local_addr),
            Lifecycle::Closed => None,
        }
    }

    /// True when the resolved transport terminates TLS.
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// The configuration this server was built with.
    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Register (or replace) the webhook-error listener.
    ///
    /// Takes effect for the next reported failure; no queue of earlier
    /// failures is replayed.
    pub fn set_error_listener(&self, listener: Arc<dyn ErrorListener>) {
        self.reporter.set_listener(listener);
    }

    /// Remove the webhook-error listener; failures return to the log sink.
    pub fn clear_error_listener(&self) {
        self.reporter.clear_listener();
    }

    /// Resolve `host:port` to the first usable socket address.
    async fn resolve_addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        // Pass an owned copy: the returned iterator keeps its argument
        // alive, and `addr` still has to reach the error payloads below.
        let mut candidates =
            tokio::net::lookup_host(addr.clone())
                .await
                .map_err(|source| ServerError::Resolve {
                    addr: addr.clone(),
                    source,
                })?;
        candidates.next().ok_or_else(|| ServerError::Resolve {
            addr,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no usable address"),
        })
    }
}

impl Drop for WebhookServer {
    fn drop(&mut self) {
        // Dropped without close(): stop the accept loop so the spawned
        // serve task does not outlive the server. Nothing is drained and
        // no error can be reported from here.
        if let Lifecycle::Listening(listener) = self.lifecycle.get_mut() {
            listener.handle.shutdown();
        }
    }
}
