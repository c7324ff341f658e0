//! Client factory owning the primordial session and the pool of idle clones.
//!
//! # Architecture
//!
//! ```text
//! checkout()
//!   → pool has an idle session → wrap it
//!   → pool is empty            → clone the primordial session → wrap it
//!
//! PooledClient::release() / drop
//!   → session still ready → push back onto the pool
//!   → session not ready   → discard (its own Drop handles teardown)
//! ```
//!
//! The pool is unbounded and never evicts: every session cloned during a
//! burst stays pooled until [`ClientFactory::shutdown`].
//!
//! Sessions the factory never closes (teardown is left to the session's own
//! `Drop`):
//! - sessions found not ready on release;
//! - sessions cloned by [`ClientFactory::checkout_async`] whose future was
//!   dropped while the clone was still running on the blocking pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tenantpool_core::{ConnectionParams, FactoryOptions};
use tracing::{Span, debug, info};

use crate::client::PooledClient;
use crate::error::{FactoryResult, SessionError, SessionResult};
use crate::pool::SessionPool;
use crate::session::{Session, SessionProvider};

/// State shared between a factory and the clients it has handed out.
pub(crate) struct FactoryShared<S> {
    pub(crate) pool: SessionPool<S>,
    span: Span,
    shut_down: AtomicBool,
}

impl<S: Session> FactoryShared<S> {
    pub(crate) fn new(span: Span) -> Self {
        Self {
            pool: SessionPool::new(),
            span,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Pool a released session if it can still serve calls.
    pub(crate) fn return_to_pool(&self, session: Arc<S>) {
        let ready = session.is_ready();

        if self.shut_down.load(Ordering::Acquire) {
            if ready {
                session.close();
            }
            debug!(
                parent: &self.span,
                session = ?Arc::as_ptr(&session),
                "session released after shutdown, not pooled"
            );
            return;
        }

        if ready {
            self.pool.push(session);
            debug!(
                parent: &self.span,
                available = self.pool.len(),
                "returned session to pool"
            );
        } else {
            debug!(
                parent: &self.span,
                session = ?Arc::as_ptr(&session),
                "discarded session that is no longer ready"
            );
        }
    }
}

/// Pooled factory for authenticated sessions against one instance.
///
/// Construct with [`ClientFactory::builder`], [`ClientFactory::new`] or
/// [`ClientFactory::from_options`]. Hand out clients with
/// [`checkout`](ClientFactory::checkout); each client returns its session to
/// the pool when released or dropped.
///
/// `checkout` and client release are safe from any number of threads.
/// `shutdown` is not meant to race with `checkout`: stop checking out first.
pub struct ClientFactory<S: Session> {
    shared: Arc<FactoryShared<S>>,
    primordial: Arc<S>,
    params: ConnectionParams,
    /// Whether the primordial session came from a [`SessionProvider`].
    custom_provider: bool,
}

impl<S: Session> ClientFactory<S> {
    /// Start building a factory for client-credential sessions.
    ///
    /// Nothing is validated or opened until [`ClientFactoryBuilder::build`].
    pub fn builder(
        client_id: &str,
        client_secret: &str,
        instance_uri: &str,
    ) -> ClientFactoryBuilder<S> {
        ClientFactoryBuilder {
            options: FactoryOptions::new(client_id, client_secret, instance_uri),
            provider: None,
        }
    }

    /// Connect eagerly with the affinity cookie enabled.
    pub fn new(
        client_id: &str,
        client_secret: &str,
        instance_uri: &str,
        logger: Span,
    ) -> FactoryResult<Self> {
        Self::builder(client_id, client_secret, instance_uri)
            .logger(logger)
            .build()
    }

    pub fn with_deferred_connection(
        client_id: &str,
        client_secret: &str,
        instance_uri: &str,
        defer_connection: bool,
        logger: Span,
    ) -> FactoryResult<Self> {
        Self::builder(client_id, client_secret, instance_uri)
            .defer_connection(defer_connection)
            .logger(logger)
            .build()
    }

    /// Build from an options document. Without a logger on the options, a
    /// `client_factory` span is used.
    pub fn from_options(options: FactoryOptions) -> FactoryResult<Self> {
        let options = match options.logger {
            Some(_) => options,
            None => options.with_logger(tracing::info_span!("client_factory")),
        };
        ClientFactoryBuilder {
            options,
            provider: None,
        }
        .build()
    }

    /// Take a client, reusing an idle session or cloning the primordial one.
    ///
    /// Never waits on the pool. The clone fallback may block on network I/O;
    /// its error is returned as-is.
    pub fn checkout(&self) -> SessionResult<PooledClient<S>> {
        let session = match self.shared.pool.pop() {
            Some(session) => {
                debug!(
                    parent: &self.shared.span,
                    session = ?Arc::as_ptr(&session),
                    "reused pooled session"
                );
                session
            }
            None => {
                let session = Arc::new(self.primordial.try_clone()?);
                debug!(
                    parent: &self.shared.span,
                    session = ?Arc::as_ptr(&session),
                    "cloned primordial session"
                );
                session
            }
        };
        Ok(PooledClient::new(session, Arc::clone(&self.shared)))
    }

    /// Async variant of [`checkout`](Self::checkout).
    ///
    /// The clone fallback runs on tokio's blocking pool. Must be called from
    /// within a tokio runtime.
    pub async fn checkout_async(&self) -> SessionResult<PooledClient<S>> {
        if let Some(session) = self.shared.pool.pop() {
            debug!(
                parent: &self.shared.span,
                session = ?Arc::as_ptr(&session),
                "reused pooled session"
            );
            return Ok(PooledClient::new(session, Arc::clone(&self.shared)));
        }

        let primordial = Arc::clone(&self.primordial);
        let span = self.shared.span.clone();
        let cloned =
            tokio::task::spawn_blocking(move || span.in_scope(|| primordial.try_clone()));
        let session = match cloned.await {
            Ok(result) => Arc::new(result?),
            Err(join_err) if join_err.is_panic() => {
                std::panic::resume_unwind(join_err.into_panic())
            }
            Err(join_err) => {
                return Err(SessionError::Transport(format!(
                    "session clone task cancelled: {join_err}"
                )));
            }
        };
        debug!(
            parent: &self.shared.span,
            session = ?Arc::as_ptr(&session),
            "cloned primordial session"
        );
        Ok(PooledClient::new(session, Arc::clone(&self.shared)))
    }

    /// Replace the session provider and rebuild the primordial session with it.
    ///
    /// Clients already checked out and sessions already pooled are kept; new
    /// clones come from the rebuilt session. On error the factory is left
    /// unchanged. After [`shutdown`](Self::shutdown) this fails with
    /// [`SessionError::Closed`] and the provider is not called.
    pub fn install_session_provider<P>(&mut self, provider: P) -> SessionResult<()>
    where
        P: SessionProvider<S>,
    {
        if self.shared.shut_down.load(Ordering::Acquire) {
            return Err(SessionError::Closed);
        }
        let session = provider.provide(&self.params)?;
        let previous = std::mem::replace(&mut self.primordial, Arc::new(session));
        previous.close();
        self.custom_provider = true;
        info!(parent: &self.shared.span, "installed session provider");
        Ok(())
    }

    /// Establish the primordial session's transport if it was deferred.
    pub fn connect(&self) -> SessionResult<()> {
        self.primordial.connect()
    }

    /// Close every pooled session, then the primordial one.
    ///
    /// Runs once; later calls (including the one from `Drop`) do nothing.
    /// Clients released afterwards have their sessions closed, not pooled.
    pub fn shutdown(&self) {
        if self.shared.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let closed = self.shared.pool.drain().map(|session| session.close()).count();
        self.primordial.close();
        info!(parent: &self.shared.span, closed, "client factory shut down");
    }

    /// Idle sessions currently pooled. A snapshot; may be stale under concurrency.
    pub fn available_connections(&self) -> usize {
        self.shared.pool.len()
    }

    /// Whether the primordial session can serve calls.
    pub fn is_ready(&self) -> bool {
        self.primordial.is_ready()
    }

    /// How many concurrent clients the instance handles well, as hinted by
    /// the primordial session. `0` if unknown.
    pub fn recommended_parallelism(&self) -> usize {
        self.primordial.parallelism_hint()
    }

    /// The session all clones are made from.
    pub fn inner_session(&self) -> &Arc<S> {
        &self.primordial
    }

    /// Validated parameters the primordial session was opened with.
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Whether the primordial session came from an installed provider.
    pub fn has_session_provider(&self) -> bool {
        self.custom_provider
    }
}

impl<S: Session> Drop for ClientFactory<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<S: Session> std::fmt::Debug for ClientFactory<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFactory")
            .field("params", &self.params)
            .field("available", &self.available_connections())
            .field("custom_provider", &self.custom_provider)
            .field("shut_down", &self.shared.shut_down.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Builder for [`ClientFactory`].
pub struct ClientFactoryBuilder<S: Session> {
    options: FactoryOptions,
    provider: Option<Box<dyn SessionProvider<S>>>,
}

impl<S: Session> ClientFactoryBuilder<S> {
    /// Connect lazily on first use (default: false).
    pub fn defer_connection(mut self, defer: bool) -> Self {
        self.options.defer_connection = defer;
        self
    }

    /// Default: true.
    pub fn enable_affinity_cookie(mut self, enabled: bool) -> Self {
        self.options.enable_affinity_cookie = enabled;
        self
    }

    /// Span all factory events are recorded under. Required.
    pub fn logger(mut self, logger: Span) -> Self {
        self.options.logger = Some(logger);
        self
    }

    /// Build sessions with `provider` instead of [`Session::open`].
    pub fn session_provider<P>(mut self, provider: P) -> Self
    where
        P: SessionProvider<S> + 'static,
    {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Validate inputs, then establish the primordial session.
    ///
    /// Argument errors are returned before any session is opened.
    pub fn build(self) -> FactoryResult<ClientFactory<S>> {
        let params = self.options.validate()?;
        let primordial = match &self.provider {
            Some(provider) => provider.provide(&params)?,
            None => S::open(&params)?,
        };

        let span = params.logger().clone();
        info!(
            parent: &span,
            service_uri = %params.service_uri(),
            client_id = %params.client_id(),
            auth_mode = %params.auth_mode(),
            defer_connection = params.defer_connection(),
            enable_affinity_cookie = params.enable_affinity_cookie(),
            custom_provider = self.provider.is_some(),
            "client factory initialized"
        );

        Ok(ClientFactory {
            shared: Arc::new(FactoryShared::new(span)),
            primordial: Arc::new(primordial),
            params,
            custom_provider: self.provider.is_some(),
        })
    }
}
