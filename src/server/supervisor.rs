//! Listener supervisor
//!
//! The supervisor owns the TCP listener and every connection task.
//!
//! - `start(port)` binds and records the concrete local address
//! - `stop()` stops accepting, drains the registry, gives connection tasks
//!   a short grace period to flush their Close frames and aborts the rest
//! - `rebind(port)` is `stop()`, the fixed restart delay, then a fresh bind
//!   on the same port, retried a few times before giving up
//! - `run(shutdown)` accepts connections until the coordinator enters
//!   `Draining` (rebind and keep going) or `shutdown` resolves (stop, return)
//!
//! The listener is never shared: it lives in `self.listener` and is replaced
//! on every rebind.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, lookup_host};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{error, info, warn};
use tungstenite::protocol::frame::coding::CloseCode;

use crate::config::{GatewaySettings, Settings};
use crate::registry::{self, SharedRegistry};
use crate::restart::{RestartCoordinator, RestartPhase};
use crate::router::{GatewayHandlers, HandlerSet, NamespaceRouter};
use crate::transport::{ConnectionContext, handle_connection};
use crate::utils::{GatewayError, Result};

const DRAIN_REASON: &str = "server restarting";

/// Back-off after a failed `accept` so a persistent error (e.g. out of file
/// descriptors) does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

enum Outcome {
    Restart,
    Shutdown,
}

pub struct Supervisor {
    host: String,
    gateway: GatewaySettings,
    context: ConnectionContext,
    coordinator: RestartCoordinator,
    listener: Option<TcpListener>,
    local_addr: Option<SocketAddr>,
    tasks: JoinSet<()>,
}

impl Supervisor {
    pub fn new(
        settings: &Settings,
        router: NamespaceRouter,
        registry: SharedRegistry,
        coordinator: RestartCoordinator,
    ) -> Self {
        Self {
            host: settings.server.host.clone(),
            gateway: settings.gateway.clone(),
            context: ConnectionContext {
                router: Arc::new(router),
                registry,
                heartbeat: settings.heartbeat,
            },
            coordinator,
            listener: None,
            local_addr: None,
            tasks: JoinSet::new(),
        }
    }

    /// The standard gateway: every configured namespace served by one shared
    /// `GatewayHandlers`.
    pub fn from_settings(settings: &Settings) -> Self {
        let coordinator = RestartCoordinator::new();
        let handlers: Arc<dyn HandlerSet> = Arc::new(GatewayHandlers::new(
            coordinator.clone(),
            settings.gateway.restart_event.clone(),
        ));
        let router = NamespaceRouter::shared(&settings.gateway.namespaces, handlers);
        let registry = registry::shared(settings.gateway.max_connections);

        Self::new(settings, router, registry, coordinator)
    }

    pub fn coordinator(&self) -> &RestartCoordinator {
        &self.coordinator
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.context.registry
    }

    /// Address of the last successful bind.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Binds `host:port` and starts accepting once `run` is polled.
    /// Any listener already held is dropped first.
    pub async fn start(&mut self, port: u16) -> Result<SocketAddr> {
        self.context.heartbeat.validate()?;
        self.listener = None;

        let addr = self.resolve(port).await?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;
        let local = listener.local_addr()?;

        info!(
            addr = %local,
            namespaces = ?self.context.router.namespaces(),
            "gateway listening on ws://{local}"
        );

        self.listener = Some(listener);
        self.local_addr = Some(local);
        Ok(local)
    }

    /// Stops accepting and force-closes every connection.
    pub async fn stop(&mut self) {
        if self.listener.take().is_some() {
            info!("listener closed");
        }

        let drained = self
            .context
            .registry
            .lock()
            .drain(CloseCode::Away, DRAIN_REASON);

        // let connection tasks flush their close frames
        let grace = sleep(self.gateway.drain_grace());
        tokio::pin!(grace);
        loop {
            tokio::select! {
                joined = self.tasks.join_next() => {
                    if joined.is_none() {
                        break;
                    }
                }
                _ = &mut grace => break,
            }
        }

        let aborted = self.tasks.len();
        self.tasks.shutdown().await;

        // anything that finished its handshake during the grace period
        let late = self
            .context
            .registry
            .lock()
            .drain(CloseCode::Away, DRAIN_REASON);

        info!(drained, aborted, late, "all connections closed");
    }

    /// `stop()`, wait the restart delay, bind again on `port`.
    ///
    /// Walks the coordinator through `Draining -> Waiting -> Rebinding ->
    /// Idle`. Called directly (coordinator idle) it starts the cycle itself.
    /// From any phase other than `Idle` or `Draining` it fails before touching
    /// the listener or the connections.
    pub async fn rebind(&mut self, port: u16) -> Result<SocketAddr> {
        if self.coordinator.request() {
            info!("restart started by supervisor");
        } else {
            let current = self.coordinator.phase();
            if current != RestartPhase::Draining {
                return Err(GatewayError::InvalidTransition {
                    from: RestartPhase::Idle,
                    to: RestartPhase::Draining,
                    current,
                });
            }
        }

        self.stop().await;

        self.coordinator
            .transition(RestartPhase::Draining, RestartPhase::Waiting)?;
        let delay = self.gateway.restart_delay();
        info!(delay_ms = delay.as_millis() as u64, "waiting before rebind");
        sleep(delay).await;

        self.coordinator
            .transition(RestartPhase::Waiting, RestartPhase::Rebinding)?;
        let addr = self.bind_with_retry(port).await?;

        self.coordinator
            .transition(RestartPhase::Rebinding, RestartPhase::Idle)?;
        info!(
            addr = %addr,
            restarts = self.coordinator.completed_restarts(),
            "gateway rebound"
        );
        Ok(addr)
    }

    /// Accepts connections until shutdown, rebinding whenever a restart is
    /// requested. Requires a prior `start`.
    pub async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut phases = self.coordinator.subscribe();

        loop {
            let Some(listener) = self.listener.take() else {
                return Err(GatewayError::NotStarted);
            };

            let outcome = tokio::select! {
                _ = accept_loop(&listener, &mut self.tasks, &self.context) => Outcome::Shutdown,
                requested = async {
                    phases
                        .wait_for(|phase| *phase == RestartPhase::Draining)
                        .await
                        .is_ok()
                } => {
                    if requested {
                        Outcome::Restart
                    } else {
                        Outcome::Shutdown
                    }
                }
                _ = &mut shutdown => Outcome::Shutdown,
            };
            self.listener = Some(listener);

            match outcome {
                Outcome::Restart => {
                    let port = self
                        .local_addr
                        .map(|addr| addr.port())
                        .ok_or(GatewayError::NotStarted)?;
                    self.rebind(port).await?;
                }
                Outcome::Shutdown => {
                    info!("shutting down gateway");
                    self.stop().await;
                    return Ok(());
                }
            }
        }
    }

    async fn bind_with_retry(&mut self, port: u16) -> Result<SocketAddr> {
        let attempts = self.gateway.rebind_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.start(port).await {
                Ok(addr) => return Ok(addr),
                Err(e) if attempt < attempts => {
                    warn!(attempt, attempts, error = %e, "rebind failed; retrying");
                    sleep(self.gateway.restart_delay()).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(attempts, error = %e, "rebind failed; giving up");
                    return Err(e);
                }
            }
        }
    }

    async fn resolve(&self, port: u16) -> Result<SocketAddr> {
        let display = format!("{}:{port}", self.host);
        lookup_host((self.host.as_str(), port))
            .await
            .map_err(|_| GatewayError::InvalidAddress(display.clone()))?
            .next()
            .ok_or(GatewayError::InvalidAddress(display))
    }
}

async fn accept_loop(listener: &TcpListener, tasks: &mut JoinSet<()>, ctx: &ConnectionContext) {
    loop {
        // reap finished connection tasks
        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                if e.is_panic() {
                    error!(error = %e, "connection task panicked");
                }
            }
        }

        match listener.accept().await {
            Ok((stream, peer)) => {
                let ctx = ctx.clone();
                tasks.spawn(async move {
                    match handle_connection(stream, peer, ctx).await {
                        Ok(()) => {}
                        Err(GatewayError::UnknownNamespace(path)) => {
                            info!(%peer, namespace = %path, "refused unknown namespace");
                        }
                        Err(e) => warn!(%peer, error = %e, "connection ended with error"),
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}
