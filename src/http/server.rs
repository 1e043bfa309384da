//! Admin TCP server: admission-controlled accept loop and per-connection worker.
//!
//! At most `max_connections` workers run at once. While saturated the accept
//! loop does not call `accept` at all, so extra clients wait in the kernel
//! backlog rather than in the application. A slot is released when its
//! worker finishes for any reason, including a panic (the slot guard is
//! dropped during unwind).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::http::codec::{read_request, write_response, Request, Response};
use crate::http::handlers::assets::StaticAssets;
use crate::http::router::{self, Context};
use crate::state::AppState;
use crate::types::{Config, Error, Result, ServerConfig, DEFAULT_MAX_CONNECTIONS};

/// Bounded pool of worker slots plus a live count of running workers.
#[derive(Debug, Clone)]
pub struct Admission {
    slots: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    limit: usize,
}

/// Held by a worker for its whole lifetime.
#[derive(Debug)]
struct WorkerSlot {
    active: Arc<AtomicUsize>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        // Runs before the permit field is dropped, so the count never lags a
        // freshly admitted worker.
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Admission {
    fn new(limit: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(limit)),
            active: Arc::new(AtomicUsize::new(0)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Workers currently running.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait for a free slot.
    async fn reserve(&self) -> Result<OwnedSemaphorePermit> {
        self.slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::cancelled("worker slots closed"))
    }

    fn occupy(&self, permit: OwnedSemaphorePermit) -> WorkerSlot {
        self.active.fetch_add(1, Ordering::SeqCst);
        WorkerSlot {
            active: self.active.clone(),
            _permit: permit,
        }
    }

    /// Wait until every slot is free again.
    async fn drain(&self) -> Result<()> {
        let all = u32::try_from(self.limit)
            .map_err(|_| Error::config(format!("max_connections too large: {}", self.limit)))?;
        let _all = self
            .slots
            .acquire_many(all)
            .await
            .map_err(|_| Error::cancelled("worker slots closed"))?;
        Ok(())
    }
}

/// Admin server bound to its listening socket.
#[derive(Debug)]
pub struct AccessServer {
    listener: TcpListener,
    ctx: Arc<Context>,
    config: ServerConfig,
    admission: Admission,
    cancel: CancellationToken,
}

impl AccessServer {
    /// Create the listening socket (`SO_REUSEADDR`, configured backlog).
    pub async fn bind(config: &Config, state: AppState) -> Result<Self> {
        let addr = config.server.socket_addr()?;
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(config.server.backlog.max(1))?;

        let limit = match config.server.max_connections {
            0 => DEFAULT_MAX_CONNECTIONS,
            n if n > Semaphore::MAX_PERMITS || u32::try_from(n).is_err() => {
                return Err(Error::config(format!("max_connections too large: {}", n)));
            }
            n => n,
        };

        let assets = StaticAssets::new(&config.assets.web_root);
        tracing::info!(
            "Admin server listening on {} (max_connections={}, backlog={}, web_root={})",
            listener.local_addr()?,
            limit,
            config.server.backlog,
            assets.web_root().display(),
        );

        Ok(Self {
            listener,
            ctx: Arc::new(Context { state, assets }),
            config: config.server.clone(),
            admission: Admission::new(limit),
            cancel: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for observing the worker count from outside.
    pub fn admission(&self) -> Admission {
        self.admission.clone()
    }

    /// Token that triggers graceful shutdown when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Accept until shutdown, then wait for every worker to finish.
    ///
    /// The listening socket is closed before this returns. An accept failure
    /// stops accepting too, but still drains before it is reported.
    pub async fn serve(self) -> Result<()> {
        let accepted = self.accept_loop().await;

        tracing::info!(
            "Waiting for {} of {} worker slots",
            self.admission.active(),
            self.admission.limit()
        );
        self.admission.drain().await?;
        tracing::info!("All workers finished");

        drop(self.listener);
        accepted
    }

    async fn accept_loop(&self) -> Result<()> {
        loop {
            // Saturated: no accept until a worker hands its slot back.
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                permit = self.admission.reserve() => permit?,
            };

            let (stream, peer) = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                accept = self.listener.accept() => accept?,
            };

            let slot = self.admission.occupy(permit);
            tracing::debug!("Connection from {} (active={})", peer, self.admission.active());

            let ctx = self.ctx.clone();
            let config = self.config.clone();
            tokio::spawn(
                async move {
                    if let Err(e) = handle_connection(stream, &ctx, &config).await {
                        tracing::warn!("Connection from {} error: {}", peer, e);
                    }
                    drop(slot);
                }
                .instrument(tracing::info_span!("connection", %peer)),
            );
        }

        tracing::info!("Admin server shutting down");
        Ok(())
    }
}

/// Handle a single connection: read one request, route it, answer, close.
async fn handle_connection(mut stream: TcpStream, ctx: &Context, config: &ServerConfig) -> Result<()> {
    let read = tokio::time::timeout(
        config.read_timeout(),
        read_request(&mut stream, config.max_request_bytes),
    )
    .await
    .map_err(|_| Error::timeout(format!("no request within {}s", config.read_timeout_secs)))??;

    let Some(raw) = read else {
        tracing::debug!("Peer closed before sending a request");
        return Ok(());
    };
    let Some(request) = Request::parse(&raw) else {
        tracing::debug!("Unparseable request line, closing");
        return Ok(());
    };
    tracing::debug!(method = %request.method, path = %request.path, "Request received");

    let response = match router::route_request(ctx, &request).await {
        Ok(Some(response)) => response,
        Ok(None) => {
            tracing::debug!("No route for {} {}, closing", request.method, request.path);
            return Ok(());
        }
        Err(Error::Validation(msg)) => {
            tracing::warn!("Malformed {} {}: {}", request.method, request.path, msg);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    timed_write(&mut stream, &response, config.write_timeout()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Write a response with a timeout (slow consumers must not pin a slot).
async fn timed_write(stream: &mut TcpStream, response: &Response, timeout: Duration) -> Result<()> {
    tokio::time::timeout(timeout, write_response(stream, response))
        .await
        .map_err(|_| {
            tracing::warn!("Write timeout ({}s), dropping connection", timeout.as_secs());
            Error::timeout("write timeout")
        })??;
    Ok(())
}
