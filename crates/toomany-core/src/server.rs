//! Native HTTP server
//!
//! - Multi-threaded tokio runtime, one task per connection
//! - HTTP/1.1 via hyper
//! - Read-only [`RouteTable`] shared behind an `Arc`
//! - Graceful shutdown: stop accepting, drain live connections, bounded wait

use crate::{Error, Result, RouteTable};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::convert::Infallible;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Default listen host
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default listen port
pub const DEFAULT_PORT: u16 = 8000;
/// Default time allowed for connections to drain on shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const LISTEN_BACKLOG: i32 = 1024;
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            workers: num_cpus::get(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Resolve host and port into a socket address
    ///
    /// The host must be an IP literal; IPv6 may be given with or without
    /// brackets.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        let ip: IpAddr = host
            .parse()
            .map_err(|e| Error::InvalidAddress(format!("{}: {e}", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Create the listening socket
///
/// `SO_REUSEADDR` lets a restart bind over `TIME_WAIT` sockets. `SO_REUSEPORT`
/// is left off so a port that is already being listened on fails to bind.
pub fn create_listener(addr: &SocketAddr) -> std::io::Result<std::net::TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    // Inherited by accepted sockets on Linux
    socket.set_nodelay(true)?;
    socket.bind(&(*addr).into())?;
    socket.listen(LISTEN_BACKLOG)?;
    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

/// A bound stub server, ready to serve
pub struct Server {
    listener: TcpListener,
    routes: Arc<RouteTable>,
    tracker: Arc<ConnectionTracker>,
    shutdown_timeout: Duration,
}

impl Server {
    /// Bind the listening socket
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// [`Error::Bind`] when the address is unavailable.
    pub fn bind(config: &ServerConfig, routes: RouteTable) -> Result<Self> {
        let addr = config.socket_addr()?;
        let listener = create_listener(&addr)
            .and_then(TcpListener::from_std)
            .map_err(|source| Error::Bind { addr, source })?;

        Ok(Self {
            listener,
            routes: Arc::new(routes),
            tracker: Arc::new(ConnectionTracker::new()),
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// The address actually bound (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves, then drain
    ///
    /// Returns once every connection has closed or the shutdown timeout has
    /// elapsed. The listening socket is released before draining starts.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let Server {
            listener,
            routes,
            tracker,
            shutdown_timeout,
        } = self;

        let (drain_tx, drain_rx) = watch::channel(());
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        spawn_connection(stream, peer, routes.clone(), tracker.clone(), drain_rx.clone());
                    }
                    Err(e) => {
                        // EMFILE and friends; back off instead of spinning
                        warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        info!(active = tracker.count(), "shutting down");

        drop(drain_rx);
        // Wakes every connection's `changed()`; a send error only means none are left.
        let _ = drain_tx.send(());

        if wait_for_drain(&tracker, shutdown_timeout).await {
            info!("all connections drained");
        } else {
            warn!(
                active = tracker.count(),
                timeout_ms = shutdown_timeout.as_millis() as u64,
                "shutdown timeout reached with connections still open"
            );
        }
        Ok(())
    }
}

fn spawn_connection(
    stream: TcpStream,
    peer: SocketAddr,
    routes: Arc<RouteTable>,
    tracker: Arc<ConnectionTracker>,
    mut drain_rx: watch::Receiver<()>,
) {
    let guard = ConnectionGuard::new(tracker);

    tokio::spawn(async move {
        let _guard = guard;
        let io = TokioIo::new(stream);
        let service = service_fn(move |req| handle_request(routes.clone(), req));

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        let result = tokio::select! {
            res = conn.as_mut() => res,
            _ = drain_rx.changed() => {
                conn.as_mut().graceful_shutdown();
                conn.as_mut().await
            }
        };

        if let Err(e) = result {
            debug!(%peer, error = %e, "connection error");
        }
    });
}

/// Route one request
///
/// The body is drained frame by frame and discarded so the connection can be
/// reused; it is never buffered.
async fn handle_request(
    routes: Arc<RouteTable>,
    req: hyper::Request<Incoming>,
) -> std::result::Result<hyper::Response<Full<Bytes>>, Infallible> {
    let (parts, mut body) = req.into_parts();

    while let Some(frame) = body.frame().await {
        if frame.is_err() {
            break;
        }
    }

    let response = routes.dispatch(parts.method.as_str(), parts.uri.path());
    Ok(response.into_hyper())
}

async fn wait_for_drain(tracker: &ConnectionTracker, timeout: Duration) -> bool {
    let start = Instant::now();
    loop {
        if tracker.count() == 0 {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}

// ============================================================================
// Connection Tracking for Graceful Shutdown
// ============================================================================

/// Counts live connections so shutdown can wait for them to drain
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    active: AtomicU64,
}

impl ConnectionTracker {
    /// Create a new connection tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment active connection count
    #[inline]
    pub fn increment(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement active connection count
    #[inline]
    pub fn decrement(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// Get current active connection count
    #[inline]
    pub fn count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }
}

/// Counts a connection for as long as it lives, even if its task panics
struct ConnectionGuard(Arc<ConnectionTracker>);

impl ConnectionGuard {
    fn new(tracker: Arc<ConnectionTracker>) -> Self {
        tracker.increment();
        Self(tracker)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}
