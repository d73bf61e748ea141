//! Gateway supervisor for managing the HTTP server lifecycle.
//!
//! The server runs on its own OS thread with a single-threaded tokio runtime,
//! so it never competes with the host's event loop. The supervisor owns the
//! thread handle internally; callers only see start/stop/status.
//!
//! Key design decisions:
//! - **Bind-then-report**: the listener binds on the caller's thread, so bind
//!   errors surface from `start()` and the real address is known up front
//! - **Crash detection**: `status()` uses the cancellation token to tell a
//!   clean stop from a crash
//! - **No forced cancellation**: stop only stops accepting connections;
//!   in-flight requests finish on their own

use std::fmt;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result as AnyResult;
use oaibridge_core::GatewayConfig;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long `stop()` waits for the server thread before detaching it.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

const SERVER_THREAD_NAME: &str = "oaibridge-gateway";

/// Handle to a running gateway server.
struct ServerHandle {
    /// Cancellation token for graceful shutdown.
    cancel_token: CancellationToken,
    /// The dedicated server thread (returns Result for error propagation).
    thread: JoinHandle<AnyResult<()>>,
    /// Address the server is bound to.
    bound_addr: SocketAddr,
}

/// Status of the gateway server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayStatus {
    /// Server is not running.
    Stopped,
    /// Server is running and listening.
    Running {
        /// Address the server is listening on.
        address: SocketAddr,
    },
    /// Server started but finished without being asked to stop.
    Crashed,
}

impl fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::Running { address } => write!(f, "Running on {address}"),
            Self::Crashed => write!(f, "Crashed"),
        }
    }
}

/// Error from supervisor operations.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// Server is already running.
    #[error("Gateway is already running on {0}")]
    AlreadyRunning(SocketAddr),

    /// Failed to bind to address.
    #[error("Failed to bind to {address}: {reason}")]
    BindFailed { address: String, reason: String },

    /// Server is not running.
    #[error("Gateway is not running")]
    NotRunning,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Supervisor for the gateway server thread.
///
/// # Example
///
/// ```ignore
/// let supervisor = GatewaySupervisor::new();
/// let addr = supervisor.start(Arc::new(config)).await?;
/// println!("Status: {}", supervisor.status().await);
/// supervisor.stop().await?;
/// ```
pub struct GatewaySupervisor {
    /// Internal state protected by async mutex.
    handle: Mutex<Option<ServerHandle>>,
}

impl Default for GatewaySupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewaySupervisor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Start the gateway server.
    ///
    /// Binds `config.host:config.port` first, then spawns the server thread
    /// and returns immediately with the bound address.
    ///
    /// # Errors
    ///
    /// Returns error if already running, if bind fails, or if the thread
    /// cannot be spawned.
    pub async fn start(&self, config: Arc<GatewayConfig>) -> Result<SocketAddr, SupervisorError> {
        let mut guard = self.handle.lock().await;

        if let Some(old) = guard.take() {
            if !old.thread.is_finished() {
                let addr = old.bound_addr;
                *guard = Some(old);
                return Err(SupervisorError::AlreadyRunning(addr));
            }
            // Finished, so join does not block.
            match old.thread.join() {
                Ok(Ok(())) => debug!("Previous gateway thread completed normally"),
                Ok(Err(e)) => warn!("Previous gateway thread ended with error: {e}"),
                Err(_) => warn!("Previous gateway thread panicked"),
            }
        }

        // Bind FIRST - get real address before spawning
        let bind_addr = config.bind_address();
        let listener =
            StdTcpListener::bind(&bind_addr).map_err(|e| SupervisorError::BindFailed {
                address: bind_addr.clone(),
                reason: e.to_string(),
            })?;
        listener
            .set_nonblocking(true)
            .map_err(|e| SupervisorError::Internal(format!("Failed to configure listener: {e}")))?;
        let bound_addr = listener
            .local_addr()
            .map_err(|e| SupervisorError::Internal(format!("Failed to get local address: {e}")))?;

        info!("Gateway bound to {bound_addr}");

        let cancel_token = CancellationToken::new();
        let cancel_clone = cancel_token.clone();

        let thread = thread::Builder::new()
            .name(SERVER_THREAD_NAME.to_string())
            .spawn(move || run_server(listener, config, cancel_clone))
            .map_err(|e| SupervisorError::Internal(format!("Failed to spawn gateway thread: {e}")))?;

        *guard = Some(ServerHandle {
            cancel_token,
            thread,
            bound_addr,
        });

        Ok(bound_addr)
    }

    /// Stop the gateway server.
    ///
    /// Signals shutdown and waits up to five seconds for the thread to
    /// finish. A thread still draining requests after that is detached.
    ///
    /// # Errors
    ///
    /// Returns error if not running, or if the server ended with an error,
    /// panicked or did not stop in time.
    pub async fn stop(&self) -> Result<(), SupervisorError> {
        let mut guard = self.handle.lock().await;

        let Some(handle) = guard.take() else {
            return Err(SupervisorError::NotRunning);
        };

        info!("Stopping gateway on {}", handle.bound_addr);

        handle.cancel_token.cancel();

        let thread = handle.thread;
        let join = tokio::task::spawn_blocking(move || thread.join());

        match tokio::time::timeout(STOP_TIMEOUT, join).await {
            Ok(Ok(Ok(Ok(())))) => {
                info!("Gateway stopped cleanly");
                Ok(())
            }
            Ok(Ok(Ok(Err(e)))) => {
                error!("Gateway thread ended with error: {e}");
                Err(SupervisorError::Internal(format!("Gateway error: {e}")))
            }
            Ok(Ok(Err(_))) => {
                error!("Gateway thread panicked");
                Err(SupervisorError::Internal("Gateway thread panicked".into()))
            }
            Ok(Err(join_err)) => {
                error!("Failed to wait for gateway thread: {join_err}");
                Err(SupervisorError::Internal(format!(
                    "Failed to wait for gateway thread: {join_err}"
                )))
            }
            Err(_) => {
                warn!("Gateway stop timed out; detaching thread while requests drain");
                Err(SupervisorError::Internal(
                    "Gateway stop timed out; thread detached".into(),
                ))
            }
        }
    }

    /// Get the current status of the gateway.
    ///
    /// - Clean stop (cancelled + finished) -> Stopped
    /// - Crash (not cancelled but finished) -> Crashed
    /// - Running (not finished) -> Running
    pub async fn status(&self) -> GatewayStatus {
        let mut guard = self.handle.lock().await;

        let Some(handle) = guard.as_ref() else {
            return GatewayStatus::Stopped;
        };

        if handle.thread.is_finished() {
            let was_cancelled = handle.cancel_token.is_cancelled();
            *guard = None;

            if was_cancelled {
                GatewayStatus::Stopped
            } else {
                warn!("Detected crashed gateway, cleaning up handle");
                GatewayStatus::Crashed
            }
        } else {
            GatewayStatus::Running {
                address: handle.bound_addr,
            }
        }
    }

    /// Get the bound address if running.
    pub async fn bound_address(&self) -> Option<SocketAddr> {
        let guard = self.handle.lock().await;
        guard
            .as_ref()
            .filter(|h| !h.thread.is_finished())
            .map(|h| h.bound_addr)
    }
}

impl fmt::Debug for GatewaySupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewaySupervisor").finish()
    }
}

/// Body of the server thread.
fn run_server(
    listener: StdTcpListener,
    config: Arc<GatewayConfig>,
    cancel: CancellationToken,
) -> AnyResult<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let listener = TcpListener::from_std(listener)?;
        debug!(addr = %listener.local_addr()?, "Gateway thread starting");
        oaibridge_proxy::serve(listener, config, cancel).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config(port: u16) -> Arc<GatewayConfig> {
        Arc::new(GatewayConfig {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port,
            ..GatewayConfig::default()
        })
    }

    #[tokio::test]
    async fn test_supervisor_lifecycle() {
        let supervisor = GatewaySupervisor::new();

        // Initially stopped
        assert_eq!(supervisor.status().await, GatewayStatus::Stopped);
        assert!(supervisor.bound_address().await.is_none());

        // Start on random port
        let addr = supervisor.start(local_config(0)).await.unwrap();
        assert_ne!(addr.port(), 0);

        match supervisor.status().await {
            GatewayStatus::Running { address } => assert_eq!(address, addr),
            other => panic!("Expected Running, got {other:?}"),
        }
        assert_eq!(supervisor.bound_address().await, Some(addr));

        // Can't start again
        assert!(matches!(
            supervisor.start(local_config(0)).await,
            Err(SupervisorError::AlreadyRunning(_))
        ));

        supervisor.stop().await.unwrap();
        assert_eq!(supervisor.status().await, GatewayStatus::Stopped);

        // Can't stop again
        assert!(matches!(
            supervisor.stop().await,
            Err(SupervisorError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let supervisor = GatewaySupervisor::new();

        let addr1 = supervisor.start(local_config(0)).await.unwrap();
        supervisor.stop().await.unwrap();

        let addr2 = supervisor.start(local_config(0)).await.unwrap();
        assert_ne!(addr1.port(), 0);
        assert_ne!(addr2.port(), 0);

        supervisor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let occupied = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let supervisor = GatewaySupervisor::new();
        assert!(matches!(
            supervisor.start(local_config(port)).await,
            Err(SupervisorError::BindFailed { .. })
        ));
        assert_eq!(supervisor.status().await, GatewayStatus::Stopped);
    }

    #[test]
    fn test_status_display() {
        let addr: SocketAddr = "127.0.0.1:8100".parse().unwrap();
        assert_eq!(GatewayStatus::Stopped.to_string(), "Stopped");
        assert_eq!(
            GatewayStatus::Running { address: addr }.to_string(),
            "Running on 127.0.0.1:8100"
        );
        assert_eq!(GatewayStatus::Crashed.to_string(), "Crashed");
    }
}
