//! Shutdown handling shared by the long-running tasks.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Owns the cancellation token observed by the monitor and the scheduler.
#[derive(Debug, Clone, Default)]
pub struct RunController {
    token: CancellationToken,
}

impl RunController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Token cancelled with this controller but cancellable on its own.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("Shutdown requested");
            self.token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel on Ctrl+C.
    pub fn shutdown_on_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!("Could not listen for Ctrl+C: {}", e);
                        return;
                    }
                    controller.shutdown();
                }
                _ = controller.token.cancelled() => {}
            }
        })
    }
}
