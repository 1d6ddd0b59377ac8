//! Embeddable bridge handle
//!
//! Owns a dedicated runtime so a host process can start the bridge from any
//! thread and stop it again with bounded teardown.

use crate::config::{validate_config, Config};
use crate::logging;
use crate::memory::HostMemory;
use crate::process::HostProcess;
use crate::session::{build_context, run_session, SessionContext};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

/// A running bridge
pub struct Bridge {
    runtime: Option<Runtime>,
    shutdown: CancellationToken,
    context: Arc<SessionContext>,
    stop_timeout: Duration,
    /// Flushes the log file once the runtime is gone
    _log_guard: Option<WorkerGuard>,
}

impl Bridge {
    /// Start against the current process
    pub fn start(config: Config) -> Result<Self> {
        Self::start_with_host(config, Arc::new(HostProcess::current()))
    }

    /// Start against an arbitrary host memory implementation
    pub fn start_with_host(config: Config, host: Arc<dyn HostMemory>) -> Result<Self> {
        validate_config(&config).context("invalid configuration")?;
        let log_guard = logging::init(&config.logging)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("mainram-bridge")
            .build()
            .context("failed to build the bridge runtime")?;

        let shutdown = CancellationToken::new();
        let context = build_context(&config, host);
        let stop_timeout = config.transport.stop_timeout();

        runtime.spawn(run_session(config, Arc::clone(&context), shutdown.clone()));
        info!("Bridge started");

        Ok(Bridge {
            runtime: Some(runtime),
            shutdown,
            context,
            stop_timeout,
            _log_guard: log_guard,
        })
    }

    /// Shared state of the running session
    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    /// Token that stops the bridge when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Block the calling thread until the bridge is asked to stop
    pub fn wait(&self) {
        if let Some(runtime) = &self.runtime {
            runtime.block_on(self.shutdown.cancelled());
        }
    }

    /// Stop every task, waiting at most the configured timeout
    pub fn stop(mut self) {
        self.shutdown_runtime();
    }

    fn shutdown_runtime(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            self.shutdown.cancel();
            runtime.shutdown_timeout(self.stop_timeout);
            info!("Bridge stopped");
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown_runtime();
    }
}
