//! Session wiring
//!
//! A session is one transport server plus one controller sharing a
//! [`SessionContext`]. [`run_session`] drives it on the caller's runtime;
//! [`Bridge`] owns a runtime of its own for embedding in a host process.

pub mod bridge;
pub mod context;
pub mod controller;

pub use bridge::Bridge;
pub use context::{Selection, SessionContext, SessionState};
pub use controller::SessionController;

use crate::config::Config;
use crate::memory::HostMemory;
use crate::registry::VariantCatalog;
use crate::transport::{Endpoint, TransportServer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Build the shared context for `config`
pub fn build_context(config: &Config, host: Arc<dyn HostMemory>) -> Arc<SessionContext> {
    let catalog = VariantCatalog::with_tables(config.variants.iter().cloned());
    Arc::new(SessionContext::new(host, catalog))
}

/// Serve one session until `shutdown` is cancelled
pub async fn run_session(
    config: Config,
    context: Arc<SessionContext>,
    shutdown: CancellationToken,
) {
    let endpoint = Endpoint::new(config.transport.endpoint.clone());
    let (server, events) = TransportServer::new(
        endpoint,
        config.transport.retry_interval(),
        shutdown.clone(),
    );
    let controller = SessionController::new(
        context,
        server.handle(),
        config.acquisition.clone(),
        config.polling.clone(),
        shutdown.clone(),
    );

    info!(
        "Session started; variants available: {}",
        controller.context().catalog().tags().collect::<Vec<_>>().join(", ")
    );

    let server = tokio::spawn(server.run());
    controller.run(events).await;

    if let Err(e) = server.await {
        warn!("Transport task ended abnormally: {}", e);
    }
    info!("Session ended");
}
