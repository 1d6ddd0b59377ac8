//! Platform listening endpoint

use std::io;

#[cfg(unix)]
use std::path::PathBuf;
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
#[cfg(windows)]
use tokio::net::windows::named_pipe::{NamedPipeServer, ServerOptions};
#[cfg(unix)]
use tracing::{debug, warn};

/// Base name of the endpoint the client looks for
pub const ENDPOINT_NAME: &str = "ssr3_viewer";

/// A connected client stream
#[cfg(unix)]
pub type Connection = UnixStream;
#[cfg(windows)]
pub type Connection = NamedPipeServer;

/// Default endpoint: `\\.\pipe\ssr3_viewer`
#[cfg(windows)]
pub fn default_endpoint() -> String {
    format!(r"\\.\pipe\{}", ENDPOINT_NAME)
}

/// Default endpoint: `$XDG_RUNTIME_DIR/ssr3_viewer.sock`, falling back to `/tmp`
#[cfg(unix)]
pub fn default_endpoint() -> String {
    let dir = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    dir.join(format!("{}.sock", ENDPOINT_NAME))
        .to_string_lossy()
        .into_owned()
}

/// Listening endpoint accepting one client at a time
pub struct Endpoint {
    name: String,
    #[cfg(unix)]
    listener: Option<UnixListener>,
}

impl Endpoint {
    pub fn new(name: impl Into<String>) -> Self {
        Endpoint {
            name: name.into(),
            #[cfg(unix)]
            listener: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the next client
    #[cfg(unix)]
    pub async fn accept(&mut self) -> io::Result<Connection> {
        let listener = match &mut self.listener {
            Some(listener) => listener,
            slot => slot.insert(bind(&self.name)?),
        };
        let (stream, _) = listener.accept().await?;
        Ok(stream)
    }

    /// Wait for the next client on a fresh single-instance pipe
    #[cfg(windows)]
    pub async fn accept(&mut self) -> io::Result<Connection> {
        let server = ServerOptions::new()
            .first_pipe_instance(true)
            .max_instances(1)
            .create(&self.name)?;
        server.connect().await?;
        Ok(server)
    }
}

#[cfg(unix)]
fn bind(path: &str) -> io::Result<UnixListener> {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed stale socket {}", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    UnixListener::bind(path)
}

#[cfg(unix)]
impl Drop for Endpoint {
    fn drop(&mut self) {
        if self.listener.take().is_some() {
            if let Err(e) = std::fs::remove_file(&self.name) {
                warn!("Failed to remove socket {}: {}", self.name, e);
            }
        }
    }
}
