//! Accept loop, reader task and the serialized send path

use crate::protocol::{CodecError, FrameCodec, OutboundMessage};
use crate::transport::endpoint::{Connection, Endpoint};
use futures_util::{SinkExt, StreamExt};
use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 64;

/// Errors raised on the active connection; all of them end it
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("no client connected")]
    NotConnected,
}

/// Events published by the transport, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Message(String),
    Disconnected,
}

/// Connection lifecycle as seen by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected,
    /// Endpoint is up, waiting for a client
    Connecting,
    Connected,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

type FrameSink = FramedWrite<WriteHalf<Connection>, FrameCodec>;

struct ActiveWriter {
    sink: FrameSink,
    /// Ends the connection's reader task
    connection: CancellationToken,
}

/// Cloneable send side of the transport
#[derive(Clone)]
pub struct TransportHandle {
    writer: Arc<Mutex<Option<ActiveWriter>>>,
    state: Arc<AtomicU8>,
    shutdown: CancellationToken,
}

impl TransportHandle {
    fn new(shutdown: CancellationToken) -> Self {
        TransportHandle {
            writer: Arc::new(Mutex::new(None)),
            state: Arc::new(AtomicU8::new(ConnectionState::Disconnected as u8)),
            shutdown,
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether a client is currently attached
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Send a message. Returns `false` when no client is attached or the write failed.
    pub async fn send(&self, message: &OutboundMessage) -> bool {
        match message.to_frame() {
            Ok(frame) => self.send_frame(&frame).await,
            Err(e) => {
                warn!("Failed to serialize outbound message: {}", e);
                false
            }
        }
    }

    /// Build a message and send it without another send in between.
    ///
    /// `build` runs with the writer held, whether or not a client is attached,
    /// so messages leave in the order they were built.
    pub async fn send_built<F>(&self, build: F) -> bool
    where
        F: FnOnce() -> Option<OutboundMessage>,
    {
        let mut guard = self.writer.lock().await;
        let Some(message) = build() else {
            return false;
        };
        match message.to_frame() {
            Ok(frame) => sent(Self::write_locked(&mut guard, &self.shutdown, &frame).await),
            Err(e) => {
                warn!("Failed to serialize outbound message: {}", e);
                false
            }
        }
    }

    /// Send one pre-serialized frame
    pub async fn send_frame(&self, frame: &str) -> bool {
        let mut guard = self.writer.lock().await;
        sent(Self::write_locked(&mut guard, &self.shutdown, frame).await)
    }

    async fn write_locked(
        guard: &mut MutexGuard<'_, Option<ActiveWriter>>,
        shutdown: &CancellationToken,
        frame: &str,
    ) -> Result<(), TransportError> {
        let active = guard.as_mut().ok_or(TransportError::NotConnected)?;

        let result = tokio::select! {
            _ = shutdown.cancelled() => Err(TransportError::NotConnected),
            written = active.sink.send(frame) => written.map_err(TransportError::from),
        };

        if let Err(TransportError::Codec(_)) = &result {
            if let Some(active) = guard.take() {
                active.connection.cancel();
            }
        }
        result
    }

    async fn attach(&self, sink: FrameSink, connection: CancellationToken) {
        *self.writer.lock().await = Some(ActiveWriter { sink, connection });
        self.set_state(ConnectionState::Connected);
    }

    async fn detach(&self) {
        self.set_state(ConnectionState::Disconnected);
        if let Some(mut active) = self.writer.lock().await.take() {
            let _ = SinkExt::<&str>::close(&mut active.sink).await;
        }
    }
}

fn sent(result: Result<(), TransportError>) -> bool {
    match result {
        Ok(()) => true,
        Err(TransportError::NotConnected) => false,
        Err(e) => {
            warn!("Send failed, dropping connection: {}", e);
            false
        }
    }
}

/// Single-client server loop
pub struct TransportServer {
    endpoint: Endpoint,
    handle: TransportHandle,
    events: mpsc::Sender<TransportEvent>,
    retry_interval: Duration,
    shutdown: CancellationToken,
}

impl TransportServer {
    /// Create a server and return it with the event receiver
    pub fn new(
        endpoint: Endpoint,
        retry_interval: Duration,
        shutdown: CancellationToken,
    ) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let server = TransportServer {
            endpoint,
            handle: TransportHandle::new(shutdown.clone()),
            events: tx,
            retry_interval,
            shutdown,
        };
        (server, rx)
    }

    /// The send side, usable from any task
    pub fn handle(&self) -> TransportHandle {
        self.handle.clone()
    }

    /// Serve clients one after another until shutdown
    pub async fn run(mut self) {
        info!("Transport listening on {}", self.endpoint.name());

        while !self.shutdown.is_cancelled() {
            self.handle.set_state(ConnectionState::Connecting);
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.endpoint.accept() => accepted,
            };

            match accepted {
                Ok(connection) => self.serve(connection).await,
                Err(e) => {
                    warn!(
                        "Endpoint {} unavailable, retrying in {:?}: {}",
                        self.endpoint.name(),
                        self.retry_interval,
                        e
                    );
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.retry_interval) => {}
                    }
                }
            }
        }

        self.handle.detach().await;
        info!("Transport stopped");
    }

    async fn serve(&self, connection: Connection) {
        info!("Client connected");
        let (read_half, write_half) = tokio::io::split(connection);
        let connection_token = self.shutdown.child_token();

        self.handle
            .attach(
                FramedWrite::new(write_half, FrameCodec::new()),
                connection_token.clone(),
            )
            .await;
        let _ = self.events.send(TransportEvent::Connected).await;

        let reader = tokio::spawn(read_frames(
            FramedRead::new(read_half, FrameCodec::new()),
            self.events.clone(),
            connection_token.clone(),
        ));
        if let Err(e) = reader.await {
            warn!("Reader task ended abnormally: {}", e);
        }

        connection_token.cancel();
        self.handle.detach().await;
        let _ = self.events.send(TransportEvent::Disconnected).await;
        info!("Client disconnected");
    }
}

async fn read_frames(
    mut frames: FramedRead<ReadHalf<Connection>, FrameCodec>,
    events: mpsc::Sender<TransportEvent>,
    connection: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            _ = connection.cancelled() => break,
            next = frames.next() => next,
        };

        match next {
            Some(Ok(frame)) => {
                debug!("Received frame: {}", frame);
                if events.send(TransportEvent::Message(frame)).await.is_err() {
                    break;
                }
            }
            Some(Err(e)) => {
                warn!("Read failed: {}", e);
                break;
            }
            None => break,
        }
    }
}
