//! Session controller: acquisition, polling and command handling

use crate::config::{AcquisitionConfig, PollingConfig};
use crate::core::types::{MemoryError, Width};
use crate::memory::{MainRamScanner, TargetRegion, MAIN_RAM_START};
use crate::protocol::{Command, ErrorCode, OutboundMessage};
use crate::session::context::{Selection, SessionContext};
use crate::transport::{TransportEvent, TransportHandle};
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Drives one session
#[derive(Clone)]
pub struct SessionController {
    context: Arc<SessionContext>,
    transport: TransportHandle,
    acquisition: AcquisitionConfig,
    polling: PollingConfig,
    shutdown: CancellationToken,
    /// When the last full snapshot was built, by the poll loop or a resync
    last_full: Arc<Mutex<Option<Instant>>>,
}

impl SessionController {
    pub fn new(
        context: Arc<SessionContext>,
        transport: TransportHandle,
        acquisition: AcquisitionConfig,
        polling: PollingConfig,
        shutdown: CancellationToken,
    ) -> Self {
        SessionController {
            context,
            transport,
            acquisition,
            polling,
            shutdown,
            last_full: Arc::new(Mutex::new(None)),
        }
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    /// Run acquisition, polling and event handling until shutdown
    pub async fn run(self, events: mpsc::Receiver<TransportEvent>) {
        let acquisition = tokio::spawn({
            let controller = self.clone();
            async move { controller.acquire().await }
        });
        let polling = tokio::spawn({
            let controller = self.clone();
            async move { controller.poll().await }
        });

        self.handle_events(events).await;

        if let Err(e) = acquisition.await {
            warn!("Acquisition task ended abnormally: {}", e);
        }
        if let Err(e) = polling.await {
            warn!("Polling task ended abnormally: {}", e);
        }
    }

    /// Locate main RAM: grace period, then bounded scan attempts
    pub async fn acquire(&self) -> Option<TargetRegion> {
        let grace = self.acquisition.grace_period();
        info!("Waiting {:?} for the host to finish loading", grace);
        tokio::select! {
            _ = self.shutdown.cancelled() => return None,
            _ = tokio::time::sleep(grace) => {}
        }

        let attempts = self.acquisition.attempts;
        for attempt in 1..=attempts {
            if self.shutdown.is_cancelled() {
                return None;
            }
            info!("Scanning for main RAM (attempt {}/{})", attempt, attempts);

            let host = self.context.host();
            let options = self.acquisition.scan_options();
            let scan = tokio::task::spawn_blocking(move || {
                MainRamScanner::with_options(host.as_ref(), options).scan()
            });

            let outcome = tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                outcome = scan => outcome,
            };
            match outcome {
                Ok(Ok(Some(region))) => {
                    self.on_acquired(region).await;
                    return Some(region);
                }
                Ok(Ok(None)) => debug!("Main RAM not found on attempt {}", attempt),
                Ok(Err(e)) => warn!("Scan attempt {} failed: {}", attempt, e),
                Err(e) => warn!("Scan task failed: {}", e),
            }

            if attempt < attempts {
                tokio::select! {
                    _ = self.shutdown.cancelled() => return None,
                    _ = tokio::time::sleep(self.acquisition.retry_interval()) => {}
                }
            }
        }

        error!("Main RAM not found after {} attempts", attempts);
        self.context.mark_acquisition_failed();
        if self.transport.is_connected() {
            self.reply_error(ErrorCode::MainramNotFound, "Main RAM not found")
                .await;
        }
        None
    }

    async fn on_acquired(&self, region: TargetRegion) {
        if !self.context.set_target(region) {
            return;
        }
        info!("Main RAM found at {} ({:?})", region, region.kind);

        let dump = self
            .context
            .main_ram()
            .map(|ram| ram.dump(MAIN_RAM_START, self.acquisition.dump_bytes));
        if let Some(dump) = dump {
            info!("0x{:08X}: {}", MAIN_RAM_START, dump);
        }

        if self.transport.is_connected() {
            self.send_status().await;
        }
    }

    /// Poll/notify loop; starts once main RAM is located and a variant selected
    pub async fn poll(&self) {
        tokio::select! {
            _ = self.shutdown.cancelled() => return,
            _ = self.context.wait_ready() => {}
        }
        info!(
            "Polling {} values every {:?}",
            self.context.registry().len(),
            self.polling.interval()
        );

        let mut ticker = tokio::time::interval(self.polling.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            self.transport
                .send_built(|| {
                    let mut registry = self.context.registry();
                    if let Some(ram) = self.context.main_ram() {
                        registry.update(&ram);
                    }

                    let message = if self.resync_due() {
                        self.mark_full();
                        Some(OutboundMessage::full(&registry))
                    } else {
                        OutboundMessage::delta(&registry)
                    };
                    if message.is_some() {
                        registry.reset_change_flags();
                    }
                    message
                })
                .await;
        }
    }

    /// Whether the periodic full snapshot is due
    pub fn resync_due(&self) -> bool {
        let last_full = *self
            .last_full
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        last_full.map_or(true, |at| at.elapsed() >= self.polling.full_resync())
    }

    fn mark_full(&self) {
        *self
            .last_full
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());
    }

    async fn handle_events(&self, mut events: mpsc::Receiver<TransportEvent>) {
        loop {
            let event = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Some(event) => self.handle_event(event).await,
                None => break,
            }
        }
    }

    pub async fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                let count = self.context.registry().len();
                self.transport.send(&OutboundMessage::hello(count)).await;
                self.send_status().await;
                if self.context.variant().is_some() {
                    self.send_full_resync().await;
                }
            }
            TransportEvent::Message(frame) => match Command::decode(&frame) {
                Some(command) => self.handle_command(command).await,
                None => warn!("Discarding malformed frame: {}", frame),
            },
            TransportEvent::Disconnected => {
                debug!("Client left while {}", self.context.state());
            }
        }
    }

    pub async fn handle_command(&self, command: Command) {
        debug!("Handling {}", command.name());

        match command {
            Command::Ping => {
                self.transport.send(&OutboundMessage::pong(now_millis())).await;
            }
            Command::Refresh => {
                self.send_status().await;
                if self.context.variant().is_some() {
                    self.send_full_resync().await;
                }
            }
            Command::Write { target, value } => {
                if let Err((code, msg)) = self.write_value(target.as_deref(), value) {
                    self.reply_error(code, msg).await;
                }
            }
            Command::Add { target, amount } => {
                if let Err((code, msg)) = self.add_value(target.as_deref(), amount) {
                    self.reply_error(code, msg).await;
                }
            }
            Command::SelectVariant { target } => {
                let Some(tag) = target else {
                    self.reply_error(ErrorCode::UnknownTarget, "Missing variant tag")
                        .await;
                    return;
                };
                match self.context.select_variant(&tag) {
                    Selection::Selected { tag, count } => {
                        info!("Variant {} selected, tracking {} values", tag, count);
                    }
                    Selection::AlreadySelected { current } => {
                        info!("Ignoring selection of {}: {} already selected", tag, current);
                    }
                    Selection::Unknown => {
                        self.reply_error(
                            ErrorCode::UnknownTarget,
                            format!("Unknown variant: {}", tag),
                        )
                        .await;
                    }
                }
            }
            Command::Unknown(cmd) => {
                self.reply_error(ErrorCode::UnknownCmd, format!("Unknown command: {}", cmd))
                    .await;
            }
        }
    }

    /// Store `value` into a tracked value
    fn write_value(&self, target: Option<&str>, value: Option<i64>) -> Result<(), (ErrorCode, String)> {
        let (address, width) = self.resolve(target)?;
        let ram = self.context.main_ram().ok_or_else(main_ram_missing)?;

        let value = value
            .filter(|v| (0..=i64::from(width.value_mask())).contains(v))
            .ok_or_else(|| {
                (
                    ErrorCode::WriteFailed,
                    format!("Value missing or out of range for a {}-byte value", width.bytes()),
                )
            })? as u32;

        ram.write(address, width, value)
            .map_err(|e| (ErrorCode::WriteFailed, e.to_string()))?;
        info!("Wrote {} to 0x{:08X}", value, address);
        Ok(())
    }

    /// Add a signed amount to a tracked value, wrapping within its width
    fn add_value(&self, target: Option<&str>, amount: Option<i64>) -> Result<(), (ErrorCode, String)> {
        let (address, width) = self.resolve(target)?;
        let ram = self.context.main_ram().ok_or_else(main_ram_missing)?;
        let amount = amount
            .ok_or_else(|| (ErrorCode::WriteFailed, "Missing amount".to_string()))?;

        let current = ram
            .read(address, width)
            .map_err(|e| (ErrorCode::WriteFailed, e.to_string()))?;
        let updated = (i64::from(current).wrapping_add(amount) as u32) & width.value_mask();

        ram.write(address, width, updated)
            .map_err(|e| (ErrorCode::WriteFailed, e.to_string()))?;
        info!("Added {} at 0x{:08X}: {} -> {}", amount, address, current, updated);
        Ok(())
    }

    fn resolve(&self, target: Option<&str>) -> Result<(u32, Width), (ErrorCode, String)> {
        let name = target
            .ok_or_else(|| (ErrorCode::UnknownTarget, "Missing target".to_string()))?;
        self.context
            .registry()
            .find_by_name(name)
            .map(|value| (value.address, value.width))
            .ok_or_else(|| (ErrorCode::UnknownTarget, format!("Unknown target: {}", name)))
    }

    async fn send_status(&self) {
        let status =
            OutboundMessage::status(self.transport.is_connected(), self.context.target_base());
        self.transport.send(&status).await;
    }

    /// Push every value read so far and acknowledge the current state
    async fn send_full_resync(&self) {
        self.transport
            .send_built(|| {
                let mut registry = self.context.registry();
                self.mark_full();
                let message = OutboundMessage::full(&registry);
                registry.reset_change_flags();
                Some(message)
            })
            .await;
    }

    async fn reply_error(&self, code: ErrorCode, msg: impl Into<String>) {
        let msg = msg.into();
        debug!("Replying {:?}: {}", code, msg);
        self.transport.send(&OutboundMessage::error(code, msg)).await;
    }
}

fn main_ram_missing() -> (ErrorCode, String) {
    (
        ErrorCode::MainramNotFound,
        MemoryError::TargetNotAcquired.to_string(),
    )
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
