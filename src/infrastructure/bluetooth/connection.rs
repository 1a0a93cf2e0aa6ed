//! BLE Connection Module
//!
//! Owns the only session with the lamp and runs the send loop:
//!
//! ```text
//!                connect ok
//!  Disconnected ──► Connecting ──────────► Connected ──┐ command / frame
//!       ▲               │                      │  ▲    │
//!       │  fail/timeout │ (2 s backoff)        │  └────┘
//!       └───────────────┘                      │
//!       └──────────────────────────────────────┘ write failure / link lost
//! ```
//!
//! Every write goes through this loop, so writes are strictly serialized.

use crate::domain::animation::AnimationTicker;
use crate::domain::error::TransportError;
use crate::domain::models::{AppEvent, Command, ConnectionState, MessageSeverity, StatusMessage};
use crate::domain::settings::LinkTimings;
use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::queue::{AnimationFlag, BrightnessThrottle, CommandQueue, Recv};
use crate::infrastructure::bluetooth::transport::{Session, Transport};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

pub struct ConnectionManager<T: Transport> {
    transport: T,
    session: Option<T::Session>,
    state: ConnectionState,
    queue: Arc<CommandQueue>,
    animation: AnimationFlag,
    ticker: AnimationTicker,
    throttle: BrightnessThrottle,
    timings: LinkTimings,
    shutdown: watch::Receiver<bool>,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(
        transport: T,
        queue: Arc<CommandQueue>,
        animation: AnimationFlag,
        ticker: AnimationTicker,
        timings: LinkTimings,
        shutdown: watch::Receiver<bool>,
        event_sender: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            transport,
            session: None,
            state: ConnectionState::Disconnected,
            queue,
            animation,
            ticker,
            throttle: BrightnessThrottle::new(timings.brightness_throttle()),
            timings,
            shutdown,
            event_sender,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Run until shutdown is signalled, then close the session
    pub async fn run(mut self) {
        info!("Lamp send loop started");

        loop {
            if self.shutdown_requested() {
                break;
            }
            if !self.ensure_session().await {
                continue;
            }

            let timeout = self.timings.poll_timeout(self.animation.is_active());
            let received = tokio::select! {
                received = self.queue.recv(timeout) => received,
                _ = shutdown_signalled(&mut self.shutdown) => Recv::Closed,
            };

            match received {
                Recv::Command(command) => self.handle_command(command).await,
                Recv::TimedOut => {
                    if self.animation.is_active() {
                        let frame = self.ticker.next_frame();
                        self.write(&frame).await;
                    }
                }
                Recv::Closed => break,
            }
        }

        self.teardown().await;
        info!("Lamp send loop stopped");
    }

    /// Make sure a live session exists, connecting if needed.
    ///
    /// Returns false when the caller should start the next iteration, either
    /// because the attempt failed (after the backoff) or shutdown arrived.
    async fn ensure_session(&mut self) -> bool {
        if let Some(session) = &self.session {
            if session.is_connected().await {
                return true;
            }
            warn!("Lamp link is no longer live");
            self.drop_session().await;
        }

        self.set_state(ConnectionState::Connecting);

        let connect_timeout = self.timings.connect_timeout();
        let attempt = tokio::time::timeout(connect_timeout, self.transport.connect());
        let outcome = tokio::select! {
            outcome = attempt => Some(outcome),
            _ = shutdown_signalled(&mut self.shutdown) => None,
        };

        let result = match outcome {
            Some(Ok(result)) => result,
            Some(Err(_)) => {
                self.transport.abandon().await;
                Err(TransportError::Timeout(connect_timeout))
            }
            None => {
                self.transport.abandon().await;
                return false;
            }
        };

        match result {
            Ok(session) => {
                self.session = Some(session);
                self.set_state(ConnectionState::Connected);
                self.send_log("Lamp connected", MessageSeverity::Success);
                true
            }
            Err(e) => {
                warn!("{}", e);
                self.set_state(ConnectionState::Disconnected);
                self.send_log(&e.to_string(), MessageSeverity::Warning);
                self.backoff().await;
                false
            }
        }
    }

    /// Fixed delay before the next connect attempt, cut short by shutdown
    async fn backoff(&mut self) {
        let delay = self.timings.reconnect_backoff();
        debug!("Retrying connection in {:?}", delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_signalled(&mut self.shutdown) => {}
        }
    }

    async fn handle_command(&mut self, command: Command) {
        let now = Instant::now();
        if !self.throttle.admit(&command, now) {
            debug!("Dropped throttled brightness update {}", command);
            return;
        }

        if self.write(&command).await {
            self.throttle.record_sent(&command, now);
            tokio::time::sleep(self.timings.send_spacing()).await;
        }
    }

    /// Frame and write one command. A failed write drops the session.
    async fn write(&mut self, command: &Command) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        let packet = protocol::frame(command);
        trace!("TX {}", protocol::to_hex(&packet));

        match session.write(&packet).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send {}: {}", command, e);
                self.send_log(&e.to_string(), MessageSeverity::Error);
                self.drop_session().await;
                false
            }
        }
    }

    async fn drop_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
        self.set_state(ConnectionState::Disconnected);
    }

    async fn teardown(&mut self) {
        let dropped = self.queue.clear();
        if dropped > 0 {
            info!("Discarding {} queued command(s) on shutdown", dropped);
        }
        self.drop_session().await;
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow() || self.queue.is_closed()
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        info!("Connection state: {:?} -> {:?}", self.state, state);
        self.state = state;
        let _ = self.event_sender.send(AppEvent::ConnectionStatus(state));
    }

    fn send_log(&self, message: &str, severity: MessageSeverity) {
        let _ = self.event_sender.send(AppEvent::LogMessage(StatusMessage {
            message: message.to_string(),
            severity,
        }));
    }
}

/// Resolves once shutdown is requested or the signal's sender is gone
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
