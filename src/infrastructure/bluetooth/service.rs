//! Dispatcher Service Module
//!
//! Public face of the lamp link. Callers on any thread submit commands and
//! toggle the rainbow; a dedicated thread running a single-threaded tokio
//! runtime owns the transport and the send loop.

use crate::domain::animation::AnimationTicker;
use crate::domain::error::DispatchError;
use crate::domain::lamp::CommandSink;
use crate::domain::models::{AppEvent, Command};
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::connection::ConnectionManager;
use crate::infrastructure::bluetooth::queue::{AnimationFlag, CommandQueue};
use crate::infrastructure::bluetooth::transport::Transport;
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

pub struct Dispatcher {
    queue: Arc<CommandQueue>,
    animation: AnimationFlag,
    shutdown_tx: watch::Sender<bool>,
    event_sender: mpsc::UnboundedSender<AppEvent>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Start the send loop on its own thread.
    ///
    /// Status changes and log lines are reported on `event_sender`.
    pub fn start<T>(
        transport: T,
        settings: &Settings,
        event_sender: mpsc::UnboundedSender<AppEvent>,
    ) -> Result<Self>
    where
        T: Transport + Send + 'static,
    {
        let animation = AnimationFlag::default();
        let queue = Arc::new(CommandQueue::new(animation.clone()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime for the lamp link")?;

        let loop_queue = queue.clone();
        let loop_animation = animation.clone();
        let loop_events = event_sender.clone();
        let ticker = AnimationTicker::new(settings.animation_speed);
        let timings = settings.timings;

        let worker = std::thread::Builder::new()
            .name("lamp-link".into())
            .spawn(move || {
                let manager = ConnectionManager::new(
                    transport,
                    loop_queue,
                    loop_animation,
                    ticker,
                    timings,
                    shutdown_rx,
                    loop_events,
                );
                runtime.block_on(manager.run());
            })
            .context("Failed to spawn lamp link thread")?;

        info!("Lamp dispatcher started");

        Ok(Self {
            queue,
            animation,
            shutdown_tx,
            event_sender,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queue a command given in hex form, e.g. `submit("01", "080501", true)`
    pub fn submit(&self, mode: &str, body: &str, forced: bool) -> Result<(), DispatchError> {
        let command = Command::from_hex(mode, body, forced)?;
        self.send(command)
    }

    /// Queue a typed command. Stops a running animation.
    pub fn send(&self, command: Command) -> Result<(), DispatchError> {
        debug!("Queued {}", command);
        let enqueued = self.queue.enqueue(command)?;
        if enqueued.interrupted_animation {
            info!("Rainbow stopped by user command");
            let _ = self.event_sender.send(AppEvent::AnimationChanged(false));
        }
        Ok(())
    }

    /// Turn the rainbow on or off. Frames are produced lazily by the send loop.
    pub fn set_animation(&self, active: bool) {
        if self.animation.is_active() != active {
            info!("Rainbow {}", if active { "started" } else { "stopped" });
            self.animation.set(active);
            let _ = self.event_sender.send(AppEvent::AnimationChanged(active));
        }
    }

    pub fn is_animation_active(&self) -> bool {
        self.animation.is_active()
    }

    /// Stop the send loop and close the lamp session. Safe to call repeatedly.
    pub fn shutdown(&self) {
        if self.queue.close() {
            info!("Shutting down lamp dispatcher");
        }
        let _ = self.shutdown_tx.send(true);

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                error!("Lamp link thread panicked");
            }
        }
    }
}

impl CommandSink for Dispatcher {
    fn send(&self, command: Command) -> Result<(), DispatchError> {
        Dispatcher::send(self, command)
    }

    fn set_animation(&self, active: bool) {
        Dispatcher::set_animation(self, active)
    }

    fn is_animation_active(&self) -> bool {
        Dispatcher::is_animation_active(self)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
