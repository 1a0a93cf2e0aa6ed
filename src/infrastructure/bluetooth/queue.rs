//! Command Queue Module
//!
//! Decouples producers (terminal, hotkeys, timers) from the single send loop.
//! Producers push from any thread and never block; the send loop pops with a
//! bounded wait and collapses runs of brightness updates to the latest one.

use crate::domain::error::DispatchError;
use crate::domain::models::Command;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

/// Rainbow mode flag shared between the dispatcher, the queue and the send loop
#[derive(Debug, Clone, Default)]
pub struct AnimationFlag(Arc<AtomicBool>);

impl AnimationFlag {
    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, active: bool) {
        self.0.store(active, Ordering::Release);
    }

    /// Turn the animation off, returning whether it was running
    pub fn interrupt(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Outcome of a successful enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enqueued {
    /// The command stopped a running animation
    pub interrupted_animation: bool,
}

/// Result of waiting on the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recv {
    Command(Command),
    TimedOut,
    Closed,
}

pub struct CommandQueue {
    items: Mutex<VecDeque<Command>>,
    available: Notify,
    closed: AtomicBool,
    animation: AnimationFlag,
}

impl CommandQueue {
    pub fn new(animation: AnimationFlag) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            closed: AtomicBool::new(false),
            animation,
        }
    }

    /// Append to the tail. Never blocks; fails only after `close`.
    pub fn enqueue(&self, command: Command) -> Result<Enqueued, DispatchError> {
        if self.is_closed() {
            return Err(DispatchError::QueueClosed);
        }

        self.lock().push_back(command);
        self.available.notify_one();

        Ok(Enqueued {
            interrupted_animation: self.animation.interrupt(),
        })
    }

    /// Pop the head, folding any directly following brightness updates into it.
    ///
    /// A non-brightness item ends the scan and stays at the front, so only
    /// adjacent brightness updates are ever merged.
    pub fn dequeue_coalesced(&self) -> Option<Command> {
        let mut items = self.lock();
        let mut head = items.pop_front()?;

        while let Some(next) = items.pop_front() {
            if head.is_brightness() && next.is_brightness() {
                debug!("Coalesced brightness update {} into {}", head, next);
                // a forced level keeps its throttle exemption through the merge
                head = if head.is_forced() { next.forced() } else { next };
            } else {
                items.push_front(next);
                break;
            }
        }

        Some(head)
    }

    /// Wait up to `timeout` for the next coalesced command
    pub async fn recv(&self, timeout: Duration) -> Recv {
        let deadline = Instant::now() + timeout;

        loop {
            if self.is_closed() {
                return Recv::Closed;
            }
            if let Some(command) = self.dequeue_coalesced() {
                return Recv::Command(command);
            }
            // notify_one keeps a permit when nobody is waiting, so an enqueue
            // between the check above and this await is not lost
            if tokio::time::timeout_at(deadline, self.available.notified())
                .await
                .is_err()
            {
                return Recv::TimedOut;
            }
        }
    }

    /// Reject further commands and wake the consumer. Returns false if
    /// already closed.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.available.notify_one();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop everything still queued, returning how many were dropped
    pub fn clear(&self) -> usize {
        let mut items = self.lock();
        let dropped = items.len();
        items.clear();
        dropped
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Command>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drops slider-style brightness updates that arrive too soon after the
/// previous brightness write. Owned by the send loop only.
#[derive(Debug, Clone)]
pub struct BrightnessThrottle {
    window: Duration,
    last_sent: Option<Instant>,
}

impl BrightnessThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sent: None,
        }
    }

    /// Whether `command` may be written at `now`
    pub fn admit(&self, command: &Command, now: Instant) -> bool {
        if !command.is_brightness() || command.is_forced() {
            return true;
        }
        match self.last_sent {
            Some(last) => now.saturating_duration_since(last) >= self.window,
            None => true,
        }
    }

    /// Only slider-style writes open a new window; forced levels do not
    pub fn record_sent(&mut self, command: &Command, now: Instant) {
        if command.is_brightness() && !command.is_forced() {
            self.last_sent = Some(now);
        }
    }
}
