//! BLE Transport Boundary
//!
//! The connection manager only knows these two traits. Platform back ends
//! (WinRT on Windows, btleplug elsewhere) and the scripted test transport
//! implement them. A `Session` is dropped on any failure and a fresh one is
//! requested from the `Transport`.
//!
//! The send loop runs on its own single-threaded runtime, so the returned
//! futures do not need to be `Send`.

#![allow(async_fn_in_trait)]

use crate::domain::error::TransportError;

/// Factory for sessions with one fixed lamp
pub trait Transport {
    type Session: Session;

    /// Open a session. The caller applies the connect timeout.
    async fn connect(&mut self) -> Result<Self::Session, TransportError>;

    /// Undo side effects of a `connect` future that was dropped before it
    /// finished, e.g. an adapter left scanning.
    async fn abandon(&mut self) {}
}

/// A live link to the lamp's command characteristic
pub trait Session {
    /// Whether the BLE stack still reports the link as up
    async fn is_connected(&self) -> bool;

    /// Write one packet to the command characteristic
    async fn write(&mut self, packet: &[u8]) -> Result<(), TransportError>;

    /// Tear the link down
    async fn close(self);
}

#[cfg(test)]
pub(crate) mod scripted {
    //! In-memory transport that records writes and fails on demand.

    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[derive(Debug, Default)]
    pub struct Script {
        pub connect_failures: u32,
        pub connect_hangs: u32,
        pub abandoned_attempts: u32,
        pub write_failures: u32,
        pub connect_attempts: Vec<Instant>,
        pub writes: Vec<(Instant, Vec<u8>)>,
        pub closed_sessions: u32,
        pub live: bool,
    }

    /// Cloneable handle; clones share one script
    #[derive(Debug, Clone, Default)]
    pub struct ScriptedTransport {
        pub script: Arc<Mutex<Script>>,
    }

    impl ScriptedTransport {
        pub fn failing_connects(count: u32) -> Self {
            let transport = Self::default();
            transport.script.lock().unwrap().connect_failures = count;
            transport
        }

        /// The first `count` connect attempts never complete
        pub fn hanging_connects(count: u32) -> Self {
            let transport = Self::default();
            transport.script.lock().unwrap().connect_hangs = count;
            transport
        }

        pub fn packets(&self) -> Vec<Vec<u8>> {
            self.script
                .lock()
                .unwrap()
                .writes
                .iter()
                .map(|(_, packet)| packet.clone())
                .collect()
        }

        pub fn write_times(&self) -> Vec<Instant> {
            self.script.lock().unwrap().writes.iter().map(|(at, _)| *at).collect()
        }

        pub fn connect_attempts(&self) -> Vec<Instant> {
            self.script.lock().unwrap().connect_attempts.clone()
        }

        pub fn fail_next_writes(&self, count: u32) {
            self.script.lock().unwrap().write_failures = count;
        }

        /// Simulate the lamp dropping the link
        pub fn drop_link(&self) {
            self.script.lock().unwrap().live = false;
        }
    }

    impl Transport for ScriptedTransport {
        type Session = ScriptedSession;

        async fn connect(&mut self) -> Result<ScriptedSession, TransportError> {
            let hang = {
                let mut script = self.script.lock().unwrap();
                script.connect_attempts.push(Instant::now());
                let hang = script.connect_hangs > 0;
                script.connect_hangs = script.connect_hangs.saturating_sub(1);
                hang
            };
            if hang {
                std::future::pending::<()>().await;
            }

            let mut script = self.script.lock().unwrap();
            if script.connect_failures > 0 {
                script.connect_failures -= 1;
                return Err(TransportError::Connect("lamp not in range".into()));
            }
            script.live = true;
            Ok(ScriptedSession {
                script: self.script.clone(),
            })
        }

        async fn abandon(&mut self) {
            self.script.lock().unwrap().abandoned_attempts += 1;
        }
    }

    #[derive(Debug)]
    pub struct ScriptedSession {
        script: Arc<Mutex<Script>>,
    }

    impl Session for ScriptedSession {
        async fn is_connected(&self) -> bool {
            self.script.lock().unwrap().live
        }

        async fn write(&mut self, packet: &[u8]) -> Result<(), TransportError> {
            let mut script = self.script.lock().unwrap();
            if !script.live {
                return Err(TransportError::NotConnected);
            }
            if script.write_failures > 0 {
                script.write_failures -= 1;
                script.live = false;
                return Err(TransportError::Write("GATT write rejected".into()));
            }
            script.writes.push((Instant::now(), packet.to_vec()));
            Ok(())
        }

        async fn close(self) {
            let mut script = self.script.lock().unwrap();
            script.live = false;
            script.closed_sessions += 1;
        }
    }
}
