//! Bluetooth Module
//!
//! Command dispatch and protocol engine for the iLink lamp.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Dispatcher                          │
//! │   (submit / set_animation / shutdown, any thread)        │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │ CommandQueue + AnimationFlag
//!                       ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                  ConnectionManager                       │
//! │  (lamp-link thread: connect, coalesce, throttle, send)   │
//! └──────┬──────────────────┬───────────────────┬───────────┘
//!        │                  │                   │
//!        ▼                  ▼                   ▼
//! ┌────────────┐   ┌─────────────────┐   ┌──────────────┐
//! │  Protocol  │   │ AnimationTicker │   │  Transport   │
//! │ - framing  │   │ - rainbow frames│   │ - WinRT      │
//! │ - checksum │   │                 │   │ - btleplug   │
//! └────────────┘   └─────────────────┘   └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Packet framing, checksum and known command bodies
//! - [`queue`] - Command queue, coalescing and brightness throttle
//! - [`transport`] - Boundary traits to the platform BLE stack
//! - [`connection`] - Connection state machine and send loop
//! - [`service`] - Dispatcher facade

pub mod connection;
pub mod protocol;
pub mod queue;
pub mod service;
pub mod transport;

#[cfg(not(windows))]
pub mod btle;
#[cfg(windows)]
pub mod winrt;

pub use service::Dispatcher;

#[cfg(not(windows))]
pub type PlatformTransport = btle::BtleTransport;
#[cfg(windows)]
pub type PlatformTransport = winrt::WinRtTransport;

/// Transport for the lamp configured in `settings`
pub fn platform_transport(
    settings: &crate::domain::settings::Settings,
) -> anyhow::Result<PlatformTransport> {
    PlatformTransport::new(&settings.device_address, &settings.characteristic_uuid)
}
