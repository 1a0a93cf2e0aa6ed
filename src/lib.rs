//! Command dispatch for iLink Bluetooth LE lamps.
//!
//! Commands go through [`infrastructure::bluetooth::Dispatcher`], which owns
//! the single GATT session, coalesces brightness bursts, throttles slider
//! updates and interleaves rainbow animation frames.

pub mod domain;
pub mod infrastructure;
pub mod presentation;
