//! OS-level Bluetooth control through `bluetoothctl`.
//!
//! Radio power and the paired speaker are handled by the system stack, not
//! by the lamp link. Each call runs on a short-lived thread so neither the
//! caller nor the send loop ever waits on the external process.

use anyhow::{Context, Result};
use std::process::Command;
use std::thread::JoinHandle;
use tracing::{error, info, warn};

const BLUETOOTHCTL: &str = "bluetoothctl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCommand {
    PowerOn,
    PowerOff,
    ConnectAudio(String),
    DisconnectAudio(String),
}

impl RadioCommand {
    pub fn args(&self) -> Vec<&str> {
        match self {
            Self::PowerOn => vec!["power", "on"],
            Self::PowerOff => vec!["power", "off"],
            Self::ConnectAudio(address) => vec!["connect", address],
            Self::DisconnectAudio(address) => vec!["disconnect", address],
        }
    }
}

/// Run `bluetoothctl` in the background
pub fn run(command: RadioCommand) -> Result<JoinHandle<()>> {
    info!("{} {}", BLUETOOTHCTL, command.args().join(" "));

    std::thread::Builder::new()
        .name("bluetoothctl".into())
        .spawn(move || match execute(&command) {
            Ok(output) => info!("bluetoothctl: {}", output.trim()),
            Err(e) => error!("bluetoothctl {:?} failed: {:#}", command, e),
        })
        .context("Failed to spawn bluetoothctl thread")
}

fn execute(command: &RadioCommand) -> Result<String> {
    let output = Command::new(BLUETOOTHCTL)
        .args(command.args())
        .output()
        .with_context(|| format!("Failed to launch {}", BLUETOOTHCTL))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if output.status.success() {
        Ok(stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("bluetoothctl exited with {}", output.status);
        anyhow::bail!("{}{}", stdout.trim(), stderr.trim())
    }
}
