use crate::domain::error::DispatchError;
use std::fmt;

/// System category: power, brightness, white mode
pub const MODE_SYSTEM: u8 = 0x01;
/// Colour category: RGB payloads
pub const MODE_COLOR: u8 = 0x03;

/// Body prefix shared by every brightness update
pub const BRIGHTNESS_PREFIX: [u8; 2] = [0x08, 0x01];

/// A single lamp command, immutable once built.
///
/// `forced` commands are discrete user actions (presets, explicit on/off)
/// and are never throttled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    mode: u8,
    body: Vec<u8>,
    forced: bool,
}

impl Command {
    pub fn new(mode: u8, body: impl Into<Vec<u8>>) -> Self {
        Self {
            mode,
            body: body.into(),
            forced: false,
        }
    }

    /// Build a command from its hex form, e.g. `("01", "080501")`
    pub fn from_hex(mode: &str, body: &str, forced: bool) -> Result<Self, DispatchError> {
        let mode_byte = match decode_hex(mode)?.as_slice() {
            [byte] => *byte,
            _ => {
                return Err(DispatchError::MalformedInput(format!(
                    "mode must be exactly one byte, got {:?}",
                    mode
                )))
            }
        };

        Ok(Self {
            mode: mode_byte,
            body: decode_hex(body)?,
            forced,
        })
    }

    /// Mark the command as exempt from rate limiting
    pub fn forced(mut self) -> Self {
        self.forced = true;
        self
    }

    pub fn power(on: bool) -> Self {
        Self::new(MODE_SYSTEM, vec![0x08, 0x05, on as u8])
    }

    pub fn brightness(level: u8) -> Self {
        Self::new(MODE_SYSTEM, vec![BRIGHTNESS_PREFIX[0], BRIGHTNESS_PREFIX[1], level])
    }

    pub fn color(r: u8, g: u8, b: u8) -> Self {
        Self::new(MODE_COLOR, vec![0x08, 0x02, r, g, b])
    }

    pub fn white() -> Self {
        Self::new(MODE_SYSTEM, vec![0x08, 0x09, 0x03])
    }

    pub fn mode(&self) -> u8 {
        self.mode
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    /// Brightness updates are the only coalescible category
    pub fn is_brightness(&self) -> bool {
        self.body.starts_with(&BRIGHTNESS_PREFIX)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x} ", self.mode)?;
        for byte in &self.body {
            write!(f, "{:02x}", byte)?;
        }
        if self.forced {
            write!(f, " (forced)")?;
        }
        Ok(())
    }
}

/// Decode an even-length hex string into bytes
pub fn decode_hex(input: &str) -> Result<Vec<u8>, DispatchError> {
    if input.len() % 2 != 0 {
        return Err(DispatchError::MalformedInput(format!(
            "odd length hex string {:?}",
            input
        )));
    }
    if !input.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DispatchError::MalformedInput(format!(
            "non-hex characters in {:?}",
            input
        )));
    }

    (0..input.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&input[i..i + 2], 16)
                .map_err(|e| DispatchError::MalformedInput(e.to_string()))
        })
        .collect()
}

/// Session state owned by the connection manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Coarse tag for presentation layers
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "searching",
            Self::Connected => "connected",
        }
    }
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    ConnectionStatus(ConnectionState),
    AnimationChanged(bool),
    LogMessage(StatusMessage),
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}
