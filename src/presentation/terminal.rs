//! Line-oriented front end.
//!
//! Each input line is one hotkey-style action, so the lamp can be driven
//! from a terminal or a script piped into stdin.

use crate::domain::error::DispatchError;
use crate::domain::lamp::{parse_hex_color, LampRemote, Scene};
use crate::domain::models::{AppEvent, MessageSeverity};
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::Dispatcher;
use crate::infrastructure::system_bluetooth::{self, RadioCommand};
use anyhow::Result;
use std::io::BufRead;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub const HELP: &str = "\
  p | space        toggle power
  on | off         power on / off
  1 2 3 4          brightness presets 25% 50% 75% 100%
  up | down        brightness step
  b <0-255>        slider brightness
  rgb <r> <g> <b>  colour, also #rrggbb
  white | cinema | relax
  rainbow          toggle rainbow animation
  raw <mode> <body> send hex command, e.g. raw 01 080501
  bt on | bt off   system Bluetooth radio
  audio on | audio off  paired speaker
  q                quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    TogglePower,
    PowerOn,
    PowerOff,
    Preset(usize),
    StepUp,
    StepDown,
    Slide(u8),
    Color(u8, u8, u8),
    Scene(Scene),
    ToggleRainbow,
    Raw { mode: String, body: String },
    Radio(bool),
    Audio(bool),
    Help,
    Quit,
}

/// Parse one input line. Blank and unknown lines yield `None`.
pub fn parse_line(line: &str) -> Option<Action> {
    // a lone space is the power hotkey
    if line == " " {
        return Some(Action::TogglePower);
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    let action = match words.as_slice() {
        ["p"] | ["power"] => Action::TogglePower,
        ["on"] => Action::PowerOn,
        ["off"] => Action::PowerOff,
        [digit] if matches!(*digit, "1" | "2" | "3" | "4") => Action::Preset(digit.parse().ok()?),
        ["up"] | ["+"] => Action::StepUp,
        ["down"] | ["-"] => Action::StepDown,
        ["b", level] => Action::Slide(level.parse().ok()?),
        ["rgb", r, g, b] => Action::Color(r.parse().ok()?, g.parse().ok()?, b.parse().ok()?),
        [hex] if hex.starts_with('#') => {
            let (r, g, b) = parse_hex_color(hex)?;
            Action::Color(r, g, b)
        }
        [name] if Scene::by_name(name).is_some() => Action::Scene(Scene::by_name(name)?),
        ["rainbow"] | ["r"] => Action::ToggleRainbow,
        ["raw", mode, body] => Action::Raw {
            mode: mode.to_string(),
            body: body.to_string(),
        },
        ["bt", "on"] => Action::Radio(true),
        ["bt", "off"] => Action::Radio(false),
        ["audio", "on"] => Action::Audio(true),
        ["audio", "off"] => Action::Audio(false),
        ["help"] | ["?"] => Action::Help,
        ["q"] | ["quit"] | ["exit"] => Action::Quit,
        _ => return None,
    };
    Some(action)
}

/// Read actions from `input` until quit or end of input
pub fn run(
    remote: &mut LampRemote<Dispatcher>,
    settings: &Settings,
    input: impl BufRead,
) -> Result<()> {
    println!("{}", HELP);

    for line in input.lines() {
        let line = line?;
        let Some(action) = parse_line(&line) else {
            if !line.trim().is_empty() {
                println!("Unknown command: {:?} (type help)", line.trim());
            }
            continue;
        };

        if action == Action::Quit {
            break;
        }

        match apply(remote, settings, action) {
            Ok(()) => {}
            Err(DispatchError::QueueClosed) => {
                warn!("Dispatcher closed, leaving");
                break;
            }
            Err(e) => println!("{}", e),
        }
    }

    Ok(())
}

fn apply(
    remote: &mut LampRemote<Dispatcher>,
    settings: &Settings,
    action: Action,
) -> Result<(), DispatchError> {
    let step = settings.brightness_step as i16;
    match action {
        Action::TogglePower => remote.toggle_power(),
        Action::PowerOn => remote.power_on(),
        Action::PowerOff => remote.power_off(),
        Action::Preset(index) => remote.preset(index).unwrap_or(Ok(())),
        Action::StepUp => remote.adjust_brightness(step),
        Action::StepDown => remote.adjust_brightness(-step),
        Action::Slide(level) => remote.slide_brightness(level),
        Action::Color(r, g, b) => remote.set_color(r, g, b),
        Action::Scene(scene) => remote.apply_scene(scene),
        Action::ToggleRainbow => {
            remote.toggle_animation();
            Ok(())
        }
        Action::Raw { mode, body } => remote.sink().submit(&mode, &body, true),
        Action::Radio(on) => {
            let command = if on {
                RadioCommand::PowerOn
            } else {
                RadioCommand::PowerOff
            };
            spawn_radio(command);
            Ok(())
        }
        Action::Audio(on) => {
            let address = settings.audio_sink_address.clone();
            let command = if on {
                RadioCommand::ConnectAudio(address)
            } else {
                RadioCommand::DisconnectAudio(address)
            };
            spawn_radio(command);
            Ok(())
        }
        Action::Help => {
            println!("{}", HELP);
            Ok(())
        }
        Action::Quit => Ok(()),
    }
}

fn spawn_radio(command: RadioCommand) {
    if let Err(e) = system_bluetooth::run(command) {
        warn!("{:#}", e);
    }
}

/// Power on, show green, then dim to level 50
pub fn run_diagnostics(remote: &mut LampRemote<Dispatcher>) -> Result<()> {
    println!("--- iLink diagnostics ---");

    println!("[1/3] Powering on...");
    remote.power_on()?;
    std::thread::sleep(Duration::from_secs(1));

    println!("[2/3] Setting green...");
    remote.set_color(0, 255, 0)?;
    std::thread::sleep(Duration::from_secs(2));

    println!("[3/3] Dimming to level 50...");
    remote.set_intensity(50)?;
    std::thread::sleep(Duration::from_secs(1));

    println!("Diagnostics sequence sent");
    Ok(())
}

/// Print status and log events until every sender is gone
pub fn spawn_status_printer(mut events: mpsc::UnboundedReceiver<AppEvent>) -> Result<JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("status".into())
        .spawn(move || {
            while let Some(event) = events.blocking_recv() {
                match event {
                    AppEvent::ConnectionStatus(state) => println!("[lamp] {}", state.tag()),
                    AppEvent::AnimationChanged(active) => {
                        println!("[rainbow] {}", if active { "on" } else { "off" })
                    }
                    AppEvent::LogMessage(message) => match message.severity {
                        MessageSeverity::Warning | MessageSeverity::Error => {
                            println!("[!] {}", message.message)
                        }
                        MessageSeverity::Info | MessageSeverity::Success => {
                            info!("{}", message.message)
                        }
                    },
                }
            }
        })?;
    Ok(handle)
}
