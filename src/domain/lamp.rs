//! High-level lamp operations used by front ends.
//!
//! Tracks the presentation-side view of the lamp (power and last brightness)
//! and turns user intents into command sequences.

use crate::domain::error::DispatchError;
use crate::domain::models::Command;

/// Brightness levels bound to presets 1 to 4
pub const PRESET_LEVELS: [u8; 4] = [64, 128, 191, 255];

/// Lowest brightness reachable with the step keys
pub const MIN_STEP_LEVEL: u8 = 1;

/// Where lamp commands go. Implemented by the dispatcher.
pub trait CommandSink {
    fn send(&self, command: Command) -> Result<(), DispatchError>;
    fn set_animation(&self, active: bool);
    fn is_animation_active(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneColor {
    Rgb(u8, u8, u8),
    White,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scene {
    pub name: &'static str,
    pub color: SceneColor,
    pub brightness: u8,
}

impl Scene {
    pub const CINEMA: Scene = Scene {
        name: "cinema",
        color: SceneColor::Rgb(0, 0, 150),
        brightness: 20,
    };

    pub const RELAX: Scene = Scene {
        name: "relax",
        color: SceneColor::Rgb(255, 80, 0),
        brightness: 100,
    };

    pub const WHITE: Scene = Scene {
        name: "white",
        color: SceneColor::White,
        brightness: 255,
    };

    pub fn by_name(name: &str) -> Option<Scene> {
        [Self::CINEMA, Self::RELAX, Self::WHITE]
            .into_iter()
            .find(|scene| scene.name.eq_ignore_ascii_case(name))
    }
}

pub struct LampRemote<S: CommandSink> {
    sink: S,
    is_on: bool,
    brightness: u8,
}

impl<S: CommandSink> LampRemote<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            is_on: true,
            brightness: u8::MAX,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn power_on(&mut self) -> Result<(), DispatchError> {
        self.sink.send(Command::power(true).forced())?;
        self.is_on = true;
        Ok(())
    }

    pub fn power_off(&mut self) -> Result<(), DispatchError> {
        self.sink.send(Command::power(false).forced())?;
        self.is_on = false;
        Ok(())
    }

    pub fn toggle_power(&mut self) -> Result<(), DispatchError> {
        if self.is_on {
            self.power_off()
        } else {
            self.power_on()
        }
    }

    /// Explicit brightness choice: wakes the lamp, then sets the level
    pub fn set_intensity(&mut self, level: u8) -> Result<(), DispatchError> {
        self.sink.set_animation(false);
        self.power_on()?;
        self.sink.send(Command::brightness(level).forced())?;
        self.brightness = level;
        Ok(())
    }

    /// Preset 1..=4
    pub fn preset(&mut self, index: usize) -> Option<Result<(), DispatchError>> {
        let level = *PRESET_LEVELS.get(index.checked_sub(1)?)?;
        Some(self.set_intensity(level))
    }

    pub fn adjust_brightness(&mut self, delta: i16) -> Result<(), DispatchError> {
        let level = (self.brightness as i16 + delta).clamp(MIN_STEP_LEVEL as i16, u8::MAX as i16);
        self.set_intensity(level as u8)
    }

    /// Continuous slider movement: throttled and coalesced downstream
    pub fn slide_brightness(&mut self, level: u8) -> Result<(), DispatchError> {
        self.sink.send(Command::brightness(level))?;
        self.brightness = level;
        Ok(())
    }

    pub fn set_color(&mut self, r: u8, g: u8, b: u8) -> Result<(), DispatchError> {
        self.sink.send(Command::color(r, g, b).forced())
    }

    pub fn apply_scene(&mut self, scene: Scene) -> Result<(), DispatchError> {
        self.sink.set_animation(false);
        self.power_on()?;
        let color = match scene.color {
            SceneColor::White => Command::white(),
            SceneColor::Rgb(r, g, b) => Command::color(r, g, b),
        };
        self.sink.send(color.forced())?;
        self.sink.send(Command::brightness(scene.brightness).forced())?;
        self.brightness = scene.brightness;
        Ok(())
    }

    pub fn set_animation(&mut self, active: bool) {
        self.sink.set_animation(active);
    }

    /// Returns the new animation state
    pub fn toggle_animation(&mut self) -> bool {
        let active = !self.sink.is_animation_active();
        self.sink.set_animation(active);
        active
    }
}

/// Parse `#rrggbb` or `rrggbb`
pub fn parse_hex_color(input: &str) -> Option<(u8, u8, u8)> {
    let hex = input.strip_prefix('#').unwrap_or(input);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct RecordingSink {
        sent: RefCell<Vec<Command>>,
        animation: Cell<bool>,
    }

    impl CommandSink for RecordingSink {
        fn send(&self, command: Command) -> Result<(), DispatchError> {
            self.animation.set(false);
            self.sent.borrow_mut().push(command);
            Ok(())
        }

        fn set_animation(&self, active: bool) {
            self.animation.set(active);
        }

        fn is_animation_active(&self) -> bool {
            self.animation.get()
        }
    }

    fn sent(remote: &LampRemote<RecordingSink>) -> Vec<Command> {
        remote.sink().sent.borrow().clone()
    }

    #[test]
    fn test_toggle_power() {
        let mut remote = LampRemote::new(RecordingSink::default());
        remote.toggle_power().unwrap();
        assert!(!remote.is_on());
        remote.toggle_power().unwrap();
        assert!(remote.is_on());
        assert_eq!(
            sent(&remote),
            vec![Command::power(false).forced(), Command::power(true).forced()]
        );
    }

    #[test]
    fn test_presets() {
        let mut remote = LampRemote::new(RecordingSink::default());
        remote.preset(2).unwrap().unwrap();
        assert_eq!(
            sent(&remote),
            vec![Command::power(true).forced(), Command::brightness(128).forced()]
        );
        assert_eq!(remote.brightness(), 128);
        assert!(remote.preset(0).is_none());
        assert!(remote.preset(5).is_none());
    }

    #[test]
    fn test_adjust_brightness_clamps() {
        let mut remote = LampRemote::new(RecordingSink::default());
        remote.adjust_brightness(15).unwrap();
        assert_eq!(remote.brightness(), 255);

        remote.set_intensity(10).unwrap();
        remote.adjust_brightness(-15).unwrap();
        assert_eq!(remote.brightness(), MIN_STEP_LEVEL);
    }

    #[test]
    fn test_scene_sequence() {
        let mut remote = LampRemote::new(RecordingSink::default());
        remote.set_animation(true);
        remote.apply_scene(Scene::RELAX).unwrap();

        assert!(!remote.sink().is_animation_active());
        assert_eq!(
            sent(&remote),
            vec![
                Command::power(true).forced(),
                Command::color(255, 80, 0).forced(),
                Command::brightness(100).forced(),
            ]
        );
    }

    #[test]
    fn test_white_scene_uses_white_mode() {
        let mut remote = LampRemote::new(RecordingSink::default());
        remote.apply_scene(Scene::by_name("WHITE").unwrap()).unwrap();
        assert_eq!(sent(&remote)[1], Command::white().forced());
    }

    #[test]
    fn test_slider_is_not_forced() {
        let mut remote = LampRemote::new(RecordingSink::default());
        remote.slide_brightness(42).unwrap();
        assert_eq!(sent(&remote), vec![Command::brightness(42)]);
    }

    #[test]
    fn test_toggle_animation() {
        let mut remote = LampRemote::new(RecordingSink::default());
        assert!(remote.toggle_animation());
        assert!(!remote.toggle_animation());
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff8000"), Some((255, 128, 0)));
        assert_eq!(parse_hex_color("00FF00"), Some((0, 255, 0)));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }
}
