use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

/// Timing policy of the send loop, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTimings {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,
    #[serde(default = "default_animation_poll_ms")]
    pub animation_poll_ms: u64,
    #[serde(default = "default_send_spacing_ms")]
    pub send_spacing_ms: u64,
    #[serde(default = "default_brightness_throttle_ms")]
    pub brightness_throttle_ms: u64,
}

impl Default for LinkTimings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
            idle_poll_ms: default_idle_poll_ms(),
            animation_poll_ms: default_animation_poll_ms(),
            send_spacing_ms: default_send_spacing_ms(),
            brightness_throttle_ms: default_brightness_throttle_ms(),
        }
    }
}

impl LinkTimings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    /// Queue wait before giving up, shorter while the rainbow runs
    pub fn poll_timeout(&self, animation_active: bool) -> Duration {
        if animation_active {
            Duration::from_millis(self.animation_poll_ms)
        } else {
            Duration::from_millis(self.idle_poll_ms)
        }
    }

    pub fn send_spacing(&self) -> Duration {
        Duration::from_millis(self.send_spacing_ms)
    }

    pub fn brightness_throttle(&self) -> Duration {
        Duration::from_millis(self.brightness_throttle_ms)
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "ilink_lamp".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_reconnect_backoff_ms() -> u64 {
    2000
}
fn default_idle_poll_ms() -> u64 {
    500
}
fn default_animation_poll_ms() -> u64 {
    50
}
fn default_send_spacing_ms() -> u64 {
    80
}
fn default_brightness_throttle_ms() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Lamp
    #[serde(default = "default_device_address")]
    pub device_address: String,
    #[serde(default = "default_characteristic_uuid")]
    pub characteristic_uuid: String,

    // Speaker paired with the lamp, driven through bluetoothctl
    #[serde(default = "default_audio_sink_address")]
    pub audio_sink_address: String,

    #[serde(default)]
    pub timings: LinkTimings,

    #[serde(default = "default_animation_speed")]
    pub animation_speed: f64,
    #[serde(default = "default_brightness_step")]
    pub brightness_step: u8,

    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_address: default_device_address(),
            characteristic_uuid: default_characteristic_uuid(),
            audio_sink_address: default_audio_sink_address(),
            timings: LinkTimings::default(),
            animation_speed: default_animation_speed(),
            brightness_step: default_brightness_step(),
            log_settings: LogSettings::default(),
        }
    }
}

fn default_device_address() -> String {
    "A8:D2:CD:C7:9C:AC".to_string()
}
fn default_characteristic_uuid() -> String {
    "0000a040-0000-1000-8000-00805f9b34fb".to_string()
}
fn default_audio_sink_address() -> String {
    "AC:9C:C7:CD:D2:A8".to_string()
}
fn default_animation_speed() -> f64 {
    crate::domain::animation::DEFAULT_SPEED
}
fn default_brightness_step() -> u8 {
    15
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::with_path(settings_path))
    }

    /// Load from an explicit file, falling back to defaults
    pub fn with_path(settings_path: PathBuf) -> Self {
        let settings = match Self::load_from_file(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::debug!(
                    "Using default settings ({}: {})",
                    settings_path.display(),
                    e
                );
                Settings::default()
            }
        };

        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("ILinkLamp");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "device_address": "11:22:33:44:55:66" }"#).unwrap();
        assert_eq!(settings.device_address, "11:22:33:44:55:66");
        assert_eq!(settings.characteristic_uuid, default_characteristic_uuid());
        assert_eq!(settings.timings, LinkTimings::default());
        assert_eq!(settings.brightness_step, 15);
    }

    #[test]
    fn test_timing_overrides() {
        let timings: LinkTimings =
            serde_json::from_str(r#"{ "reconnect_backoff_ms": 3500 }"#).unwrap();
        assert_eq!(timings.reconnect_backoff(), Duration::from_millis(3500));
        assert_eq!(timings.connect_timeout(), Duration::from_secs(5));
        assert_eq!(timings.poll_timeout(true), Duration::from_millis(50));
        assert_eq!(timings.poll_timeout(false), Duration::from_millis(500));
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!(
            "ilink_lamp_settings_{}.json",
            std::process::id()
        ));
        let mut service = SettingsService::with_path(path.clone());
        service.get_mut().brightness_step = 30;
        service.get_mut().timings.send_spacing_ms = 100;
        service.save().unwrap();

        let reloaded = SettingsService::with_path(path.clone());
        assert_eq!(reloaded.get().brightness_step, 30);
        assert_eq!(reloaded.get().timings.send_spacing_ms, 100);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let service = SettingsService::with_path(PathBuf::from("/nonexistent/ilink/settings.json"));
        assert_eq!(service.get().device_address, default_device_address());
    }
}
