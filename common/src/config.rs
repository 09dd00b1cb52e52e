use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::clock::SECONDS_PER_DAY;
use crate::usb::MountScripts;

/// Environment variable naming an optional JSON configuration file.
pub const CONFIG_ENV: &str = "USB_LOGGER_CONFIG";

/// Where each device sits on the I2C bus and GPIO header.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct HardwareConfig {
    pub i2c_bus: PathBuf,
    /// Address of the TCA9548A bus multiplexer.
    pub mux_address: u8,
    /// Multiplexer channels of the two MPL3115A2 barometers.
    pub barometer_channels: [u8; 2],
    /// Multiplexer channel of the DS3231 clock.
    pub rtc_channel: u8,
    /// Address of the SSD1306 display, which sits on the bus directly.
    pub display_address: u8,
    /// GPIO character device the stop button line belongs to.
    pub gpio_chip: PathBuf,
    /// Line offset (BCM number) of the stop button. The button pulls it low.
    pub stop_button_gpio: u32,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            i2c_bus: PathBuf::from("/dev/i2c-1"),
            mux_address: 0x70,
            barometer_channels: [0, 1],
            rtc_channel: 2,
            display_address: 0x3c,
            gpio_chip: PathBuf::from("/dev/gpiochip0"),
            stop_button_gpio: 14,
        }
    }
}

/// Logger settings. Every field falls back to its default when missing from
/// the configuration file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// USB vendor id of the drive to log to, as reported by udev.
    pub vendor_id: String,
    pub mount_dir: PathBuf,
    /// Seconds between two rows.
    pub time_between_lines: u32,
    pub usb_retry_secs: u64,
    /// Pause between mounting and recording, doubles as button debounce.
    pub start_delay_ms: u64,
    pub mount_script: PathBuf,
    pub unmount_script: PathBuf,
    pub hardware: HardwareConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vendor_id: "0781".into(),
            mount_dir: PathBuf::from("/home/pi/usb"),
            time_between_lines: 60,
            usb_retry_secs: 3,
            start_delay_ms: 1000,
            mount_script: PathBuf::from("./scripts/mount.sh"),
            unmount_script: PathBuf::from("./scripts/unmount.sh"),
            hardware: HardwareConfig::default(),
        }
    }
}

impl Config {
    /// Reads the file named by [`CONFIG_ENV`], or the defaults if it is unset.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_json(&json)
            .with_context(|| format!("Invalid config {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());

        Ok(config)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config = serde_json::from_str::<Self>(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.time_between_lines > 0,
            "time_between_lines must be at least one second"
        );
        // Elapsed time wraps at midnight, so a day or more would never be due.
        anyhow::ensure!(
            self.time_between_lines < SECONDS_PER_DAY,
            "time_between_lines must be shorter than a day"
        );

        let hardware = &self.hardware;
        for channel in hardware
            .barometer_channels
            .iter()
            .chain(std::iter::once(&hardware.rtc_channel))
        {
            anyhow::ensure!(*channel < 8, "multiplexer channel {channel} does not exist");
        }

        Ok(())
    }

    pub fn usb_retry_delay(&self) -> Duration {
        Duration::from_secs(self.usb_retry_secs)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn mount_scripts(&self) -> MountScripts {
        MountScripts {
            mount: self.mount_script.clone(),
            unmount: self.unmount_script.clone(),
        }
    }
}

#[test]
fn test_defaults() {
    let config = Config::default();

    assert_eq!(config.vendor_id, "0781");
    assert_eq!(config.mount_dir, PathBuf::from("/home/pi/usb"));
    assert_eq!(config.time_between_lines, 60);
    assert_eq!(config.usb_retry_delay(), Duration::from_secs(3));
    assert_eq!(config.start_delay(), Duration::from_secs(1));
    assert_eq!(config.hardware.barometer_channels, [0, 1]);
    assert_eq!(config.hardware.rtc_channel, 2);
    assert_eq!(config.hardware.gpio_chip, PathBuf::from("/dev/gpiochip0"));
    assert_eq!(config.mount_scripts().mount, PathBuf::from("./scripts/mount.sh"));
    assert_eq!(config.mount_scripts().unmount, PathBuf::from("./scripts/unmount.sh"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_json_is_default() {
    assert_eq!(Config::from_json("{}").unwrap(), Config::default());
}

#[test]
fn test_partial_json_overrides_fields() {
    let config = Config::from_json(
        r#"{
            "vendor_id": "090c",
            "time_between_lines": 10,
            "hardware": { "gpio_chip": "/dev/gpiochip4", "stop_button_gpio": 17 }
        }"#,
    )
    .unwrap();

    assert_eq!(config.vendor_id, "090c");
    assert_eq!(config.time_between_lines, 10);
    assert_eq!(config.hardware.stop_button_gpio, 17);
    assert_eq!(config.hardware.gpio_chip, PathBuf::from("/dev/gpiochip4"));
    assert_eq!(config.hardware.i2c_bus, PathBuf::from("/dev/i2c-1"));
    assert_eq!(config.mount_dir, PathBuf::from("/home/pi/usb"));
}

#[test]
fn test_rejects_invalid_values() {
    assert!(Config::from_json(r#"{ "time_between_lines": 0 }"#).is_err());
    assert!(Config::from_json(r#"{ "time_between_lines": 86400 }"#).is_err());
    assert!(Config::from_json(r#"{ "time_between_lines": 86399 }"#).is_ok());
    assert!(Config::from_json(r#"{ "hardware": { "rtc_channel": 8 } }"#).is_err());
    assert!(Config::from_json(r#"{ "vendor_id": 781 }"#).is_err());
}

#[test]
fn test_load_reports_missing_file() {
    let error = Config::load(Path::new("/nonexistent/usb-logger.json")).unwrap_err();

    assert!(format!("{error:#}").contains("/nonexistent/usb-logger.json"));
}
