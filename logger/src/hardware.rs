//! The devices of the logger board on a Raspberry Pi
//!
//! ```text
//! /dev/i2c-1 ─┬─ SSD1306 OLED (0x3C)
//!             └─ TCA9548A mux (0x70) ─┬─ ch0: MPL3115A2 barometer 1
//!                                     ├─ ch1: MPL3115A2 barometer 2
//!                                     └─ ch2: DS3231 RTC
//! gpiochip0 line 14 ── stop button to GND
//! ```

use std::cell::RefCell;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

use anyhow::{anyhow, Context};
use chrono::NaiveDateTime;
use display_interface_i2c::I2CInterface;
use ds323x::interface::I2cInterface;
use ds323x::{ic, DateTimeAccess, Ds323x};
use embedded_hal::digital::InputPin;
use embedded_hal_bus::i2c::RcDevice;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::{CdevPin, Delay, I2cdev};
use nix::errno::Errno;
use nix::sys::termios::{
    tcgetattr, tcsetattr, LocalFlags, SetArg, SpecialCharacterIndices, Termios,
};
use ssd1306::I2CDisplayInterface;
use usb_logger_common::{Clock, HardwareConfig, Key, OperatorInput, StopButton};

use crate::display::OledDisplay;
use crate::mpl3115a2::Mpl3115a2;
use crate::mux::MuxChannel;

type SharedBus = RcDevice<I2cdev>;
type MuxedBus = MuxChannel<SharedBus>;

pub type Barometer = Mpl3115a2<MuxedBus, Delay>;
pub type Display = OledDisplay<I2CInterface<SharedBus>>;

/// DS3231 real-time clock.
pub struct RtcClock {
    rtc: Ds323x<I2cInterface<MuxedBus>, ic::DS3231>,
}

impl RtcClock {
    pub fn new(i2c: MuxedBus) -> Self {
        Self {
            rtc: Ds323x::new_ds3231(i2c),
        }
    }
}

impl Clock for RtcClock {
    fn now(&mut self) -> anyhow::Result<NaiveDateTime> {
        self.rtc
            .datetime()
            .map_err(|e| anyhow!("Failed to read RTC: {e:?}"))
    }

    fn set(&mut self, datetime: &NaiveDateTime) -> anyhow::Result<()> {
        self.rtc
            .set_datetime(datetime)
            .map_err(|e| anyhow!("Failed to set RTC: {e:?}"))?;
        // The clock runs again, forget that it had stopped.
        self.rtc
            .clear_has_been_stopped_flag()
            .map_err(|e| anyhow!("Failed to clear RTC stop flag: {e:?}"))
    }

    fn lost_power(&mut self) -> anyhow::Result<bool> {
        self.rtc
            .has_been_stopped()
            .map_err(|e| anyhow!("Failed to read RTC status: {e:?}"))
    }
}

/// Push button pulling its GPIO line low while pressed. The pull-up is set up
/// by the board configuration (`gpio=14=ip,pu` in config.txt).
pub struct GpioButton {
    pin: CdevPin,
}

impl GpioButton {
    pub fn new(gpio_chip: &Path, line: u32) -> anyhow::Result<Self> {
        let mut chip = Chip::new(gpio_chip)
            .with_context(|| format!("Failed to open {}", gpio_chip.display()))?;
        let handle = chip
            .get_line(line)
            .and_then(|line| line.request(LineRequestFlags::INPUT, 0, "usb-logger"))
            .with_context(|| format!("Failed to request GPIO line {line}"))?;
        let pin = CdevPin::new(handle)
            .with_context(|| format!("Failed to make GPIO line {line} an input"))?;

        Ok(Self { pin })
    }
}

impl StopButton for GpioButton {
    fn is_pressed(&mut self) -> anyhow::Result<bool> {
        self.pin
            .is_low()
            .map_err(|e| anyhow!("Failed to read stop button: {e:?}"))
    }
}

/// Terminal settings of stdin saved while key presses are read one by one.
/// Dropping it restores them.
struct RawMode {
    saved: Termios,
}

impl RawMode {
    /// Turns off line buffering and echo. Returns `None` when stdin is not a
    /// terminal.
    fn enter() -> anyhow::Result<Option<Self>> {
        let stdin = std::io::stdin();
        let saved = match tcgetattr(&stdin) {
            Ok(termios) => termios,
            Err(Errno::ENOTTY) => return Ok(None),
            Err(e) => return Err(e).context("Failed to read terminal settings"),
        };

        let mut raw = saved.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        tcsetattr(&stdin, SetArg::TCSANOW, &raw)
            .context("Failed to switch terminal to single key input")?;

        Ok(Some(Self { saved }))
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = tcsetattr(std::io::stdin(), SetArg::TCSANOW, &self.saved) {
            log::warn!("Failed to restore terminal settings: {e}");
        }
    }
}

/// Keyboard attached to the board, read from standard input one key press
/// at a time.
///
/// The terminal leaves canonical mode on the first key read and gets it back
/// on [`OperatorInput::release`], so the display can echo every key.
#[derive(Default)]
pub struct Console {
    raw: Option<RawMode>,
    checked: bool,
}

impl OperatorInput for Console {
    fn read_key(&mut self) -> anyhow::Result<Key> {
        if !self.checked {
            self.raw = RawMode::enter()?;
            self.checked = true;
            if self.raw.is_none() {
                log::debug!("Operator console is not a terminal, reading it as is");
            }
        }

        let mut byte = [0u8; 1];
        let read = std::io::stdin()
            .lock()
            .read(&mut byte)
            .context("Failed to read operator console")?;

        match read {
            0 => Err(anyhow!("Operator console closed")),
            _ => Ok(Key::from_byte(byte[0])),
        }
    }

    fn release(&mut self) {
        self.raw = None;
        self.checked = false;
    }
}

/// Every device the logger talks to.
pub struct Hardware {
    pub clock: RtcClock,
    pub barometers: [Barometer; 2],
    pub display: Display,
    pub stop_button: GpioButton,
    pub console: Console,
}

impl Hardware {
    pub fn new(config: &HardwareConfig) -> anyhow::Result<Self> {
        let i2c = I2cdev::new(&config.i2c_bus)
            .with_context(|| format!("Failed to open {}", config.i2c_bus.display()))?;
        let bus = Rc::new(RefCell::new(i2c));

        let muxed = |channel: u8| {
            MuxChannel::new(RcDevice::new(bus.clone()), config.mux_address, channel)
        };

        let display = OledDisplay::new(I2CDisplayInterface::new_custom_address(
            RcDevice::new(bus.clone()),
            config.display_address,
        ))?;
        log::info!("Display initialized");

        let clock = RtcClock::new(muxed(config.rtc_channel)?);

        let [first, second] = config.barometer_channels;
        let barometers = [
            Mpl3115a2::new(muxed(first)?, Delay).context("Barometer 1")?,
            Mpl3115a2::new(muxed(second)?, Delay).context("Barometer 2")?,
        ];
        log::info!("Barometers initialized on mux channels {first} and {second}");

        let stop_button = GpioButton::new(&config.gpio_chip, config.stop_button_gpio)?;

        Ok(Self {
            clock,
            barometers,
            display,
            stop_button,
            console: Console::default(),
        })
    }
}
