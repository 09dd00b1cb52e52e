//! Hardware independent parts of the USB environmental logger.
//!
//! Devices are reached through the small traits defined here ([`Clock`],
//! [`Barometer`], [`StatusDisplay`], [`StopButton`], [`OperatorInput`],
//! [`UsbDetector`] and [`DriveMounter`]), so the whole logging session can
//! run against fakes.

pub mod clock;
pub mod config;
pub mod display;
pub mod recorder;
pub mod reprogram;
pub mod sensor;
pub mod session;
pub mod storage;
pub mod usb;

#[cfg(test)]
mod testing;

pub use clock::{elapsed, Clock, ClockReading};
pub use config::{Config, HardwareConfig};
pub use display::{Screen, StatusDisplay};
pub use recorder::{record, Instruments, RecordOutcome, RunState, StopButton};
pub use reprogram::{reprogram_clock, Key, OperatorInput};
pub use sensor::{Barometer, SensorSample};
pub use session::{run_session, Station};
pub use storage::CsvLog;
pub use usb::{wait_for_usb, DriveMounter, MountScripts, UdevDetector, UsbDetector};
