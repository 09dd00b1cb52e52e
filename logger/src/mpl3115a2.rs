//! MPL3115A2 barometric pressure / altitude sensor driver
//!
//! Address: 0x60 (fixed, hence the multiplexer)
//!
//! Measurements are taken one-shot with 128x oversampling: once in barometer
//! mode for pressure and temperature, once in altimeter mode for altitude.

use anyhow::anyhow;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use usb_logger_common::{Barometer, SensorSample};

pub const ADDR: u8 = 0x60;

const CHIP_ID: u8 = 0xC4;

// Register addresses
const STATUS: u8 = 0x00;
const OUT_P_MSB: u8 = 0x01;
const WHO_AM_I: u8 = 0x0C;
const PT_DATA_CFG: u8 = 0x13;
const CTRL_REG1: u8 = 0x26;

// CTRL_REG1 bits
const CTRL_OST: u8 = 0x02;
const CTRL_RST: u8 = 0x04;
const CTRL_OS128: u8 = 0x38;
const CTRL_ALT: u8 = 0x80;

// STATUS bits
const STATUS_PDR: u8 = 0x04;

// PT_DATA_CFG: data ready events for pressure and temperature
const PT_DATA_CFG_ALL: u8 = 0x07;

/// Polls of 10 ms before a conversion is given up on. 128x oversampling takes
/// about half a second.
const MAX_POLLS: u32 = 200;
const POLL_INTERVAL_MS: u32 = 10;

pub struct Mpl3115a2<I2C, D> {
    i2c: I2C,
    delay: D,
    ctrl_reg1: u8,
}

impl<I2C: I2c, D: DelayNs> Mpl3115a2<I2C, D> {
    /// Checks the chip id, resets the sensor and configures oversampling.
    pub fn new(i2c: I2C, delay: D) -> anyhow::Result<Self> {
        let mut sensor = Self {
            i2c,
            delay,
            ctrl_reg1: CTRL_OS128,
        };

        let id = sensor.read_register(WHO_AM_I)?;
        anyhow::ensure!(id == CHIP_ID, "MPL3115A2 not found, chip id {id:#04x}");

        // The sensor resets before acknowledging, so the write reports an error.
        let _ = sensor.i2c.write(ADDR, &[CTRL_REG1, CTRL_RST]);
        sensor.delay.delay_ms(POLL_INTERVAL_MS);
        sensor.wait_for(CTRL_REG1, CTRL_RST, false)?;

        sensor.write_register(CTRL_REG1, sensor.ctrl_reg1)?;
        sensor.write_register(PT_DATA_CFG, PT_DATA_CFG_ALL)?;

        Ok(sensor)
    }

    /// Pressure (hPa) and temperature (°C) from one barometer conversion.
    pub fn pressure_and_temperature(&mut self) -> anyhow::Result<(f32, f32)> {
        let data = self.one_shot(false)?;
        Ok((
            pressure_from_raw([data[0], data[1], data[2]]),
            temperature_from_raw([data[3], data[4]]),
        ))
    }

    /// Altitude (m) from one altimeter conversion.
    pub fn altitude(&mut self) -> anyhow::Result<f32> {
        let data = self.one_shot(true)?;
        Ok(altitude_from_raw([data[0], data[1], data[2]]))
    }

    /// Runs one conversion and returns OUT_P (3 bytes) followed by OUT_T (2 bytes).
    fn one_shot(&mut self, altimeter: bool) -> anyhow::Result<[u8; 5]> {
        self.wait_for(CTRL_REG1, CTRL_OST, false)?;

        self.ctrl_reg1 = if altimeter {
            self.ctrl_reg1 | CTRL_ALT
        } else {
            self.ctrl_reg1 & !CTRL_ALT
        };
        self.write_register(CTRL_REG1, self.ctrl_reg1)?;
        self.write_register(CTRL_REG1, self.ctrl_reg1 | CTRL_OST)?;

        self.wait_for(STATUS, STATUS_PDR, true)?;

        let mut data = [0u8; 5];
        self.read_registers(OUT_P_MSB, &mut data)?;
        Ok(data)
    }

    fn wait_for(&mut self, register: u8, mask: u8, set: bool) -> anyhow::Result<()> {
        for _ in 0..MAX_POLLS {
            if (self.read_register(register)? & mask != 0) == set {
                return Ok(());
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
        }

        Err(anyhow!(
            "MPL3115A2 timed out waiting on register {register:#04x}"
        ))
    }

    fn read_register(&mut self, register: u8) -> anyhow::Result<u8> {
        let mut value = [0u8];
        self.read_registers(register, &mut value)?;
        Ok(value[0])
    }

    fn read_registers(&mut self, register: u8, buffer: &mut [u8]) -> anyhow::Result<()> {
        self.i2c
            .write_read(ADDR, &[register], buffer)
            .map_err(|e| anyhow!("MPL3115A2 read of {register:#04x} failed: {e:?}"))
    }

    fn write_register(&mut self, register: u8, value: u8) -> anyhow::Result<()> {
        self.i2c
            .write(ADDR, &[register, value])
            .map_err(|e| anyhow!("MPL3115A2 write of {register:#04x} failed: {e:?}"))
    }
}

impl<I2C: I2c, D: DelayNs> Barometer for Mpl3115a2<I2C, D> {
    fn sample(&mut self) -> anyhow::Result<SensorSample> {
        let (pressure, temperature) = self.pressure_and_temperature()?;
        let altitude = self.altitude()?;

        Ok(SensorSample {
            pressure,
            temperature,
            altitude,
        })
    }
}

/// OUT_P in barometer mode: unsigned Q18.2 pascal in the upper 20 bits.
fn pressure_from_raw(raw: [u8; 3]) -> f32 {
    let quarter_pascal = u32::from_be_bytes([0, raw[0], raw[1], raw[2]]) >> 4;
    quarter_pascal as f32 / 4.0 / 100.0
}

/// OUT_P in altimeter mode: signed Q16.4 meters in the upper 20 bits.
fn altitude_from_raw(raw: [u8; 3]) -> f32 {
    i32::from_be_bytes([raw[0], raw[1], raw[2], 0]) as f32 / 65536.0
}

/// OUT_T: signed Q8.4 degrees Celsius in the upper 12 bits.
fn temperature_from_raw(raw: [u8; 2]) -> f32 {
    (i16::from_be_bytes(raw) >> 4) as f32 / 16.0
}
