//! TCA9548A I2C multiplexer
//!
//! The barometers share one address, so each sits behind its own channel of
//! the multiplexer. A `MuxChannel` behaves like a plain I2C bus: it switches
//! the multiplexer to its channel before every transaction.

use embedded_hal::i2c::{ErrorType, I2c, Operation};

pub const CHANNELS: u8 = 8;

pub struct MuxChannel<I2C> {
    bus: I2C,
    address: u8,
    channel: u8,
}

impl<I2C: I2c> MuxChannel<I2C> {
    pub fn new(bus: I2C, address: u8, channel: u8) -> anyhow::Result<Self> {
        anyhow::ensure!(channel < CHANNELS, "multiplexer channel {channel} does not exist");

        Ok(Self {
            bus,
            address,
            channel,
        })
    }

    fn select(&mut self) -> Result<(), I2C::Error> {
        self.bus.write(self.address, &[1 << self.channel])
    }
}

impl<I2C: I2c> ErrorType for MuxChannel<I2C> {
    type Error = I2C::Error;
}

impl<I2C: I2c> I2c for MuxChannel<I2C> {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.select()?;
        self.bus.transaction(address, operations)
    }
}
