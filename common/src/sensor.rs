/// One reading of a barometric pressure sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SensorSample {
    /// Pressure in hectopascal.
    pub pressure: f32,
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Altitude in meters, derived from pressure.
    pub altitude: f32,
}

/// A sensor producing pressure, temperature and altitude on demand.
pub trait Barometer {
    /// Takes a fresh measurement.
    fn sample(&mut self) -> anyhow::Result<SensorSample>;
}
