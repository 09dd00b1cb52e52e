mod display;
mod hardware;
mod mpl3115a2;
mod mux;

use usb_logger_common::{run_session, Config, Instruments, Station, UdevDetector};

use hardware::Hardware;

/// Our App struct that holds the configuration and the devices.
struct App {
    config: Config,
    hardware: Hardware,
}

impl App {
    /// Create a new App struct.
    ///
    /// Loads the configuration and initializes every device.
    fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;
        let hardware = Hardware::new(&config.hardware)?;

        Ok(Self { config, hardware })
    }

    /// Run one logging session on the real devices.
    fn run(&mut self) -> anyhow::Result<()> {
        let hardware = &mut self.hardware;
        let [first, second] = &mut hardware.barometers;
        let mut detector = UdevDetector;
        let mut drive = self.config.mount_scripts();

        let mut station = Station {
            instruments: Instruments {
                clock: &mut hardware.clock,
                barometers: [first, second],
                display: &mut hardware.display,
                stop_button: &mut hardware.stop_button,
            },
            input: &mut hardware.console,
            detector: &mut detector,
            drive: &mut drive,
        };

        run_session(&mut station, &self.config)?;

        Ok(())
    }
}

/// A minimal main function that initializes the App and runs it.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut app = App::new()?;

    app.run()
}
