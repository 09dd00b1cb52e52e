//! 128x32 SSD1306 OLED status display

use anyhow::anyhow;
use display_interface::WriteOnlyDataCommand;
use embedded_graphics::mono_font::{ascii::FONT_6X10, MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::Ssd1306;
use usb_logger_common::StatusDisplay;

pub struct OledDisplay<DI> {
    display: Ssd1306<DI, DisplaySize128x32, BufferedGraphicsMode<DisplaySize128x32>>,
    style: MonoTextStyle<'static, BinaryColor>,
}

impl<DI: WriteOnlyDataCommand> OledDisplay<DI> {
    /// Initializes the display and blanks it.
    pub fn new(interface: DI) -> anyhow::Result<Self> {
        let mut display = Ssd1306::new(interface, DisplaySize128x32, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        display
            .init()
            .map_err(|e| anyhow!("Failed to init display: {e:?}"))?;

        let style = MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(BinaryColor::On)
            .build();

        let mut oled = Self { display, style };
        oled.clear()?;
        oled.show()?;

        Ok(oled)
    }
}

impl<DI: WriteOnlyDataCommand> StatusDisplay for OledDisplay<DI> {
    fn clear(&mut self) -> anyhow::Result<()> {
        self.display.clear_buffer();
        Ok(())
    }

    fn text(&mut self, text: &str, x: i32, y: i32) -> anyhow::Result<()> {
        Text::with_baseline(text, Point::new(x, y), self.style, Baseline::Top)
            .draw(&mut self.display)
            .map_err(|e| anyhow!("Failed to draw {text:?}: {e:?}"))?;
        Ok(())
    }

    fn show(&mut self) -> anyhow::Result<()> {
        self.display
            .flush()
            .map_err(|e| anyhow!("Failed to update display: {e:?}"))
    }
}
