use std::path::Path;

/// Vertical distance between two text lines, in pixels.
pub const LINE_HEIGHT: i32 = 10;

/// Format hint shown while the operator types a new date.
pub const DATE_FORMAT_HINT: &str = "mm/dd/yyyy/hh/mm/ss";

/// A small monochrome display that shows lines of text.
pub trait StatusDisplay {
    /// Blanks the frame buffer.
    fn clear(&mut self) -> anyhow::Result<()>;

    /// Draws `text` with its top left corner at `(x, y)`.
    fn text(&mut self, text: &str, x: i32, y: i32) -> anyhow::Result<()>;

    /// Sends the frame buffer to the screen.
    fn show(&mut self) -> anyhow::Result<()>;

    /// Replaces the screen content with `screen`.
    fn render(&mut self, screen: &Screen<'_>) -> anyhow::Result<()> {
        self.clear()?;
        for (index, line) in screen.lines().iter().enumerate() {
            self.text(line, 0, index as i32 * LINE_HEIGHT)?;
        }
        self.show()
    }
}

/// Everything the logger tells the operator on its display.
#[derive(Clone, Debug, PartialEq)]
pub enum Screen<'a> {
    NoUsb,
    Mounted { mount_dir: &'a Path },
    ClockLostPower,
    DateEntry { input: &'a str },
    InvalidInput,
    Recording { count: u32 },
    Finished,
    Fault,
}

impl Screen<'_> {
    /// The text lines of this screen, top to bottom.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Screen::NoUsb => vec!["No USB Present...".into()],
            Screen::Mounted { mount_dir } => vec![
                format!("Mount on {}", mount_dir.display()),
                "Press Record Button".into(),
                "To Begin".into(),
            ],
            Screen::ClockLostPower => vec![
                "Power to RTC Was Lost".into(),
                "Please Press Enter".into(),
                "To Re-program rtc".into(),
            ],
            Screen::DateEntry { input } => vec![
                "Enter Date Format".into(),
                DATE_FORMAT_HINT.into(),
                input.to_string(),
            ],
            Screen::InvalidInput => vec![
                "Input Provided was invalid!".into(),
                "Please Re-enter".into(),
            ],
            Screen::Recording { count } => vec![
                "Currently Recording".into(),
                format!("Count: {count}"),
                "Button To Stop".into(),
            ],
            Screen::Finished => vec!["Recording Finished!".into()],
            Screen::Fault => vec!["Recording Stopped".into(), "Error, see console".into()],
        }
    }
}
