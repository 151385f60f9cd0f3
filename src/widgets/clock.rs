//! Clock widget

use anyhow::Result;
use chrono::{DateTime, Local};

use super::{Cell, ScreensaverWidget, WidgetClass, text_extent};

pub const CLASS: WidgetClass = WidgetClass::new("clock", build);

const CHAR_WIDTH: u32 = 28;
const LINE_HEIGHT: u32 = 64;

fn build() -> Result<Box<dyn ScreensaverWidget>> {
    Ok(Box::new(ClockWidget::new()))
}

/// Shows the time; adds the date while the unlock dialog is up
pub struct ClockWidget {
    awake: bool,
    now: fn() -> DateTime<Local>,
}

impl ClockWidget {
    pub fn new() -> Self {
        Self {
            awake: false,
            now: Local::now,
        }
    }
}

impl Default for ClockWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreensaverWidget for ClockWidget {
    fn awake_position(&self) -> Cell {
        Cell::TOP_CENTER
    }

    fn preferred_width(&self) -> u32 {
        self.label()
            .lines()
            .map(|line| line.chars().count() as u32 * CHAR_WIDTH)
            .max()
            .unwrap_or(0)
    }

    fn preferred_height(&self, width: u32) -> u32 {
        text_extent(&self.label(), CHAR_WIDTH, LINE_HEIGHT, width)
    }

    fn label(&self) -> String {
        let now = (self.now)();
        if self.awake {
            format!("{}\n{}", now.format("%H:%M"), now.format("%A, %B %-d"))
        } else {
            now.format("%H:%M").to_string()
        }
    }

    fn on_awake(&mut self) {
        self.awake = true;
    }

    fn on_asleep(&mut self) {
        self.awake = false;
    }
}
