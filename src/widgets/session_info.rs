//! Session info widget: who is logged in, on which machine

use anyhow::Result;

use super::{Cell, ScreensaverWidget, WidgetClass, text_extent};

pub const CLASS: WidgetClass = WidgetClass::new("session-info", build);

const CHAR_WIDTH: u32 = 12;
const LINE_HEIGHT: u32 = 24;

fn build() -> Result<Box<dyn ScreensaverWidget>> {
    Ok(Box::new(SessionInfoWidget::from_env()))
}

pub struct SessionInfoWidget {
    user: String,
    host: String,
}

impl SessionInfoWidget {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
        }
    }

    /// Read user and host name from the environment
    pub fn from_env() -> Self {
        let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
        let host = std::env::var("HOSTNAME")
            .ok()
            .or_else(|| {
                std::fs::read_to_string("/etc/hostname")
                    .ok()
                    .map(|h| h.trim().to_string())
            })
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_string());

        Self::new(user, host)
    }
}

impl ScreensaverWidget for SessionInfoWidget {
    fn awake_position(&self) -> Cell {
        Cell::BOTTOM_CENTER
    }

    fn preferred_width(&self) -> u32 {
        self.label().chars().count() as u32 * CHAR_WIDTH
    }

    fn preferred_height(&self, width: u32) -> u32 {
        text_extent(&self.label(), CHAR_WIDTH, LINE_HEIGHT, width)
    }

    fn label(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label() {
        let widget = SessionInfoWidget::new("ada", "engine");
        assert_eq!(widget.label(), "ada@engine");
        assert_eq!(widget.preferred_width(), 10 * CHAR_WIDTH);
    }

    #[test]
    fn test_narrow_cell_wraps_to_more_lines() {
        let widget = SessionInfoWidget::new("ada", "engine");
        assert_eq!(widget.preferred_height(5 * CHAR_WIDTH), 2 * LINE_HEIGHT);
    }
}
