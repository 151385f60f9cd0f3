//! Screensaver widgets
//!
//! Small non-interactive pieces of content (clock, session info) shown on
//! top of the shield. Widget kinds are described by a [`WidgetClass`]; the
//! shield creates one live instance per registered class when it activates
//! and destroys them all when it hides.

pub mod clock;
pub mod layout;
pub mod registry;
pub mod session_info;

use anyhow::Result;
use std::fmt;

pub use layout::{Cell, FloatPosition, Occupancy};
pub use registry::{MAX_WIDGETS, WidgetRegistry};

/// A live screensaver widget
pub trait ScreensaverWidget {
    /// Anchor cell used while the unlock dialog is up
    fn awake_position(&self) -> Cell;

    /// Natural width in pixels
    fn preferred_width(&self) -> u32;

    /// Natural height in pixels for the given width
    fn preferred_height(&self, width: u32) -> u32;

    /// Text content to render
    fn label(&self) -> String;

    /// The unlock dialog came up
    fn on_awake(&mut self) {}

    /// The unlock dialog went away, the shield is idle again
    fn on_asleep(&mut self) {}

    /// The shield is about to destroy this widget
    fn on_deactivated(&mut self) {}
}

/// Constructor for a widget kind
pub type WidgetBuilder = fn() -> Result<Box<dyn ScreensaverWidget>>;

/// A registrable widget kind; identity is the stable `id`
#[derive(Clone, Copy)]
pub struct WidgetClass {
    id: &'static str,
    build: WidgetBuilder,
}

impl WidgetClass {
    pub const fn new(id: &'static str, build: WidgetBuilder) -> Self {
        Self { id, build }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    /// Create a new instance of this widget kind
    pub fn build(&self) -> Result<Box<dyn ScreensaverWidget>> {
        (self.build)()
    }
}

impl PartialEq for WidgetClass {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WidgetClass {}

impl fmt::Debug for WidgetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WidgetClass").field(&self.id).finish()
    }
}

/// Widgets shipped with the lock screen
pub fn builtin_classes() -> [WidgetClass; 2] {
    [clock::CLASS, session_info::CLASS]
}

/// Rough text extent used by the built-in widgets
pub(crate) fn text_extent(text: &str, char_width: u32, line_height: u32, width: u32) -> u32 {
    let chars_per_line = (width / char_width.max(1)).max(1) as usize;
    let lines: usize = text
        .lines()
        .map(|line| line.chars().count().div_ceil(chars_per_line).max(1))
        .sum();
    lines.max(1) as u32 * line_height
}
