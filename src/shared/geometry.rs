//! Rectangles and monitors
//!
//! Monitor geometry as reported by the display server, in root-window
//! coordinates. The shield only ever reads these; they are refreshed on
//! every monitors-changed notification.

/// Axis-aligned rectangle in root coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether the point lies inside this rectangle (right/bottom edges excluded)
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && x < self.x + self.width as i32
            && y >= self.y
            && y < self.y + self.height as i32
    }

    /// Check if two geometries overlap
    pub fn overlaps(&self, other: &Geometry) -> bool {
        !(self.x + self.width as i32 <= other.x
            || other.x + other.width as i32 <= self.x
            || self.y + self.height as i32 <= other.y
            || other.y + other.height as i32 <= self.y)
    }
}

/// Monitor/Output device information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    pub geometry: Geometry,
    pub name: String,
    pub primary: bool,
}

impl Monitor {
    pub fn new(name: impl Into<String>, geometry: Geometry, primary: bool) -> Self {
        Self {
            geometry,
            name: name.into(),
            primary,
        }
    }
}

/// Find the index of the monitor containing a point
pub fn monitor_at_point(monitors: &[Monitor], x: i32, y: i32) -> Option<usize> {
    monitors.iter().position(|m| m.geometry.contains(x, y))
}

/// Index of the primary monitor, or the first one
pub fn primary_monitor(monitors: &[Monitor]) -> usize {
    monitors.iter().position(|m| m.primary).unwrap_or(0)
}
