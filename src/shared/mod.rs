//! Shared geometry types used by the shield core and the X11 host.

pub mod geometry;

pub use geometry::{Geometry, Monitor};
