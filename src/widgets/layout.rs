//! Widget placement
//!
//! Every monitor is split into a 3x3 grid. While the unlock dialog is up,
//! widgets sit at fixed "awake" anchor cells on the monitor under the
//! pointer; the centre cell always belongs to the dialog. While idle,
//! widgets float between random cells of all monitors.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::shared::Geometry;

/// One cell of the 3x3 grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub row: u8,
    pub col: u8,
}

impl Cell {
    pub const TOP_LEFT: Cell = Cell::new(0, 0);
    pub const TOP_CENTER: Cell = Cell::new(0, 1);
    pub const TOP_RIGHT: Cell = Cell::new(0, 2);
    pub const CENTER_LEFT: Cell = Cell::new(1, 0);
    pub const CENTER: Cell = Cell::new(1, 1);
    pub const CENTER_RIGHT: Cell = Cell::new(1, 2);
    pub const BOTTOM_LEFT: Cell = Cell::new(2, 0);
    pub const BOTTOM_CENTER: Cell = Cell::new(2, 1);
    pub const BOTTOM_RIGHT: Cell = Cell::new(2, 2);

    /// All cells, row by row
    pub const ALL: [Cell; 9] = [
        Cell::TOP_LEFT,
        Cell::TOP_CENTER,
        Cell::TOP_RIGHT,
        Cell::CENTER_LEFT,
        Cell::CENTER,
        Cell::CENTER_RIGHT,
        Cell::BOTTOM_LEFT,
        Cell::BOTTOM_CENTER,
        Cell::BOTTOM_RIGHT,
    ];

    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

/// Cell reserved for the unlock dialog
pub const DIALOG_CELL: Cell = Cell::CENTER;

/// Where an idle widget currently floats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloatPosition {
    pub monitor: usize,
    pub cell: Cell,
}

/// Occupied awake anchors and floating positions
#[derive(Debug)]
pub struct Occupancy {
    awake: HashSet<Cell>,
    floating: HashSet<FloatPosition>,
}

impl Occupancy {
    pub fn new() -> Self {
        let mut occupancy = Self {
            awake: HashSet::new(),
            floating: HashSet::new(),
        };
        occupancy.reset();
        occupancy
    }

    /// Forget every claim, keeping only the dialog cell reserved
    pub fn reset(&mut self) {
        self.awake.clear();
        self.awake.insert(DIALOG_CELL);
        self.floating.clear();
    }

    /// Claim an awake anchor for a widget.
    ///
    /// On conflict the first free cell (row by row) is used instead. When the
    /// grid is full the wanted cell is returned anyway; dropping the widget
    /// would be worse than an overlap.
    pub fn claim_awake(&mut self, wanted: Cell, owner: &str) -> Cell {
        if self.awake.insert(wanted) {
            return wanted;
        }

        match Cell::ALL.iter().copied().find(|c| !self.awake.contains(c)) {
            Some(free) => {
                warn!(
                    "Awake position {:?} for widget '{}' is taken, moving it to {:?}",
                    wanted, owner, free
                );
                self.awake.insert(free);
                free
            }
            None => {
                warn!(
                    "No free awake position for widget '{}', overlapping at {:?}",
                    owner, wanted
                );
                wanted
            }
        }
    }

    /// Pick a random unoccupied floating position across all monitors
    pub fn assign_float(&mut self, monitor_count: usize, rng: &mut fastrand::Rng) -> FloatPosition {
        let monitor_count = monitor_count.max(1);
        let free: Vec<FloatPosition> = (0..monitor_count)
            .flat_map(|monitor| Cell::ALL.iter().map(move |&cell| FloatPosition { monitor, cell }))
            .filter(|position| !self.floating.contains(position))
            .collect();

        let position = if free.is_empty() {
            debug!("Every floating position is taken, allowing overlap");
            FloatPosition {
                monitor: rng.usize(..monitor_count),
                cell: Cell::ALL[rng.usize(..Cell::ALL.len())],
            }
        } else {
            free[rng.usize(..free.len())]
        };

        self.floating.insert(position);
        position
    }

    /// Drop every floating claim before a full reassignment
    pub fn clear_floating(&mut self) {
        self.floating.clear();
    }

    pub fn awake_cells(&self) -> &HashSet<Cell> {
        &self.awake
    }

    pub fn floating_positions(&self) -> &HashSet<FloatPosition> {
        &self.floating
    }
}

impl Default for Occupancy {
    fn default() -> Self {
        Self::new()
    }
}

/// Rectangle covered by a grid cell of a monitor
pub fn cell_geometry(monitor: &Geometry, cell: Cell) -> Geometry {
    let width = monitor.width / 3;
    let height = monitor.height / 3;

    Geometry {
        x: monitor.x + (cell.col as u32 * width) as i32,
        y: monitor.y + (cell.row as u32 * height) as i32,
        width,
        height,
    }
}

/// Center a widget in its cell, clamping it to the cell size.
///
/// Width is clamped first and the height is then asked for against the
/// clamped width, so wrapped content never spills into a neighbouring cell.
pub fn fit_in_cell(
    cell: &Geometry,
    preferred_width: u32,
    height_for_width: impl FnOnce(u32) -> u32,
) -> Geometry {
    let width = preferred_width.min(cell.width);
    let height = height_for_width(width).min(cell.height);

    Geometry {
        x: cell.x + ((cell.width - width) / 2) as i32,
        y: cell.y + ((cell.height - height) / 2) as i32,
        width,
        height,
    }
}
