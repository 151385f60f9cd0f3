//! Monitor layout tracking while the shield is up

use tracing::{debug, info, warn};

use crate::shared::geometry::{monitor_at_point, primary_monitor};

use super::{ScreenShield, State};

impl ScreenShield {
    /// Refresh the monitor list and build one background per monitor
    pub(super) fn rebuild_backgrounds(&mut self) {
        self.monitors = self.compositor.monitors();
        if self.monitors.is_empty() {
            warn!("Compositor reported no monitors");
        }

        debug!("Building shield backgrounds for {} monitor(s)", self.monitors.len());
        self.view.set_backgrounds(&self.monitors);
        self.pointer_monitor = Some(self.compositor.pointer_monitor());
        self.place_info_panel();
    }

    pub(super) fn clear_backgrounds(&mut self) {
        self.view.clear_backgrounds();
        self.monitors.clear();
        self.pointer_monitor = None;
    }

    /// Monitor that hosts the dialog and awake widgets
    pub(super) fn awake_monitor_index(&self) -> usize {
        self.pointer_monitor
            .filter(|&index| index < self.monitors.len())
            .unwrap_or_else(|| primary_monitor(&self.monitors))
    }

    fn place_info_panel(&mut self) {
        let index = self.awake_monitor_index();
        if let Some(monitor) = self.monitors.get(index) {
            self.view.place_info_panel(monitor);
        }
    }

    pub(super) fn monitors_changed(&mut self) {
        if self.state == State::Hidden {
            debug!("Monitors changed while hidden, ignoring");
            return;
        }

        info!("Monitors changed, rebuilding screen shield backgrounds");
        self.rebuild_backgrounds();

        if self.state == State::Unlocking && self.dialog_visible {
            // Force the dialog onto whichever monitor now holds the pointer
            self.pointer_monitor = None;
            let (x, y) = self.compositor.pointer_position();
            self.update_pointer_monitor(x, y);

            if self.pointer_monitor.is_none() {
                let index = self.awake_monitor_index();
                debug!("Pointer is off every monitor, using monitor {}", index);
                self.pointer_monitor = Some(index);
                if let Some(monitor) = self.monitors.get(index) {
                    self.view.move_unlock_dialog(monitor);
                }
                self.place_widgets_awake();
                self.place_info_panel();
            }
        } else if !self.widgets.is_empty() {
            if self.settings.floating_widgets && !self.is_awake() {
                self.reassign_floating();
            } else {
                self.place_widgets_awake();
            }
        }
    }

    /// Follow the pointer across monitors
    pub(super) fn update_pointer_monitor(&mut self, x: i32, y: i32) {
        let Some(index) = monitor_at_point(&self.monitors, x, y) else {
            return;
        };
        if self.pointer_monitor == Some(index) {
            return;
        }

        debug!("Pointer moved to monitor {}", index);
        self.pointer_monitor = Some(index);

        if self.state == State::Unlocking && self.dialog_visible {
            self.view.move_unlock_dialog(&self.monitors[index]);
        }
        if self.is_awake() {
            self.place_widgets_awake();
        }
        self.place_info_panel();
    }
}
