//! Live screensaver widgets: loading, waking, floating and teardown

use std::time::Duration;
use tracing::{debug, error, info};

use crate::widgets::layout::{cell_geometry, fit_in_cell};
use crate::widgets::{Cell, FloatPosition, ScreensaverWidget, WidgetClass};

use super::host::WidgetId;
use super::timers::TimerKind;
use super::{ScreenShield, State};

pub(super) struct LiveWidget {
    pub id: WidgetId,
    pub class: &'static str,
    pub widget: Box<dyn ScreensaverWidget>,
    /// Anchor claimed at creation
    pub awake: Cell,
    pub float: Option<FloatPosition>,
}

impl ScreenShield {
    /// Number of live widgets
    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    /// Start building widgets one per idle tick, then start the lock countdown
    pub(super) fn on_widget_load(&mut self) {
        if self.state == State::Hidden {
            return;
        }

        if self.widgets.is_empty() && self.load_index.is_none() {
            debug!("Loading {} screensaver widget(s)", self.registry.len());
            self.load_index = Some(0);
            self.timers.arm(TimerKind::WidgetIdle, Duration::ZERO);
        }

        self.start_lock_delay();
    }

    pub(super) fn load_next_widget(&mut self) {
        let Some(index) = self.load_index else {
            return;
        };

        let Some(class) = self.registry.get(index) else {
            info!("Loaded {} screensaver widget(s)", self.widgets.len());
            self.load_index = None;
            return;
        };

        self.spawn_widget(index, class);
        self.load_index = Some(index + 1);
        self.timers.arm(TimerKind::WidgetIdle, Duration::ZERO);
    }

    fn spawn_widget(&mut self, index: usize, class: WidgetClass) {
        let widget = match class.build() {
            Ok(widget) => widget,
            Err(e) => {
                error!("Failed to create screensaver widget #{} ({}): {:#}", index, class.id(), e);
                return;
            }
        };

        let awake = self.occupancy.claim_awake(widget.awake_position(), class.id());
        let id = WidgetId(self.next_widget_id);
        self.next_widget_id += 1;
        debug!("Created screensaver widget {} as {:?} at {:?}", class.id(), id, awake);

        self.widgets.push(LiveWidget {
            id,
            class: class.id(),
            widget,
            awake,
            float: None,
        });
        let i = self.widgets.len() - 1;

        if self.is_awake() {
            self.widgets[i].widget.on_awake();
            self.place_awake(i);
        } else if self.settings.floating_widgets {
            let position = self.occupancy.assign_float(self.monitors.len(), &mut self.rng);
            self.widgets[i].float = Some(position);
            self.place_floating(i);
            self.start_float_timer();
        } else {
            self.place_awake(i);
        }
    }

    /// The unlock dialog came up: widgets snap to their anchors
    pub(super) fn wake_widgets(&mut self) {
        self.stop_float_timer();
        for i in 0..self.widgets.len() {
            self.widgets[i].widget.on_awake();
            self.place_awake(i);
        }
    }

    /// The unlock dialog went away
    pub(super) fn sleep_widgets(&mut self) {
        for live in &mut self.widgets {
            live.widget.on_asleep();
        }

        if self.settings.floating_widgets {
            self.start_float_timer();
            self.reassign_floating();
        } else {
            self.place_widgets_awake();
        }
    }

    /// Floating was switched on or off
    pub(super) fn sync_widget_mode(&mut self) {
        if self.state == State::Hidden || self.is_awake() || self.widgets.is_empty() {
            return;
        }

        if self.settings.floating_widgets {
            self.start_float_timer();
            self.reassign_floating();
        } else {
            self.stop_float_timer();
            self.occupancy.clear_floating();
            for live in &mut self.widgets {
                live.float = None;
            }
            self.place_widgets_awake();
        }
    }

    pub(super) fn on_float_tick(&mut self) {
        if self.is_awake() || self.widgets.is_empty() || !self.settings.floating_widgets {
            return;
        }

        self.reassign_floating();
        self.timers.arm(TimerKind::FloatTick, self.settings.float_interval);
    }

    fn start_float_timer(&mut self) {
        if !self.timers.is_armed(TimerKind::FloatTick) {
            self.timers.arm(TimerKind::FloatTick, self.settings.float_interval);
        }
    }

    fn stop_float_timer(&mut self) {
        self.timers.cancel(TimerKind::FloatTick);
    }

    /// Give every widget a fresh random position
    pub(super) fn reassign_floating(&mut self) {
        self.occupancy.clear_floating();
        for i in 0..self.widgets.len() {
            let position = self.occupancy.assign_float(self.monitors.len(), &mut self.rng);
            self.widgets[i].float = Some(position);
            self.place_floating(i);
        }
    }

    pub(super) fn place_widgets_awake(&mut self) {
        for i in 0..self.widgets.len() {
            self.place_awake(i);
        }
    }

    fn place_awake(&mut self, i: usize) {
        let index = self.awake_monitor_index();
        let Some(monitor) = self.monitors.get(index) else {
            return;
        };

        let live = &self.widgets[i];
        let cell = cell_geometry(&monitor.geometry, live.awake);
        let rect = fit_in_cell(&cell, live.widget.preferred_width(), |width| {
            live.widget.preferred_height(width)
        });
        self.view.place_widget(live.id, rect, &live.widget.label());
    }

    fn place_floating(&mut self, i: usize) {
        let live = &self.widgets[i];
        let Some(position) = live.float else {
            return;
        };
        let Some(monitor) = self.monitors.get(position.monitor) else {
            debug!("No monitor {} for widget {}", position.monitor, live.class);
            return;
        };

        let cell = cell_geometry(&monitor.geometry, position.cell);
        let rect = fit_in_cell(&cell, live.widget.preferred_width(), |width| {
            live.widget.preferred_height(width)
        });
        self.view.place_widget(live.id, rect, &live.widget.label());
    }

    /// Tear every widget down and free all placements
    pub(super) fn destroy_widgets(&mut self) {
        self.stop_float_timer();
        self.timers.cancel(TimerKind::WidgetLoad);
        self.timers.cancel(TimerKind::WidgetIdle);
        self.load_index = None;

        for mut live in self.widgets.drain(..) {
            live.widget.on_deactivated();
            self.view.remove_widget(live.id);
        }
        self.occupancy.reset();
    }
}
