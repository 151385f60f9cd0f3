//! Widget registry
//!
//! Bounded, ordered list of widget kinds. Owned by the shield; the shell's
//! composition root registers extra kinds through the shield.

use tracing::{debug, info, warn};

use super::{WidgetClass, builtin_classes};

/// Maximum number of registered widget kinds
pub const MAX_WIDGETS: usize = 3;

#[derive(Debug, Default)]
pub struct WidgetRegistry {
    classes: Vec<WidgetClass>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a widget kind. Rejected when full or already present.
    pub fn register(&mut self, class: WidgetClass) -> bool {
        if self.classes.len() >= MAX_WIDGETS {
            warn!(
                "Cannot register screensaver widget '{}': registry is full ({} widgets)",
                class.id(),
                MAX_WIDGETS
            );
            return false;
        }

        if self.classes.contains(&class) {
            warn!("Screensaver widget '{}' is already registered", class.id());
            return false;
        }

        debug!("Registered screensaver widget '{}'", class.id());
        self.classes.push(class);
        true
    }

    /// Remove a widget kind. Fails when it was never registered.
    pub fn deregister(&mut self, class: &WidgetClass) -> bool {
        let Some(index) = self.classes.iter().position(|c| c == class) else {
            warn!("Cannot deregister unknown screensaver widget '{}'", class.id());
            return false;
        };

        self.classes.remove(index);
        debug!("Deregistered screensaver widget '{}'", class.id());
        true
    }

    /// Register the built-in widgets, only if nothing was registered yet
    pub fn register_builtins(&mut self) {
        if !self.classes.is_empty() {
            return;
        }

        for class in builtin_classes() {
            self.register(class);
        }
        info!("Registered {} built-in screensaver widgets", self.classes.len());
    }

    pub fn get(&self, index: usize) -> Option<WidgetClass> {
        self.classes.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
