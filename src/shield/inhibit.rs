//! Sleep inhibitor bookkeeping
//!
//! An inhibitor is held exactly while locking is enabled and the screensaver
//! is shown but not yet locked, so a suspend in that window waits for the lock.

use tracing::{debug, info, warn};

use super::host::{InhibitTicket, Inhibitor};
use super::{INHIBIT_REASON, ScreenShield, State};

#[derive(Debug, Default)]
pub(super) struct InhibitorSlot {
    held: Option<Inhibitor>,
    /// Outstanding request; any grant carrying another ticket is stale
    pending: Option<InhibitTicket>,
    next: u64,
}

impl InhibitorSlot {
    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    fn next_ticket(&mut self) -> InhibitTicket {
        self.next += 1;
        InhibitTicket(self.next)
    }
}

impl ScreenShield {
    fn wants_inhibitor(&self) -> bool {
        self.settings.lock_enabled && self.state == State::Shown
    }

    /// Request or release the inhibitor to match the current state
    pub(super) fn sync_inhibitor(&mut self) {
        if self.wants_inhibitor() {
            if self.inhibitor.held.is_none() && self.inhibitor.pending.is_none() {
                let ticket = self.inhibitor.next_ticket();
                debug!("Requesting sleep inhibitor ({:?})", ticket);
                self.inhibitor.pending = Some(ticket);
                self.session.request_inhibitor(INHIBIT_REASON, ticket);
            }
            return;
        }

        // A grant for the forgotten request is closed as stale when it lands
        self.inhibitor.pending = None;
        if let Some(inhibitor) = self.inhibitor.held.take() {
            info!("Releasing sleep inhibitor");
            inhibitor.close();
        }
    }

    pub(super) fn inhibitor_ready(&mut self, ticket: InhibitTicket, inhibitor: Option<Inhibitor>) {
        if self.inhibitor.pending != Some(ticket) {
            debug!("Dropping stale inhibitor grant ({:?})", ticket);
            if let Some(inhibitor) = inhibitor {
                inhibitor.close();
            }
            return;
        }
        self.inhibitor.pending = None;

        let Some(inhibitor) = inhibitor else {
            warn!("Sleep inhibitor request failed");
            return;
        };

        if self.wants_inhibitor() {
            info!("Holding sleep inhibitor");
            self.inhibitor.held = Some(inhibitor);
        } else {
            inhibitor.close();
        }
    }
}
