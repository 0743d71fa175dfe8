//! Background-execution session bookkeeping.
//!
//! The host grants at most one background session at a time so that step
//! polling keeps running while the watch face is off. Grants expire; the slot
//! tracks the live handle and whether a replacement has been requested.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const STATUS_IDLE: &str = "Not monitoring";
pub const STATUS_REQUESTED: &str = "Starting background session";
pub const STATUS_RUNNING: &str = "Monitoring in background";
pub const STATUS_EXPIRED: &str = "Background session expired";
pub const STATUS_RESTARTING: &str = "Background session expired, restarting";
pub const STATUS_ENDED: &str = "Background session ended";

/// Opaque id of a background session granted by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BackgroundHandle(pub u64);

impl fmt::Display for BackgroundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bg-{}", self.0)
    }
}

/// What the controller should do after a background event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    /// Nothing further to do.
    Settled,
    /// The event referred to a handle other than the live one.
    Stale,
    /// A second grant arrived while one is live; end the extra one.
    Surplus(BackgroundHandle),
}

#[derive(Debug, Clone)]
pub struct BackgroundSlot {
    live: Option<BackgroundHandle>,
    requested: bool,
    status: &'static str,
}

impl Default for BackgroundSlot {
    fn default() -> Self {
        Self {
            live: None,
            requested: false,
            status: STATUS_IDLE,
        }
    }
}

impl BackgroundSlot {
    pub const fn live(&self) -> Option<BackgroundHandle> {
        self.live
    }

    /// Human-readable status line for the monitoring screen.
    pub const fn status(&self) -> &'static str {
        self.status
    }

    /// Whether a new session may be requested: nothing live, nothing in flight.
    pub const fn can_request(&self) -> bool {
        self.live.is_none() && !self.requested
    }

    pub const fn mark_requested(&mut self) {
        self.requested = true;
        self.status = STATUS_REQUESTED;
    }

    pub fn started(&mut self, handle: BackgroundHandle) -> SlotOutcome {
        if let Some(live) = self.live {
            if live != handle {
                return SlotOutcome::Surplus(handle);
            }
        }
        self.live = Some(handle);
        self.requested = false;
        self.status = STATUS_RUNNING;
        SlotOutcome::Settled
    }

    /// The grant is about to run out. The handle is dropped; the caller
    /// decides whether a restart is warranted.
    pub fn expiring(&mut self, handle: BackgroundHandle) -> SlotOutcome {
        if self.live != Some(handle) {
            return SlotOutcome::Stale;
        }
        self.live = None;
        self.status = STATUS_EXPIRED;
        SlotOutcome::Settled
    }

    /// The host tore the session down. No automatic restart.
    pub fn invalidated(&mut self, handle: Option<BackgroundHandle>) -> SlotOutcome {
        if handle.is_some() && handle != self.live {
            return SlotOutcome::Stale;
        }
        self.live = None;
        self.requested = false;
        self.status = STATUS_ENDED;
        SlotOutcome::Settled
    }

    /// A replacement for the expired grant has been scheduled.
    pub const fn mark_restart_pending(&mut self) {
        if self.live.is_none() {
            self.status = STATUS_RESTARTING;
        }
    }

    /// Release the slot when monitoring stops. Returns the handle to end.
    pub const fn release(&mut self) -> Option<BackgroundHandle> {
        self.requested = false;
        self.status = STATUS_IDLE;
        self.live.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_slot_is_idle() {
        let slot = BackgroundSlot::default();
        assert_eq!(slot.live(), None);
        assert!(slot.can_request());
        assert_eq!(slot.status(), STATUS_IDLE);
    }

    #[test]
    fn test_start_records_single_live_handle() {
        let mut slot = BackgroundSlot::default();
        slot.mark_requested();
        assert!(!slot.can_request());
        assert_eq!(slot.started(BackgroundHandle(1)), SlotOutcome::Settled);
        assert_eq!(slot.live(), Some(BackgroundHandle(1)));
        assert_eq!(slot.status(), STATUS_RUNNING);
    }

    #[test]
    fn test_second_grant_is_surplus() {
        let mut slot = BackgroundSlot::default();
        slot.started(BackgroundHandle(1));
        assert_eq!(
            slot.started(BackgroundHandle(2)),
            SlotOutcome::Surplus(BackgroundHandle(2))
        );
        assert_eq!(slot.live(), Some(BackgroundHandle(1)));
    }

    #[test]
    fn test_expiry_clears_live_handle() {
        let mut slot = BackgroundSlot::default();
        slot.started(BackgroundHandle(1));
        assert_eq!(slot.expiring(BackgroundHandle(1)), SlotOutcome::Settled);
        assert_eq!(slot.live(), None);
        assert!(slot.can_request());
        assert_eq!(slot.status(), STATUS_EXPIRED);
    }

    #[test]
    fn test_restart_pending_status_follows_expiry() {
        let mut slot = BackgroundSlot::default();
        slot.started(BackgroundHandle(1));
        slot.expiring(BackgroundHandle(1));
        slot.mark_restart_pending();
        assert_eq!(slot.status(), STATUS_RESTARTING);

        slot.started(BackgroundHandle(2));
        slot.mark_restart_pending();
        assert_eq!(slot.status(), STATUS_RUNNING);
    }

    #[test]
    fn test_expiry_of_unknown_handle_is_stale() {
        let mut slot = BackgroundSlot::default();
        slot.started(BackgroundHandle(3));
        assert_eq!(slot.expiring(BackgroundHandle(2)), SlotOutcome::Stale);
        assert_eq!(slot.live(), Some(BackgroundHandle(3)));
    }

    #[test]
    fn test_invalidation_resets_status() {
        let mut slot = BackgroundSlot::default();
        slot.started(BackgroundHandle(1));
        assert_eq!(slot.invalidated(None), SlotOutcome::Settled);
        assert_eq!(slot.live(), None);
        assert_eq!(slot.status(), STATUS_ENDED);
    }

    #[test]
    fn test_release_returns_live_handle() {
        let mut slot = BackgroundSlot::default();
        slot.started(BackgroundHandle(7));
        assert_eq!(slot.release(), Some(BackgroundHandle(7)));
        assert_eq!(slot.release(), None);
        assert_eq!(slot.status(), STATUS_IDLE);
    }
}
