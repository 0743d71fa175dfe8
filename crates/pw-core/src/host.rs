//! The boundary between the controller and the host platform.
//!
//! The controller never talks to sensors, timers, or the network directly.
//! Every request it makes of the host is returned as an [`Effect`], and
//! everything the host reports back arrives as a method call on
//! [`ActivityController`](crate::ActivityController).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::background::BackgroundHandle;

/// A request from the controller to the host platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartStepUpdates,
    StopStepUpdates,
    /// Sample device acceleration every `interval`.
    StartMotionSampling { interval: Duration },
    StopMotionSampling,
    StartLocationUpdates,
    StopLocationUpdates,
    /// Deliver [`tick`](crate::ActivityController::tick) every `interval`.
    StartDurationTick { interval: Duration },
    StopDurationTick,
    /// Present the "are you walking?" confirmation dialog.
    ShowPrompt,
    /// Take the confirmation dialog down.
    HidePrompt,
    Notify(Notification),
    RequestBackgroundSession,
    EndBackgroundSession(BackgroundHandle),
    /// Call [`background_restart_due`](crate::ActivityController::background_restart_due)
    /// once `delay` has elapsed.
    ScheduleBackgroundRestart { delay: Duration },
    /// Fire-and-forget diagnostic log of a user-visible action.
    LogAction(Action),
}

/// A local notification with the default sound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub(crate) fn activity_detected() -> Self {
        Self {
            title: "Activity detected".to_string(),
            body: "Looks like you're walking. Start a litter pick?".to_string(),
        }
    }
}

/// Actions reported to the diagnostic endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    StartMonitoring,
    StopMonitoring,
    ActivityDetected,
    ActivityConfirmed,
    ActivityDismissed,
    ActivityPaused,
    ActivityResumed,
    ActivityEnded,
    LitterCollected,
    NewActivity,
    SummaryClosed,
}

impl Action {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StartMonitoring => "start_monitoring",
            Self::StopMonitoring => "stop_monitoring",
            Self::ActivityDetected => "activity_detected",
            Self::ActivityConfirmed => "activity_confirmed",
            Self::ActivityDismissed => "activity_dismissed",
            Self::ActivityPaused => "activity_paused",
            Self::ActivityResumed => "activity_resumed",
            Self::ActivityEnded => "activity_ended",
            Self::LitterCollected => "litter_collected",
            Self::NewActivity => "new_activity",
            Self::SummaryClosed => "summary_closed",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the device can do, as reported by the host at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub step_counting: bool,
    pub motion: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            step_counting: true,
            motion: true,
        }
    }
}

/// Failures reported by the host. None of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("sensor unavailable: {0}")]
    SensorUnavailable(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("background session invalidated")]
    BackgroundSessionInvalidated,
}
