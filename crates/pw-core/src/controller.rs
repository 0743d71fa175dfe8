//! The activity session controller.
//!
//! Owns all business state and drives it through
//! `Idle → Monitoring → PromptPending → Active ⇄ Paused → Summary`.
//! Host callbacks (sensor samples, timer ticks, user taps) arrive as method
//! calls; requests to the host go out as [`Effect`]s. Calls that make no
//! sense in the current phase are ignored.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::background::{BackgroundHandle, BackgroundSlot, SlotOutcome};
use crate::detection::{DetectionConfig, Detector, MotionSample, Trigger};
use crate::geo::Coordinate;
use crate::host::{Action, Capabilities, Effect, HostError, Notification};
use crate::session::{Session, SessionConfig, SessionSummary};
use crate::view::{
    ActiveView, MonitoringView, Prompt, Screen, SummaryView, ViewModel, format_distance,
    format_duration,
};

/// Controller tuning. Defaults match the watch app.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub detection: DetectionConfig,
    pub session: SessionConfig,
    /// How often the host samples acceleration. Default: 30 s.
    pub motion_sample_interval: Duration,
    /// Duration refresh period. Default: 1 s.
    pub tick_interval: Duration,
    /// Delay before replacing an expired background session. Default: 1 s.
    pub background_restart_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            session: SessionConfig::default(),
            motion_sample_interval: Duration::from_secs(30),
            tick_interval: Duration::from_secs(1),
            background_restart_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Monitoring,
    PromptPending,
    Active,
    Paused,
    Summary,
}

impl Phase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Monitoring => "monitoring",
            Self::PromptPending => "prompt_pending",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Summary => "summary",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Headline figures of the current (or just finished) session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Counters {
    pub elapsed_secs: i64,
    pub distance_m: f64,
    pub steps: u64,
    pub litter: u32,
}

impl Counters {
    pub const ZERO: Self = Self {
        elapsed_secs: 0,
        distance_m: 0.0,
        steps: 0,
        litter: 0,
    };
}

#[derive(Debug)]
pub struct ActivityController {
    config: ControllerConfig,
    capabilities: Capabilities,
    phase: Phase,
    monitoring: bool,
    detector: Detector,
    session: Option<Session>,
    summary: Option<SessionSummary>,
    background: BackgroundSlot,
}

impl ActivityController {
    pub fn new(config: ControllerConfig, capabilities: Capabilities) -> Self {
        let detector = Detector::new(config.detection.clone());
        Self {
            config,
            capabilities,
            phase: Phase::Idle,
            monitoring: false,
            detector,
            session: None,
            summary: None,
            background: BackgroundSlot::default(),
        }
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    pub const fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub const fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub const fn background_handle(&self) -> Option<BackgroundHandle> {
        self.background.live()
    }

    pub const fn background_status(&self) -> &'static str {
        self.background.status()
    }

    pub fn counters(&self) -> Counters {
        if let Some(session) = &self.session {
            Counters {
                elapsed_secs: session.elapsed().num_seconds(),
                distance_m: session.distance_m(),
                steps: session.steps(),
                litter: session.litter_count(),
            }
        } else if let Some(summary) = &self.summary {
            Counters {
                elapsed_secs: summary.duration_secs,
                distance_m: summary.distance_m,
                steps: summary.steps,
                litter: summary.litter_count,
            }
        } else {
            Counters::ZERO
        }
    }

    pub fn start_monitoring(&mut self) -> Vec<Effect> {
        if self.monitoring {
            tracing::debug!("already monitoring");
            return Vec::new();
        }
        if !self.capabilities.step_counting {
            tracing::info!("step counting unavailable, not starting monitoring");
            return Vec::new();
        }

        self.monitoring = true;
        self.detector.reset();
        if let Some(session) = &mut self.session {
            session.restart_pedometer();
        }
        if self.phase == Phase::Idle {
            self.set_phase(Phase::Monitoring);
        }

        let mut effects = vec![Effect::StartStepUpdates];
        if self.capabilities.motion {
            effects.push(Effect::StartMotionSampling {
                interval: self.config.motion_sample_interval,
            });
        }
        if self.background.can_request() {
            self.background.mark_requested();
            effects.push(Effect::RequestBackgroundSession);
        }
        effects.push(Effect::LogAction(Action::StartMonitoring));
        effects
    }

    /// Stop step polling and give up the background session. A running
    /// session is left alone; only the monitoring flag is cleared.
    pub fn stop_monitoring(&mut self) -> Vec<Effect> {
        if !self.monitoring {
            return Vec::new();
        }
        self.monitoring = false;

        let mut effects = Vec::new();
        match self.phase {
            Phase::PromptPending => {
                effects.push(Effect::HidePrompt);
                self.set_phase(Phase::Idle);
            }
            Phase::Monitoring => self.set_phase(Phase::Idle),
            _ => {}
        }

        effects.push(Effect::StopStepUpdates);
        if self.capabilities.motion {
            effects.push(Effect::StopMotionSampling);
        }
        if let Some(handle) = self.background.release() {
            effects.push(Effect::EndBackgroundSession(handle));
        }
        effects.push(Effect::LogAction(Action::StopMonitoring));
        effects
    }

    /// Cumulative pedometer count since step updates started.
    pub fn steps(&mut self, total: u64) -> Vec<Effect> {
        if !self.monitoring {
            tracing::debug!(total, "step sample while not monitoring, ignored");
            return Vec::new();
        }
        let trigger = self.detector.observe_steps(total);
        if let Some(session) = &mut self.session {
            session.record_steps(total);
        }
        trigger.map_or_else(Vec::new, |trigger| self.raise_prompt(trigger))
    }

    /// Periodic acceleration sample.
    pub fn motion(&mut self, sample: MotionSample) -> Vec<Effect> {
        if !self.monitoring {
            return Vec::new();
        }
        self.detector
            .observe_motion(sample)
            .map_or_else(Vec::new, |trigger| self.raise_prompt(trigger))
    }

    /// A location fix. Only counted while a session is running.
    pub fn location(&mut self, fix: Coordinate) {
        if self.phase != Phase::Active {
            tracing::debug!(phase = %self.phase, "location fix outside active session, ignored");
            return;
        }
        let floor = self.config.session.distance_noise_floor_m;
        if let Some(session) = &mut self.session {
            if let Some(delta) = session.record_fix(fix, floor) {
                tracing::debug!(
                    delta_m = delta,
                    total_m = session.distance_m(),
                    "distance accumulated"
                );
            }
        }
    }

    /// Duration timer fired.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.phase != Phase::Active {
            return;
        }
        if let Some(session) = &mut self.session {
            session.tick(now);
        }
    }

    fn raise_prompt(&mut self, trigger: Trigger) -> Vec<Effect> {
        if self.phase != Phase::Monitoring {
            tracing::debug!(?trigger, phase = %self.phase, "trigger suppressed");
            return Vec::new();
        }
        tracing::info!(?trigger, "walking detected");
        self.set_phase(Phase::PromptPending);
        vec![
            Effect::Notify(Notification::activity_detected()),
            Effect::ShowPrompt,
            Effect::LogAction(Action::ActivityDetected),
        ]
    }

    /// The user tapped the detection notification.
    pub fn notification_tapped(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Monitoring {
            return Vec::new();
        }
        self.set_phase(Phase::PromptPending);
        vec![Effect::ShowPrompt]
    }

    pub fn confirm_activity(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        if self.phase != Phase::PromptPending {
            tracing::debug!(phase = %self.phase, "confirm without pending prompt, ignored");
            return Vec::new();
        }
        let mut effects = vec![Effect::HidePrompt];
        effects.extend(self.begin_session(now));
        effects.push(Effect::LogAction(Action::ActivityConfirmed));
        effects
    }

    pub fn dismiss_prompt(&mut self) -> Vec<Effect> {
        if self.phase != Phase::PromptPending {
            return Vec::new();
        }
        self.set_phase(Phase::Monitoring);
        vec![
            Effect::HidePrompt,
            Effect::LogAction(Action::ActivityDismissed),
        ]
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        if self.phase != Phase::Active {
            return Vec::new();
        }
        if let Some(session) = &mut self.session {
            session.pause(now);
        }
        self.set_phase(Phase::Paused);
        vec![
            Effect::StopDurationTick,
            Effect::StopLocationUpdates,
            Effect::LogAction(Action::ActivityPaused),
        ]
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        if self.phase != Phase::Paused {
            return Vec::new();
        }
        if let Some(session) = &mut self.session {
            session.resume(now);
        }
        self.set_phase(Phase::Active);
        vec![
            Effect::StartLocationUpdates,
            Effect::StartDurationTick {
                interval: self.config.tick_interval,
            },
            Effect::LogAction(Action::ActivityResumed),
        ]
    }

    /// Count one collected litter item at the last known location.
    pub fn collect_litter(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Active {
            return Vec::new();
        }
        let Some(session) = &mut self.session else {
            return Vec::new();
        };
        let at = session.collect_litter();
        tracing::info!(count = session.litter_count(), located = at.is_some(), "litter collected");
        vec![Effect::LogAction(Action::LitterCollected)]
    }

    pub fn end_activity(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        let was_active = match self.phase {
            Phase::Active => true,
            Phase::Paused => false,
            _ => return Vec::new(),
        };
        let Some(session) = self.session.take() else {
            return Vec::new();
        };
        let summary = session.finish(now);
        tracing::info!(
            session = %summary.id,
            duration_secs = summary.duration_secs,
            distance_m = summary.distance_m,
            litter = summary.litter_count,
            "session ended"
        );
        self.summary = Some(summary);
        self.set_phase(Phase::Summary);

        let mut effects = Vec::new();
        if was_active {
            effects.push(Effect::StopDurationTick);
            effects.push(Effect::StopLocationUpdates);
        }
        effects.push(Effect::LogAction(Action::ActivityEnded));
        effects
    }

    /// Discard the summary and immediately start a fresh session.
    pub fn new_activity(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        if self.phase != Phase::Summary {
            return Vec::new();
        }
        let mut effects = self.begin_session(now);
        effects.push(Effect::LogAction(Action::NewActivity));
        effects
    }

    /// Discard the summary and go back to monitoring (or idle).
    pub fn close_summary(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Summary {
            return Vec::new();
        }
        self.summary = None;
        self.session = None;
        self.set_phase(if self.monitoring {
            Phase::Monitoring
        } else {
            Phase::Idle
        });
        vec![Effect::LogAction(Action::SummaryClosed)]
    }

    fn begin_session(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        self.summary = None;
        let session = Session::start(now, self.detector.last_step_count());
        tracing::info!(session = %session.id(), "session started");
        self.session = Some(session);
        self.set_phase(Phase::Active);
        vec![
            Effect::StartLocationUpdates,
            Effect::StartDurationTick {
                interval: self.config.tick_interval,
            },
        ]
    }

    pub fn background_started(&mut self, handle: BackgroundHandle) -> Vec<Effect> {
        if !self.monitoring {
            tracing::debug!(%handle, "background session granted after monitoring stopped");
            return vec![Effect::EndBackgroundSession(handle)];
        }
        match self.background.started(handle) {
            SlotOutcome::Surplus(extra) => {
                tracing::warn!(%extra, "second background session granted, ending it");
                vec![Effect::EndBackgroundSession(extra)]
            }
            SlotOutcome::Settled | SlotOutcome::Stale => {
                tracing::debug!(%handle, "background session running");
                Vec::new()
            }
        }
    }

    pub fn background_expiring(&mut self, handle: BackgroundHandle) -> Vec<Effect> {
        if self.background.expiring(handle) == SlotOutcome::Stale {
            return Vec::new();
        }
        tracing::info!(%handle, "background session expiring");
        if self.monitoring {
            self.background.mark_restart_pending();
            vec![Effect::ScheduleBackgroundRestart {
                delay: self.config.background_restart_delay,
            }]
        } else {
            Vec::new()
        }
    }

    pub fn background_restart_due(&mut self) -> Vec<Effect> {
        if !self.monitoring || !self.background.can_request() {
            return Vec::new();
        }
        self.background.mark_requested();
        vec![Effect::RequestBackgroundSession]
    }

    /// The host invalidated the session (or refused to start one). No restart
    /// is attempted; the user has to start monitoring again.
    pub fn background_invalidated(&mut self, handle: Option<BackgroundHandle>) {
        if self.background.invalidated(handle) == SlotOutcome::Settled {
            tracing::warn!(?handle, "background session invalidated");
        }
    }

    /// Sensor, permission, and network failures are logged and swallowed.
    pub fn host_error(&mut self, error: &HostError) {
        tracing::warn!(%error, "host error");
        if *error == HostError::BackgroundSessionInvalidated {
            self.background_invalidated(None);
        }
    }

    pub fn view(&self) -> ViewModel {
        let screen = match (self.phase, &self.session, &self.summary) {
            (Phase::Active | Phase::Paused, Some(session), _) => Screen::ActiveSession(ActiveView {
                duration: format_duration(session.elapsed()),
                distance: format_distance(session.distance_m()),
                steps: session.steps(),
                litter: session.litter_count(),
                paused: session.is_paused(),
            }),
            (Phase::Summary, _, Some(summary)) => Screen::Summary(SummaryView::from_summary(summary)),
            _ => Screen::Monitoring(MonitoringView {
                monitoring: self.monitoring,
                status: self.background.status().to_string(),
                steps: self.detector.last_step_count(),
            }),
        };
        let dialog = (self.phase == Phase::PromptPending).then(Prompt::walking);
        ViewModel { screen, dialog }
    }

    fn set_phase(&mut self, next: Phase) {
        if self.phase != next {
            tracing::debug!(from = %self.phase, to = %next, "phase change");
            self.phase = next;
        }
    }
}
