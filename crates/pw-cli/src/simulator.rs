//! Host simulator: plays the role of the watch OS around the controller.
//!
//! The simulator owns a virtual clock and the host-side resources the
//! controller asks for (pedometer, location, timers, background sessions,
//! notifications, diagnostic logging). Scripted events are delivered in
//! order; periodic timers fire at their due times in between.

use std::collections::VecDeque;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};

use pw_core::{
    Action, ActivityController, BackgroundHandle, Coordinate, Effect, HostError, MotionSample,
    ViewModel,
};

use crate::Config;
use crate::scenario::ScriptEvent;

/// A repeating host timer on the virtual clock.
#[derive(Debug, Clone, Copy)]
struct Timer {
    interval: u64,
    next_due: u64,
}

impl Timer {
    fn every(interval: std::time::Duration, now: u64) -> Self {
        let interval = interval.as_secs().max(1);
        Self {
            interval,
            next_due: now + interval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Due {
    Tick,
    MotionSample,
    BackgroundRestart,
}

/// Fire-and-forget diagnostic logging on a tokio runtime.
struct Diagnostics {
    runtime: tokio::runtime::Runtime,
    client: pw_diag::Client,
    in_flight: Vec<tokio::task::JoinHandle<()>>,
}

impl Diagnostics {
    fn new(endpoint: &str) -> Result<Self> {
        let runtime =
            tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
        let client = pw_diag::Client::new(endpoint).context("failed to create diagnostic client")?;
        Ok(Self {
            runtime,
            client,
            in_flight: Vec::new(),
        })
    }

    fn send(&mut self, action: Action, at: DateTime<Utc>) {
        let client = self.client.clone();
        let log = pw_diag::ActionLog::new(action, at);
        self.in_flight
            .push(self.runtime.spawn(async move { client.report(log).await }));
    }

    /// Wait for outstanding requests; each is bounded by the client timeout.
    fn drain(self) {
        let Self {
            runtime, in_flight, ..
        } = self;
        runtime.block_on(async {
            for handle in in_flight {
                if let Err(err) = handle.await {
                    tracing::warn!(error = %err, "diagnostic task failed");
                }
            }
        });
    }
}

pub struct Simulator<'w, W: Write> {
    controller: ActivityController,
    out: &'w mut W,
    epoch: DateTime<Utc>,
    clock: u64,
    step_updates: bool,
    location_updates: bool,
    tick: Option<Timer>,
    motion_sampler: Option<Timer>,
    background_restart_at: Option<u64>,
    next_background_id: u64,
    acceleration: MotionSample,
    notifications_authorized: bool,
    diagnostics: Option<Diagnostics>,
    logged: Vec<Action>,
    last_label: String,
}

impl<'w, W: Write> Simulator<'w, W> {
    pub fn new(config: &Config, epoch: DateTime<Utc>, out: &'w mut W) -> Result<Self> {
        let diagnostics = if config.diagnostics_enabled {
            Some(Diagnostics::new(&config.diagnostics_endpoint)?)
        } else {
            None
        };
        let controller =
            ActivityController::new(config.controller_config(), config.capabilities());
        let last_label = label(&controller.view());
        Ok(Self {
            controller,
            out,
            epoch,
            clock: 0,
            step_updates: false,
            location_updates: false,
            tick: None,
            motion_sampler: None,
            background_restart_at: None,
            next_background_id: 1,
            acceleration: MotionSample::new(0.0, 0.0, 0.0),
            notifications_authorized: config.notifications_authorized,
            diagnostics,
            logged: Vec::new(),
            last_label,
        })
    }

    pub const fn controller(&self) -> &ActivityController {
        &self.controller
    }

    /// Actions handed to the diagnostic logger so far.
    pub fn logged_actions(&self) -> &[Action] {
        &self.logged
    }

    fn now(&self) -> DateTime<Utc> {
        self.epoch + Duration::seconds(i64::try_from(self.clock).unwrap_or(i64::MAX))
    }

    /// Run the clock forward to `target`, firing every timer that falls due.
    pub fn advance_to(&mut self, target: u64) -> Result<()> {
        while let Some((at, due)) = self.next_due(target) {
            self.clock = at;
            match due {
                Due::Tick => {
                    if let Some(timer) = &mut self.tick {
                        timer.next_due += timer.interval;
                    }
                    let now = self.now();
                    self.controller.tick(now);
                }
                Due::MotionSample => {
                    if let Some(timer) = &mut self.motion_sampler {
                        timer.next_due += timer.interval;
                    }
                    let effects = self.controller.motion(self.acceleration);
                    self.apply(effects)?;
                }
                Due::BackgroundRestart => {
                    self.background_restart_at = None;
                    let effects = self.controller.background_restart_due();
                    self.apply(effects)?;
                }
            }
            self.report_transition()?;
        }
        self.clock = self.clock.max(target);
        Ok(())
    }

    fn next_due(&self, target: u64) -> Option<(u64, Due)> {
        [
            self.tick.map(|t| (t.next_due, Due::Tick)),
            self.motion_sampler.map(|t| (t.next_due, Due::MotionSample)),
            self.background_restart_at.map(|at| (at, Due::BackgroundRestart)),
        ]
        .into_iter()
        .flatten()
        .filter(|(at, _)| *at <= target)
        .min_by_key(|(at, _)| *at)
    }

    /// Deliver one scripted event at the current clock time.
    pub fn dispatch(&mut self, event: ScriptEvent) -> Result<()> {
        let now = self.now();
        let effects = match event {
            ScriptEvent::StartMonitoring => self.controller.start_monitoring(),
            ScriptEvent::StopMonitoring => self.controller.stop_monitoring(),
            ScriptEvent::Steps { total } => {
                if !self.step_updates {
                    tracing::debug!(total, "pedometer not running, sample dropped");
                    return Ok(());
                }
                self.controller.steps(total)
            }
            ScriptEvent::Motion { x, y, z } => {
                self.acceleration = MotionSample::new(x, y, z);
                Vec::new()
            }
            ScriptEvent::Location { lat, lon } => {
                if !self.location_updates {
                    tracing::debug!(lat, lon, "location updates off, fix dropped");
                    return Ok(());
                }
                self.controller.location(Coordinate::new(lat, lon));
                Vec::new()
            }
            ScriptEvent::NotificationTapped => self.controller.notification_tapped(),
            ScriptEvent::Confirm => self.controller.confirm_activity(now),
            ScriptEvent::Dismiss => self.controller.dismiss_prompt(),
            ScriptEvent::Pause => self.controller.pause(now),
            ScriptEvent::Resume => self.controller.resume(now),
            ScriptEvent::CollectLitter => self.controller.collect_litter(),
            ScriptEvent::End => self.controller.end_activity(now),
            ScriptEvent::NewActivity => self.controller.new_activity(now),
            ScriptEvent::CloseSummary => self.controller.close_summary(),
            ScriptEvent::BackgroundExpiring => match self.controller.background_handle() {
                Some(handle) => self.controller.background_expiring(handle),
                None => Vec::new(),
            },
            ScriptEvent::BackgroundInvalidated => {
                let handle = self.controller.background_handle();
                self.controller.background_invalidated(handle);
                Vec::new()
            }
            ScriptEvent::Error { kind, detail } => {
                self.controller.host_error(&kind.into_host_error(detail));
                Vec::new()
            }
        };
        self.apply(effects)?;
        self.report_transition()
    }

    /// Carry out controller requests. Requests may produce further controller
    /// calls (a granted background session), which are queued behind.
    fn apply(&mut self, effects: Vec<Effect>) -> Result<()> {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            tracing::trace!(?effect, "applying effect");
            match effect {
                Effect::StartStepUpdates => self.step_updates = true,
                Effect::StopStepUpdates => self.step_updates = false,
                Effect::StartMotionSampling { interval } => {
                    self.motion_sampler = Some(Timer::every(interval, self.clock));
                }
                Effect::StopMotionSampling => self.motion_sampler = None,
                Effect::StartLocationUpdates => self.location_updates = true,
                Effect::StopLocationUpdates => self.location_updates = false,
                Effect::StartDurationTick { interval } => {
                    self.tick = Some(Timer::every(interval, self.clock));
                }
                Effect::StopDurationTick => self.tick = None,
                Effect::ShowPrompt | Effect::HidePrompt => {}
                Effect::Notify(notification) => {
                    if self.notifications_authorized {
                        writeln!(
                            self.out,
                            "[{:>5}s] notification: {}: {}",
                            self.clock, notification.title, notification.body
                        )?;
                    } else {
                        self.controller.host_error(&HostError::PermissionDenied(
                            "notifications not authorized".to_string(),
                        ));
                    }
                }
                Effect::RequestBackgroundSession => {
                    let handle = BackgroundHandle(self.next_background_id);
                    self.next_background_id += 1;
                    tracing::debug!(%handle, "background session granted");
                    queue.extend(self.controller.background_started(handle));
                }
                Effect::EndBackgroundSession(handle) => {
                    tracing::debug!(%handle, "background session ended");
                }
                Effect::ScheduleBackgroundRestart { delay } => {
                    self.background_restart_at = Some(self.clock + delay.as_secs());
                }
                Effect::LogAction(action) => {
                    self.logged.push(action);
                    let at = self.now();
                    match &mut self.diagnostics {
                        Some(diagnostics) => diagnostics.send(action, at),
                        None => tracing::debug!(%action, "diagnostics disabled, not sent"),
                    }
                }
            }
        }
        Ok(())
    }

    fn report_transition(&mut self) -> Result<()> {
        let current = label(&self.controller.view());
        if current != self.last_label {
            writeln!(self.out, "[{:>5}s] {current}", self.clock)?;
            self.last_label = current;
        }
        Ok(())
    }

    /// Flush outstanding diagnostic requests and hand back the controller.
    pub fn finish(mut self) -> ActivityController {
        if let Some(diagnostics) = self.diagnostics.take() {
            diagnostics.drain();
        }
        self.controller
    }
}

fn label(view: &ViewModel) -> String {
    if view.dialog.is_some() {
        format!("{} + prompt", view.screen.name())
    } else {
        view.screen.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pw_core::Phase;

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(1_735_689_600, 0).unwrap()
    }

    fn play(sim: &mut Simulator<'_, Vec<u8>>, script: &[(u64, ScriptEvent)]) {
        for (at, event) in script {
            sim.advance_to(*at).unwrap();
            sim.dispatch(event.clone()).unwrap();
        }
    }

    #[test]
    fn test_ticks_fire_every_second_while_active() {
        let config = Config::default();
        let mut out = Vec::new();
        let mut sim = Simulator::new(&config, epoch(), &mut out).unwrap();
        play(
            &mut sim,
            &[
                (0, ScriptEvent::StartMonitoring),
                (2, ScriptEvent::Steps { total: 15 }),
                (3, ScriptEvent::Confirm),
            ],
        );
        sim.advance_to(68).unwrap();
        assert_eq!(sim.controller().counters().elapsed_secs, 65);
    }

    #[test]
    fn test_motion_is_sampled_on_interval() {
        let config = Config::default();
        let mut out = Vec::new();
        let mut sim = Simulator::new(&config, epoch(), &mut out).unwrap();
        play(
            &mut sim,
            &[
                (0, ScriptEvent::StartMonitoring),
                (
                    1,
                    ScriptEvent::Motion {
                        x: 0.3,
                        y: 0.0,
                        z: 0.0,
                    },
                ),
            ],
        );
        sim.advance_to(29).unwrap();
        assert_eq!(sim.controller().phase(), Phase::Monitoring);
        sim.advance_to(30).unwrap();
        assert_eq!(sim.controller().phase(), Phase::PromptPending);
    }

    #[test]
    fn test_fixes_are_dropped_when_location_is_off() {
        let config = Config::default();
        let mut out = Vec::new();
        let mut sim = Simulator::new(&config, epoch(), &mut out).unwrap();
        play(
            &mut sim,
            &[
                (0, ScriptEvent::StartMonitoring),
                (1, ScriptEvent::Steps { total: 12 }),
                (2, ScriptEvent::Confirm),
                (3, ScriptEvent::Location { lat: 0.0, lon: 0.0 }),
                (4, ScriptEvent::Pause),
                (5, ScriptEvent::Location { lat: 1.0, lon: 1.0 }),
            ],
        );
        assert_eq!(sim.controller().session().unwrap().path().len(), 1);
    }

    #[test]
    fn test_expired_background_session_is_replaced_after_delay() {
        let config = Config::default();
        let mut out = Vec::new();
        let mut sim = Simulator::new(&config, epoch(), &mut out).unwrap();
        play(
            &mut sim,
            &[
                (0, ScriptEvent::StartMonitoring),
                (10, ScriptEvent::BackgroundExpiring),
            ],
        );
        assert_eq!(sim.controller().background_handle(), None);
        sim.advance_to(11).unwrap();
        assert_eq!(
            sim.controller().background_handle(),
            Some(BackgroundHandle(2))
        );
    }

    #[test]
    fn test_every_user_action_is_logged() {
        let config = Config::default();
        let mut out = Vec::new();
        let mut sim = Simulator::new(&config, epoch(), &mut out).unwrap();
        play(
            &mut sim,
            &[
                (0, ScriptEvent::StartMonitoring),
                (1, ScriptEvent::Steps { total: 12 }),
                (2, ScriptEvent::Confirm),
                (3, ScriptEvent::CollectLitter),
                (4, ScriptEvent::End),
                (5, ScriptEvent::CloseSummary),
            ],
        );
        assert_eq!(
            sim.logged_actions(),
            &[
                Action::StartMonitoring,
                Action::ActivityDetected,
                Action::ActivityConfirmed,
                Action::LitterCollected,
                Action::ActivityEnded,
                Action::SummaryClosed,
            ]
        );
    }

    #[test]
    fn test_unauthorized_notifications_are_not_shown() {
        let config = Config {
            notifications_authorized: false,
            ..Config::default()
        };
        let mut out = Vec::new();
        let mut sim = Simulator::new(&config, epoch(), &mut out).unwrap();
        play(
            &mut sim,
            &[
                (0, ScriptEvent::StartMonitoring),
                (1, ScriptEvent::Steps { total: 12 }),
            ],
        );
        assert_eq!(sim.controller().phase(), Phase::PromptPending);
        drop(sim);
        let output = String::from_utf8(out).unwrap();
        assert!(!output.contains("notification"));
        assert!(output.contains("monitoring + prompt"));
    }
}
