//! A single confirmed activity session and its frozen summary.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Coordinate;

/// Aggregation parameters for a running session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Location deltas at or below this many metres are treated as GPS jitter.
    /// Default: 5.0.
    pub distance_noise_floor_m: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            distance_noise_floor_m: 5.0,
        }
    }
}

/// Live counters of a session between confirmation and the summary.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    paused_at: Option<DateTime<Utc>>,
    paused_total: Duration,
    elapsed: Duration,
    distance_m: f64,
    /// Last cumulative pedometer count seen, paused or not.
    pedometer_total: u64,
    steps: u64,
    litter_count: u32,
    path: Vec<Coordinate>,
    litter_locations: Vec<Coordinate>,
    /// Fix the next distance delta is measured from.
    anchor: Option<Coordinate>,
    last_fix: Option<Coordinate>,
}

impl Session {
    /// Start a session at `now`. `step_baseline` is the pedometer count at
    /// confirmation; session steps are counted from there.
    #[must_use]
    pub fn start(now: DateTime<Utc>, step_baseline: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: now,
            paused_at: None,
            paused_total: Duration::zero(),
            elapsed: Duration::zero(),
            distance_m: 0.0,
            pedometer_total: step_baseline,
            steps: 0,
            litter_count: 0,
            path: Vec::new(),
            litter_locations: Vec::new(),
            anchor: None,
            last_fix: None,
        }
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub const fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub const fn distance_m(&self) -> f64 {
        self.distance_m
    }

    pub const fn steps(&self) -> u64 {
        self.steps
    }

    pub const fn litter_count(&self) -> u32 {
        self.litter_count
    }

    pub fn path(&self) -> &[Coordinate] {
        &self.path
    }

    pub fn litter_locations(&self) -> &[Coordinate] {
        &self.litter_locations
    }

    pub const fn last_fix(&self) -> Option<Coordinate> {
        self.last_fix
    }

    /// Recompute elapsed time from the wall clock. Ignored while paused.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.is_paused() {
            return;
        }
        self.elapsed = self.active_time_until(now);
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.is_paused() {
            return;
        }
        self.elapsed = self.active_time_until(now);
        self.paused_at = Some(now);
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += (now - paused_at).max(Duration::zero());
        }
    }

    /// Record a location fix. Returns the distance added, if any.
    ///
    /// Every fix is appended to the path. Distance is measured from the
    /// anchor and only counted once it exceeds the noise floor, at which
    /// point the fix becomes the new anchor.
    pub fn record_fix(&mut self, fix: Coordinate, noise_floor_m: f64) -> Option<f64> {
        if self.is_paused() {
            return None;
        }
        self.path.push(fix);
        self.last_fix = Some(fix);

        let Some(anchor) = self.anchor else {
            self.anchor = Some(fix);
            return None;
        };
        let delta = anchor.distance_to(&fix);
        if delta > noise_floor_m {
            self.distance_m += delta;
            self.anchor = Some(fix);
            Some(delta)
        } else {
            None
        }
    }

    /// Update session steps from a cumulative pedometer count.
    ///
    /// Only the increase since the previous sample counts, and only while
    /// unpaused. Samples taken while paused still move the reference, so the
    /// first sample after resuming does not carry the paused walk. A count
    /// lower than the reference becomes the new reference.
    pub fn record_steps(&mut self, total: u64) {
        let delta = total.saturating_sub(self.pedometer_total);
        self.pedometer_total = total;
        if !self.is_paused() {
            self.steps += delta;
        }
    }

    /// The pedometer was restarted and counts from zero again.
    pub const fn restart_pedometer(&mut self) {
        self.pedometer_total = 0;
    }

    /// Count one collected item, tagging it with the last fix if there is one.
    pub fn collect_litter(&mut self) -> Option<Coordinate> {
        self.litter_count += 1;
        if let Some(fix) = self.last_fix {
            self.litter_locations.push(fix);
        }
        self.last_fix
    }

    /// Freeze the session at `now` into a read-only summary.
    #[must_use]
    pub fn finish(mut self, now: DateTime<Utc>) -> SessionSummary {
        if !self.is_paused() {
            self.elapsed = self.active_time_until(now);
        }
        SessionSummary {
            id: self.id,
            started_at: self.started_at,
            ended_at: now,
            duration_secs: self.elapsed.num_seconds(),
            distance_m: self.distance_m,
            steps: self.steps,
            litter_count: self.litter_count,
            path: self.path,
            litter_locations: self.litter_locations,
        }
    }

    fn active_time_until(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at - self.paused_total).max(Duration::zero())
    }
}

/// The read-only record shown on the summary screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub distance_m: f64,
    pub steps: u64,
    pub litter_count: u32,
    pub path: Vec<Coordinate>,
    pub litter_locations: Vec<Coordinate>,
}
