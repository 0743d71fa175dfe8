//! Presentation model: the three mutually exclusive screens plus the
//! confirmation dialog, and their text rendering.

use std::fmt;

use chrono::Duration;

use crate::geo::BoundingBox;
use crate::session::SessionSummary;

/// Everything the watch face needs to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub screen: Screen,
    pub dialog: Option<Prompt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Monitoring(MonitoringView),
    ActiveSession(ActiveView),
    Summary(SummaryView),
}

impl Screen {
    /// Short name used in transition logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Monitoring(view) if view.monitoring => "monitoring",
            Self::Monitoring(_) => "idle",
            Self::ActiveSession(view) if view.paused => "paused",
            Self::ActiveSession(_) => "active",
            Self::Summary(_) => "summary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringView {
    pub monitoring: bool,
    pub status: String,
    pub steps: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveView {
    pub duration: String,
    pub distance: String,
    pub steps: u64,
    pub litter: u32,
    pub paused: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryView {
    pub duration: String,
    pub distance: String,
    pub steps: u64,
    pub litter: u32,
    pub path_points: usize,
    pub litter_points: usize,
    pub bounds: Option<BoundingBox>,
}

impl SummaryView {
    pub(crate) fn from_summary(summary: &SessionSummary) -> Self {
        Self {
            duration: format_duration(Duration::seconds(summary.duration_secs)),
            distance: format_distance(summary.distance_m),
            steps: summary.steps,
            litter: summary.litter_count,
            path_points: summary.path.len(),
            litter_points: summary.litter_locations.len(),
            bounds: BoundingBox::around(summary.path.iter().chain(&summary.litter_locations)),
        }
    }
}

/// The "are you walking?" dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub message: String,
}

impl Prompt {
    pub(crate) fn walking() -> Self {
        Self {
            title: "Activity detected".to_string(),
            message: "Are you walking? Start tracking litter?".to_string(),
        }
    }
}

/// Formats elapsed time as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Formats metres as whole metres, or kilometres from 1 km up.
pub fn format_distance(metres: f64) -> String {
    if metres < 1000.0 {
        format!("{metres:.0} m")
    } else {
        format!("{:.2} km", metres / 1000.0)
    }
}

impl fmt::Display for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.screen {
            Screen::Monitoring(view) => {
                if view.monitoring {
                    writeln!(f, "[Monitoring]")?;
                } else {
                    writeln!(f, "[Idle]")?;
                }
                writeln!(f, "Status: {}", view.status)?;
                write!(f, "Steps: {}", view.steps)?;
            }
            Screen::ActiveSession(view) => {
                if view.paused {
                    writeln!(f, "[Paused]")?;
                } else {
                    writeln!(f, "[Active]")?;
                }
                writeln!(f, "Time: {}", view.duration)?;
                writeln!(f, "Distance: {}", view.distance)?;
                writeln!(f, "Steps: {}", view.steps)?;
                write!(f, "Litter: {}", view.litter)?;
            }
            Screen::Summary(view) => {
                writeln!(f, "[Summary]")?;
                writeln!(f, "Time: {}", view.duration)?;
                writeln!(f, "Distance: {}", view.distance)?;
                writeln!(f, "Steps: {}", view.steps)?;
                writeln!(f, "Litter: {}", view.litter)?;
                writeln!(
                    f,
                    "Map: {} path points, {} litter points",
                    view.path_points, view.litter_points
                )?;
                match view.bounds {
                    Some(b) => write!(
                        f,
                        "Bounds: {:.5},{:.5} .. {:.5},{:.5}",
                        b.min.lat, b.min.lon, b.max.lat, b.max.lon
                    )?,
                    None => write!(f, "Bounds: none")?,
                }
            }
        }
        if let Some(prompt) = &self.dialog {
            write!(f, "\n> {}: {}", prompt.title, prompt.message)?;
        }
        Ok(())
    }
}
