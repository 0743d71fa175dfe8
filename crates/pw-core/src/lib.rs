//! Core domain logic for the PlastiWatch litter tracker.
//!
//! This crate contains the platform-independent pieces of the watch app:
//! - Detection: the step/motion heuristic that suggests an activity session
//! - Session: duration, distance, step, and litter aggregation
//! - Controller: the session state machine that ties them together
//! - View: the screens rendered from controller state

pub mod background;
mod controller;
pub mod detection;
pub mod geo;
pub mod host;
pub mod session;
pub mod view;

pub use background::BackgroundHandle;
pub use controller::{ActivityController, ControllerConfig, Counters, Phase};
pub use detection::{DetectionConfig, MotionSample};
pub use geo::Coordinate;
pub use host::{Action, Capabilities, Effect, HostError, Notification};
pub use session::{SessionConfig, SessionSummary};
pub use view::{Screen, ViewModel};
