//! Physiological performance models
//!
//! Each estimator is a pure function over the newest-first sleep window.
//! Estimators that cannot run on the available data return `None` so the
//! caller can degrade that single output.

pub mod architecture;
pub mod circadian;
pub mod clock;
pub mod consistency;
pub mod peak_windows;
pub mod pressure;
pub mod projection;
pub mod simulation;
pub mod sleep_age;
pub mod windows;

pub use architecture::{compute_sleep_architecture, SleepArchitecture};
pub use circadian::{compute_circadian_alignment, AlignmentLevel, CircadianAlignment};
pub use clock::{ClockTime, ClockWindow};
pub use consistency::{consistency_score, ScheduleAnchor};
pub use peak_windows::{compute_peak_windows, PeakWindows};
pub use pressure::{compute_sleep_pressure, SleepPressure};
pub use projection::{compute_projection_72h, sleep_debt_minutes, Projection72h, ProjectionPoint};
pub use simulation::{run_simulation, CustomFactors, Preset, Scenario, SimulationOutcome};
pub use sleep_age::{compute_sleep_age, SleepAge, SleepAgeDriver, SLEEP_AGE_DISCLAIMER};
pub use windows::{compute_cognitive_windows, CognitiveWindows};
