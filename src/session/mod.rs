//! Session control, status output and step reports.

pub mod controller;
pub mod indicator;
pub mod report;

pub use controller::{SessionController, SessionTrigger};
pub use indicator::{LogIndicator, StatusIndicator};
pub use report::{device_name, SessionLog, SessionReport, StepReporter};
