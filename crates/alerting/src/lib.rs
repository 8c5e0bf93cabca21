//! Alerting System
//!
//! Turns a per-frame "alarm-worthy" signal into one-shot start/stop edges so
//! audio and vibration collaborators fire once per alarm run.

mod manager;

pub use manager::{AlarmEdge, AlarmLatch, AlarmListener};
