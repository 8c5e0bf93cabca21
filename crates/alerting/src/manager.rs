//! Alarm Latch Implementation

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Callback invoked on every alarm edge with the new activity flag
pub type AlarmListener = Box<dyn FnMut(bool) + Send>;

/// Alarm activity transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmEdge {
    /// Inactive -> active: start playback, vibrate
    Started,
    /// Active -> inactive: stop playback and rewind
    Stopped,
}

impl AlarmEdge {
    /// Activity flag after this edge
    pub fn is_active(self) -> bool {
        matches!(self, AlarmEdge::Started)
    }
}

/// Level-triggered alarm activity with edge-triggered side effects
///
/// Feeding `true` for N consecutive frames yields exactly one
/// [`AlarmEdge::Started`] and bumps the activation counter once.
pub struct AlarmLatch {
    /// Current activity
    active: bool,
    /// Inactive -> active transitions since the last reset
    activations: u64,
    /// Edge subscribers
    listeners: Vec<AlarmListener>,
}

impl AlarmLatch {
    /// Create an inactive latch with no subscribers
    pub fn new() -> Self {
        Self {
            active: false,
            activations: 0,
            listeners: Vec::new(),
        }
    }

    /// Register an edge subscriber
    pub fn subscribe(&mut self, listener: AlarmListener) {
        self.listeners.push(listener);
    }

    /// Apply this frame's alarm demand, returning the edge if one occurred
    pub fn update(&mut self, alarm_worthy: bool) -> Option<AlarmEdge> {
        match (self.active, alarm_worthy) {
            (false, true) => {
                self.active = true;
                self.activations += 1;
                metrics::counter!("dms_alarm_activations_total").increment(1);
                info!("Alarm started (activation #{})", self.activations);
                Some(self.emit(AlarmEdge::Started))
            }
            (true, false) => {
                self.active = false;
                info!("Alarm stopped");
                Some(self.emit(AlarmEdge::Stopped))
            }
            _ => None,
        }
    }

    /// Deactivate regardless of demand (capture stopped, session reset)
    pub fn force_stop(&mut self) -> Option<AlarmEdge> {
        self.update(false)
    }

    /// Stop any active alarm and zero the activation counter
    ///
    /// Subscribers are kept.
    pub fn reset(&mut self) -> Option<AlarmEdge> {
        let edge = self.force_stop();
        self.activations = 0;
        edge
    }

    /// Whether the alarm is currently active
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Get activation count
    pub fn activations(&self) -> u64 {
        self.activations
    }

    fn emit(&mut self, edge: AlarmEdge) -> AlarmEdge {
        debug!("Dispatching {:?} to {} listener(s)", edge, self.listeners.len());
        for listener in self.listeners.iter_mut() {
            listener(edge.is_active());
        }
        edge
    }
}

impl Default for AlarmLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AlarmLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmLatch")
            .field("active", &self.active)
            .field("activations", &self.activations)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
