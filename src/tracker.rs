// ===============================
// src/tracker.rs
// ===============================
//
// Edge-triggered two-state trackers. `observe()` returns Some(new_state) only
// on a change; repeated identical observations are no-ops. There is no
// timeout-based recovery: state moves only on a new observation.
//

use crate::domain::{ConnectionState, EmergencyStopState};

#[derive(Debug, Clone)]
pub struct EdgeTracker {
    on: bool,
}

impl EdgeTracker {
    pub fn new(initial: bool) -> Self {
        Self { on: initial }
    }

    pub fn get(&self) -> bool {
        self.on
    }

    pub fn observe(&mut self, value: bool) -> Option<bool> {
        if value == self.on {
            return None;
        }
        self.on = value;
        Some(value)
    }
}

/// Starts Inactive.
#[derive(Debug, Clone)]
pub struct EmergencyStopTracker(EdgeTracker);

impl Default for EmergencyStopTracker {
    fn default() -> Self {
        Self(EdgeTracker::new(false))
    }
}

impl EmergencyStopTracker {
    pub fn state(&self) -> EmergencyStopState {
        to_stop_state(self.0.get())
    }

    /// Some(Active) = activated edge, Some(Inactive) = deactivated edge.
    pub fn observe(&mut self, active: bool) -> Option<EmergencyStopState> {
        self.0.observe(active).map(to_stop_state)
    }
}

fn to_stop_state(active: bool) -> EmergencyStopState {
    if active {
        EmergencyStopState::Active
    } else {
        EmergencyStopState::Inactive
    }
}

/// Assumes Connected until an observation proves otherwise.
#[derive(Debug, Clone)]
pub struct ConnectionTracker(EdgeTracker);

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self(EdgeTracker::new(true))
    }
}

impl ConnectionTracker {
    pub fn state(&self) -> ConnectionState {
        to_conn_state(self.0.get())
    }

    pub fn observe(&mut self, reachable: bool) -> Option<ConnectionState> {
        self.0.observe(reachable).map(to_conn_state)
    }
}

fn to_conn_state(reachable: bool) -> ConnectionState {
    if reachable {
        ConnectionState::Connected
    } else {
        ConnectionState::Disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_fires_once() {
        let mut t = EmergencyStopTracker::default();
        assert_eq!(t.state(), EmergencyStopState::Inactive);
        assert_eq!(t.observe(false), None);
        assert_eq!(t.observe(true), Some(EmergencyStopState::Active));
        assert_eq!(t.observe(true), None);
        assert_eq!(t.observe(true), None);
        assert_eq!(t.observe(false), Some(EmergencyStopState::Inactive));
        assert_eq!(t.observe(false), None);
    }

    #[test]
    fn connection_assumed_until_first_failure() {
        let mut t = ConnectionTracker::default();
        assert_eq!(t.state(), ConnectionState::Connected);
        assert_eq!(t.observe(true), None);
        assert_eq!(t.observe(false), Some(ConnectionState::Disconnected));
        assert_eq!(t.observe(false), None);
        assert_eq!(t.state(), ConnectionState::Disconnected);
        assert_eq!(t.observe(true), Some(ConnectionState::Connected));
    }

    #[test]
    fn edges_alternate() {
        let mut t = EdgeTracker::new(false);
        let fired: Vec<_> = [true, true, false, true, false, false]
            .into_iter()
            .filter_map(|v| t.observe(v))
            .collect();
        assert_eq!(fired, [true, false, true, false]);
    }
}
