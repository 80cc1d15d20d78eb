//! Hard-cut override state

use serde::{Deserialize, Serialize};

/// Whether geometry has overridden the algorithm's master choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverrideState {
    /// Algorithm recommendations are applied
    #[default]
    Tracking,
    /// A hard-cut crossing forced this master; recommendations are ignored
    Overridden { master_camera_id: u32 },
}

impl OverrideState {
    pub fn is_overridden(&self) -> bool {
        matches!(self, OverrideState::Overridden { .. })
    }

    /// Enter override for `master_camera_id`; true when newly entered
    pub fn enter(&mut self, master_camera_id: u32) -> bool {
        let was = self.is_overridden();
        *self = OverrideState::Overridden { master_camera_id };
        !was
    }

    /// Return to tracking; true when an override was active
    pub fn exit(&mut self) -> bool {
        let was = self.is_overridden();
        *self = OverrideState::Tracking;
        was
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let mut state = OverrideState::default();
        assert!(!state.is_overridden());
        assert!(!state.exit());

        assert!(state.enter(2));
        assert_eq!(state, OverrideState::Overridden { master_camera_id: 2 });
        assert!(!state.enter(3));

        assert!(state.exit());
        assert_eq!(state, OverrideState::Tracking);
    }
}
