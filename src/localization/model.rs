use std::fmt;

use serde::{Deserialize, Serialize};

/// Transition-model parameters for a single intended unit motion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MotionModel {
    /// Probability of moving as intended.
    pub p_correct: f64,
    /// Probability of staying in place.
    pub p_stay: f64,
    /// Probability of slipping to an unintended open neighbour.
    pub p_slip: f64,
}

impl Default for MotionModel {
    fn default() -> Self {
        Self {
            p_correct: 0.8,
            p_stay: 0.1,
            p_slip: 0.1,
        }
    }
}

/// Emission-model parameters for the room-type sensor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SensorModel {
    /// Probability of sensing the room the robot is actually in.
    pub p_correct: f64,
    /// Probability of sensing some adjacent room instead.
    pub p_adjacent: f64,
    /// Probability of an unknown/error reading.
    pub p_unknown: f64,
}

impl Default for SensorModel {
    fn default() -> Self {
        Self {
            p_correct: 0.7,
            p_adjacent: 0.15,
            p_unknown: 0.15,
        }
    }
}

/// One reading from the robot's sensor suite. The set is closed: one
/// `RoomSensed` per room tag on the map, plus the three fixed readings.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Observation {
    RoomSensed(String),
    UnknownSensed,
    ActionSucceeded,
    ActionFailed,
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::RoomSensed(room) => write!(f, "{room}_sensed"),
            Observation::UnknownSensed => write!(f, "unknown_sensed"),
            Observation::ActionSucceeded => write!(f, "action_succeeded"),
            Observation::ActionFailed => write!(f, "action_failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_labels() {
        assert_eq!(
            Observation::RoomSensed("kitchen".to_string()).to_string(),
            "kitchen_sensed"
        );
        assert_eq!(Observation::UnknownSensed.to_string(), "unknown_sensed");
        assert_eq!(Observation::ActionSucceeded.to_string(), "action_succeeded");
        assert_eq!(Observation::ActionFailed.to_string(), "action_failed");
    }

    #[test]
    fn default_models_are_proper_distributions() {
        let m = MotionModel::default();
        assert!((m.p_correct + m.p_stay + m.p_slip - 1.0).abs() < 1e-12);
        let s = SensorModel::default();
        assert!((s.p_correct + s.p_adjacent + s.p_unknown - 1.0).abs() < 1e-12);
    }
}
