use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::localization::model::{MotionModel, SensorModel};

/// Tolerance when checking that probability triples sum to one.
const PROBABILITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("probability {name} = {value} is outside [0, 1]")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("motion probabilities sum to {0}, expected 1")]
    MotionSum(f64),
    #[error("sensor probabilities sum to {0}, expected at most 1")]
    SensorSum(f64),
    #[error("plan depth bound must be at least 1")]
    ZeroDepthBound,
}

/// Everything tunable about a robot: RNG seed, planner depth bound, and
/// the two noise models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    pub seed: u64,
    pub plan_depth_bound: usize,
    pub motion: MotionModel,
    pub sensor: SensorModel,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            plan_depth_bound: 10,
            motion: MotionModel::default(),
            sensor: SensorModel::default(),
        }
    }
}

impl RobotConfig {
    /// Reject configurations whose probabilities cannot describe the
    /// models: every entry in [0, 1], motion summing to one, sensor
    /// summing to at most one (the remainder is catch-all mass).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plan_depth_bound == 0 {
            return Err(ConfigError::ZeroDepthBound);
        }
        let entries = [
            ("motion_p_correct", self.motion.p_correct),
            ("motion_p_stay", self.motion.p_stay),
            ("motion_p_slip", self.motion.p_slip),
            ("sensor_p_correct", self.sensor.p_correct),
            ("sensor_p_adjacent", self.sensor.p_adjacent),
            ("sensor_p_unknown", self.sensor.p_unknown),
        ];
        for (name, value) in entries {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }

        let motion_sum = self.motion.p_correct + self.motion.p_stay + self.motion.p_slip;
        if (motion_sum - 1.0).abs() > PROBABILITY_EPSILON {
            return Err(ConfigError::MotionSum(motion_sum));
        }
        let sensor_sum = self.sensor.p_correct + self.sensor.p_adjacent + self.sensor.p_unknown;
        if sensor_sum > 1.0 + PROBABILITY_EPSILON {
            return Err(ConfigError::SensorSum(sensor_sum));
        }
        Ok(())
    }
}
