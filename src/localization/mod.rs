pub mod belief;
pub mod model;

pub use belief::{BeliefError, BeliefFilter};
pub use model::{MotionModel, Observation, SensorModel};
