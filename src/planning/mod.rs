pub mod action;
pub mod planner;
pub mod predicate;

pub use action::{Action, ActionKind, DEFAULT_SCHEMAS};
pub use planner::plan;
pub use predicate::{Predicate, WorldState};
