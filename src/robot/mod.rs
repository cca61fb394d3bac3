use log::{info, warn};

use crate::engine::map::HomeMap;
use crate::planning::action::ActionKind;
use crate::planning::planner::plan;
use crate::planning::predicate::WorldState;

pub mod executor;

pub use executor::{Failure, Robot};

/// Plan from the robot's current symbolic world state and execute the
/// result. Returns the executor's verdict; `false` also covers the case
/// where no plan exists within the robot's depth bound. The reason for a
/// failure is logged and kept on the robot (`last_failure`).
pub fn execute_goal(
    map: &mut HomeMap,
    robot: &mut Robot,
    goal: &WorldState,
    schemas: &[ActionKind],
) -> bool {
    let initial = robot.world_state(map);
    match plan(&initial, goal, schemas, robot.plan_depth_bound()) {
        Some(steps) => {
            if steps.is_empty() {
                info!("goal already satisfied");
                return true;
            }
            let rendered: Vec<String> = steps.iter().map(ToString::to_string).collect();
            info!("plan with {} step(s): {}", steps.len(), rendered.join(", "));
            robot.execute(&steps, map)
        }
        None => {
            warn!("no plan reaches the goal");
            robot.record_failure(Failure::PlanImpossible(robot.plan_depth_bound()));
            false
        }
    }
}
