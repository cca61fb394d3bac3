use home_rover::config::RobotConfig;
use home_rover::experiments::runner::{home_connectivity, sample_home};
use home_rover::planning::action::DEFAULT_SCHEMAS;
use home_rover::planning::predicate::{Predicate, ROBOT, WorldState};
use home_rover::robot::{Robot, execute_goal};

fn main() {
    env_logger::init();

    let mut map = match sample_home() {
        Ok(map) => map,
        Err(e) => {
            eprintln!("failed to build the sample home: {e}");
            return;
        }
    };
    let config = RobotConfig::default();
    let mut robot = match Robot::new(&map, home_connectivity(), &config) {
        Ok(robot) => robot,
        Err(e) => {
            eprintln!("failed to build the robot: {e}");
            return;
        }
    };

    let goal: WorldState = [Predicate::at(ROBOT, "living_room")].into_iter().collect();

    println!("Home Rover — GoTo Demo");
    println!("Goal: robot in living_room | seed: {}", config.seed);
    println!("{}", "═".repeat(55));

    let ok = execute_goal(&mut map, &mut robot, &goal, &DEFAULT_SCHEMAS);

    let believed = robot.most_likely();
    println!("Success: {ok}");
    println!(
        "Robot believes it is at ({}, {}) (Room: {})",
        believed.x,
        believed.y,
        map.room_of(believed).unwrap_or("none")
    );
    println!("Top belief positions:");
    for (i, (cell, probability)) in robot.top_k(3).iter().enumerate() {
        println!(
            "  {}. ({}, {}) ({}): {probability:.4}",
            i + 1,
            cell.x,
            cell.y,
            map.room_of(*cell).unwrap_or("unknown")
        );
    }
    if let Some(failure) = robot.last_failure() {
        println!("Last failure: {failure}");
    }
}
