use home_rover::config::RobotConfig;
use home_rover::engine::map::ItemLocation;
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

    // Fetch the cup and bring it to the living room.
    let goal: WorldState = [
        Predicate::holding(ROBOT, "cup"),
        Predicate::at(ROBOT, "living_room"),
    ]
    .into_iter()
    .collect();

    println!("Home Rover — Fetch Demo");
    println!("Goal: holding cup, robot in living_room | seed: {}", config.seed);
    println!("{}", "═".repeat(55));

    let ok = execute_goal(&mut map, &mut robot, &goal, &DEFAULT_SCHEMAS);

    println!("Success: {ok}");
    println!(
        "Holding: {}",
        robot.item_held().unwrap_or("nothing")
    );
    println!("Item locations:");
    for (name, location) in map.items() {
        match location {
            ItemLocation::At(cell) => println!(
                "  {name}: ({}, {}) ({})",
                cell.x,
                cell.y,
                map.room_of(cell).unwrap_or("corridor")
            ),
            ItemLocation::Held => println!("  {name}: held by the robot"),
        }
    }
    println!("Unit motions walked: {}", robot.motions_walked());
}
