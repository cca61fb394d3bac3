use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use crate::config::RobotConfig;
use crate::engine::map::{CellKind, HomeMap, MapError};
use crate::engine::position::Cell;
use crate::logging::metrics::{GoalLog, write_goal_logs_csv};
use crate::planning::action::DEFAULT_SCHEMAS;
use crate::planning::planner::plan;
use crate::planning::predicate::{NOTHING, Predicate, ROBOT, WorldState};
use crate::robot::Robot;

/// Configuration for a batch of episodes. Each episode runs the scripted
/// goal list against a fresh sample home with its own seed.
pub struct ExperimentConfig {
    pub episodes: u32,
    /// Base RNG seed; episode `i` runs with `seed + i`.
    pub seed: u64,
    pub plan_depth_bound: usize,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            episodes: 20,
            seed: 42,
            plan_depth_bound: 10,
        }
    }
}

/// The 9x10 sample home: four rooms around a central corridor, one item
/// in each room.
pub fn sample_home() -> Result<HomeMap, MapError> {
    let rows = [
        "##########",
        "#kkk#llll#",
        "#kkk#llll#",
        "#kkk...ll#",
        "###.....##",
        "#b......t#",
        "#bbb#tttt#",
        "#bbb#tttt#",
        "##########",
    ];
    let layout = rows
        .iter()
        .map(|row| {
            row.chars()
                .map(|ch| match ch {
                    '#' => CellKind::Blocked,
                    '.' => CellKind::Open,
                    'k' => CellKind::Room("kitchen".to_string()),
                    'l' => CellKind::Room("living_room".to_string()),
                    'b' => CellKind::Room("bedroom".to_string()),
                    't' => CellKind::Room("bathroom".to_string()),
                    other => CellKind::Room(other.to_string()),
                })
                .collect()
        })
        .collect();

    let mut items = BTreeMap::new();
    items.insert("cup".to_string(), Cell::new(1, 1));
    items.insert("book".to_string(), Cell::new(6, 1));
    items.insert("phone".to_string(), Cell::new(1, 6));
    items.insert("toothbrush".to_string(), Cell::new(6, 6));

    HomeMap::new(layout, items)
}

/// The sample home's room adjacency as the planner sees it, both
/// directions listed.
pub fn home_connectivity() -> Vec<(String, String)> {
    [
        ("kitchen", "living_room"),
        ("kitchen", "bedroom"),
        ("living_room", "kitchen"),
        ("living_room", "bathroom"),
        ("bedroom", "kitchen"),
        ("bedroom", "bathroom"),
        ("bathroom", "living_room"),
        ("bathroom", "bedroom"),
    ]
    .into_iter()
    .map(|(a, b)| (a.to_string(), b.to_string()))
    .collect()
}

/// The scripted goal list run in every episode, labels included.
pub fn scripted_goals() -> Vec<(String, WorldState)> {
    let go_to = |room: &str| -> WorldState {
        [Predicate::at(ROBOT, room)].into_iter().collect()
    };
    let fetch = |item: &str, room: &str| -> WorldState {
        [Predicate::holding(ROBOT, item), Predicate::at(ROBOT, room)]
            .into_iter()
            .collect()
    };
    let deliver = |item: &str, room: &str| -> WorldState {
        [Predicate::at(item, room), Predicate::holding(ROBOT, NOTHING)]
            .into_iter()
            .collect()
    };

    vec![
        ("go to living_room".to_string(), go_to("living_room")),
        ("go to bedroom".to_string(), go_to("bedroom")),
        ("fetch cup".to_string(), fetch("cup", "living_room")),
        ("fetch book to bedroom".to_string(), fetch("book", "bedroom")),
        (
            "fetch phone to kitchen".to_string(),
            fetch("phone", "kitchen"),
        ),
        (
            "deliver toothbrush to bathroom".to_string(),
            deliver("toothbrush", "bathroom"),
        ),
    ]
}

/// Run a batch of episodes and save a CSV summary under
/// `experiments/data/<timestamp>_results.csv`.
///
/// Returns the path of the CSV file that was written.
pub fn run_batch_and_save(config: &ExperimentConfig) -> Result<PathBuf, Box<dyn Error>> {
    let logs = run_batch(config)?;

    let mut dir = PathBuf::from("experiments");
    dir.push("data");
    fs::create_dir_all(&dir)?;

    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let filename = format!("{}_results.csv", timestamp);
    let mut path = dir;
    path.push(filename);

    write_goal_logs_csv(&path, &logs)?;
    Ok(path)
}

/// Run a batch of episodes and return the collected goal logs.
pub fn run_batch(config: &ExperimentConfig) -> Result<Vec<GoalLog>, Box<dyn Error>> {
    let goals = scripted_goals();
    let mut logs = Vec::with_capacity(config.episodes as usize * goals.len());

    for episode in 0..config.episodes {
        let mut map = sample_home()?;
        let robot_config = RobotConfig {
            seed: config.seed + episode as u64,
            plan_depth_bound: config.plan_depth_bound,
            ..RobotConfig::default()
        };
        let mut robot = Robot::new(&map, home_connectivity(), &robot_config)?;

        for (label, goal) in &goals {
            let motions_before = robot.motions_walked();
            let degenerate_before = robot.degenerate_updates();

            let initial = robot.world_state(&map);
            let steps = plan(&initial, goal, &DEFAULT_SCHEMAS, config.plan_depth_bound);
            let (plan_len, success) = match steps {
                Some(steps) => (
                    Some(steps.len() as u32),
                    robot.execute(&steps, &mut map),
                ),
                None => (None, false),
            };

            logs.push(GoalLog {
                episode,
                goal: label.clone(),
                plan_len,
                motions: robot.motions_walked() - motions_before,
                success,
                degenerate_updates: robot.degenerate_updates() - degenerate_before,
            });
        }
        info!("episode {episode} finished");
    }

    Ok(logs)
}
