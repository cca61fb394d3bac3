use std::collections::BTreeSet;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::algorithms::astar::find_path;
use crate::config::{ConfigError, RobotConfig};
use crate::engine::map::{HomeMap, ItemLocation};
use crate::engine::position::Cell;
use crate::localization::belief::BeliefFilter;
use crate::localization::model::{MotionModel, Observation, SensorModel};
use crate::planning::action::Action;
use crate::planning::predicate::{HALLWAY, NOTHING, Predicate, ROBOT, WorldState};

/// Why an action (or a whole goal) could not be completed. Every value
/// is also logged through the `log` facade when it is recorded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Failure {
    #[error("no path from {from:?} toward {target}")]
    Unreachable { from: Cell, target: String },
    #[error("item `{0}` is not in the environment")]
    UnknownItem(String),
    #[error("precondition mismatch: {0}")]
    PreconditionMismatch(String),
    #[error("no plan within depth bound {0}")]
    PlanImpossible(usize),
}

/// The robot runtime: the belief filter, the gripper state, and the
/// hidden simulated ground truth the filter is estimating.
///
/// All stochastic draws (motion noise, sensor sampling) come from the
/// single seeded RNG owned here, so a fixed seed makes whole runs
/// reproducible.
pub struct Robot {
    filter: BeliefFilter,
    item_held: Option<String>,
    /// Simulated true position. Never consulted by decision making;
    /// only motion noise and sensor sampling read it.
    true_pos: Cell,
    rng: StdRng,
    motion: MotionModel,
    sensor: SensorModel,
    connectivity: Vec<(String, String)>,
    plan_depth_bound: usize,
    motions_walked: u32,
    last_failure: Option<Failure>,
}

impl Robot {
    /// Build a robot on `map` with a uniform belief. `connectivity` is
    /// the directional room-adjacency table the planner sees; symmetric
    /// layouts list both directions. The true position starts at a cell
    /// drawn from the initial belief.
    pub fn new(
        map: &HomeMap,
        connectivity: Vec<(String, String)>,
        config: &RobotConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let filter = BeliefFilter::new(map, config.motion, config.sensor);
        let true_pos = filter.sample(&mut rng);
        Ok(Self {
            filter,
            item_held: None,
            true_pos,
            rng,
            motion: config.motion,
            sensor: config.sensor,
            connectivity,
            plan_depth_bound: config.plan_depth_bound,
            motions_walked: 0,
            last_failure: None,
        })
    }

    pub fn belief(&self) -> &BeliefFilter {
        &self.filter
    }

    pub fn belief_mut(&mut self) -> &mut BeliefFilter {
        &mut self.filter
    }

    pub fn most_likely(&self) -> Cell {
        self.filter.most_likely()
    }

    pub fn top_k(&self, k: usize) -> Vec<(Cell, f64)> {
        self.filter.top_k(k)
    }

    pub fn item_held(&self) -> Option<&str> {
        self.item_held.as_deref()
    }

    pub fn last_failure(&self) -> Option<&Failure> {
        self.last_failure.as_ref()
    }

    pub fn plan_depth_bound(&self) -> usize {
        self.plan_depth_bound
    }

    /// Unit motions walked since construction.
    pub fn motions_walked(&self) -> u32 {
        self.motions_walked
    }

    pub fn degenerate_updates(&self) -> u32 {
        self.filter.degenerate_updates()
    }

    /// Execute a plan action by action. Returns `true` iff every action
    /// completed its post-condition; stops at the first failure.
    pub fn execute(&mut self, steps: &[Action], map: &mut HomeMap) -> bool {
        self.last_failure = None;
        for action in steps {
            info!("executing {action}");
            let ok = match action {
                Action::GoTo { room } => self.go_to(map, room),
                Action::PickUp { item, .. } => self.pick_up(map, item),
                Action::PutDown { item, room } => self.put_down(map, item, room),
            };
            if !ok {
                warn!("plan aborted at {action}");
                return false;
            }
        }
        true
    }

    /// Derive the symbolic world state the planner starts from: the
    /// believed robot room (or the hallway pseudo-room on untagged
    /// cells), item rooms from the map, the gripper predicate, and the
    /// static connectivity table.
    pub fn world_state(&self, map: &HomeMap) -> WorldState {
        let mut state = WorldState::new();

        let here = self.filter.most_likely();
        match map.room_of(here) {
            Some(room) => {
                state.insert(Predicate::at(ROBOT, room));
            }
            None => {
                state.insert(Predicate::at(ROBOT, HALLWAY));
                // The hallway only connects to rooms it physically
                // borders; blanket connectivity would let the planner
                // emit steps the grid cannot realise.
                for room in map.rooms_touching_corridor() {
                    state.insert(Predicate::connected(HALLWAY, room.clone()));
                    state.insert(Predicate::connected(room, HALLWAY));
                }
            }
        }

        match &self.item_held {
            Some(item) => state.insert(Predicate::holding(ROBOT, item.clone())),
            None => state.insert(Predicate::holding(ROBOT, NOTHING)),
        };

        for (item, location) in map.items() {
            if let ItemLocation::At(cell) = location {
                if let Some(room) = map.room_of(cell) {
                    state.insert(Predicate::at(item, room));
                }
            }
        }

        for (from, to) in &self.connectivity {
            state.insert(Predicate::connected(from.clone(), to.clone()));
        }

        state
    }

    fn go_to(&mut self, map: &HomeMap, room: &str) -> bool {
        if !self.walk_toward_room(map, room) {
            return false;
        }
        if self.room_label(map) == room {
            return true;
        }

        // One recovery attempt from the updated position estimate.
        debug!("GoTo {room} ended elsewhere, replanning once");
        if !self.walk_toward_room(map, room) {
            return false;
        }
        if self.room_label(map) == room {
            return true;
        }

        let ended = self.room_label(map).to_string();
        self.fail(Failure::PreconditionMismatch(format!(
            "GoTo {room} ended in {ended}"
        )));
        false
    }

    /// Path to the closest candidate cell of `room` and walk it. Only
    /// pathing can fail here; where the robot actually ends up is the
    /// caller's problem.
    fn walk_toward_room(&mut self, map: &HomeMap, room: &str) -> bool {
        let start = self.filter.most_likely();
        let mut candidates = candidate_cells(map, room);
        candidates.sort_by_key(|c| c.manhattan(start));
        for target in candidates {
            if let Some(path) = find_path(map, start, target) {
                self.walk(map, &path);
                return true;
            }
        }
        self.fail(Failure::Unreachable {
            from: start,
            target: room.to_string(),
        });
        false
    }

    fn pick_up(&mut self, map: &mut HomeMap, item: &str) -> bool {
        let target = match map.item_location(item) {
            None => {
                self.fail(Failure::UnknownItem(item.to_string()));
                return false;
            }
            Some(ItemLocation::Held) => {
                self.fail(Failure::PreconditionMismatch(format!(
                    "item `{item}` is already held"
                )));
                return false;
            }
            Some(ItemLocation::At(cell)) => cell,
        };

        let start = self.filter.most_likely();
        if start != target {
            match find_path(map, start, target) {
                Some(path) => self.walk(map, &path),
                None => {
                    self.filter.update(map, (0, 0), &Observation::ActionFailed);
                    self.fail(Failure::Unreachable {
                        from: start,
                        target: format!("item `{item}`"),
                    });
                    return false;
                }
            }
        }

        if self.filter.most_likely() == target {
            map.set_item_location(item, ItemLocation::Held);
            self.item_held = Some(item.to_string());
            self.filter
                .update(map, (0, 0), &Observation::ActionSucceeded);
            true
        } else {
            let believed = self.filter.most_likely();
            self.filter.update(map, (0, 0), &Observation::ActionFailed);
            self.fail(Failure::PreconditionMismatch(format!(
                "pickup of `{item}`: believed at ({}, {}), item at ({}, {})",
                believed.x, believed.y, target.x, target.y
            )));
            false
        }
    }

    fn put_down(&mut self, map: &mut HomeMap, item: &str, room: &str) -> bool {
        let here = self.filter.most_likely();
        let label = self.room_label(map).to_string();
        if label == room && self.item_held.as_deref() == Some(item) {
            map.set_item_location(item, ItemLocation::At(here));
            self.item_held = None;
            self.filter
                .update(map, (0, 0), &Observation::ActionSucceeded);
            true
        } else {
            let held = self.item_held.clone().unwrap_or_else(|| NOTHING.to_string());
            self.filter.update(map, (0, 0), &Observation::ActionFailed);
            self.fail(Failure::PreconditionMismatch(format!(
                "putdown of `{item}` in {room}: currently in {label} holding {held}"
            )));
            false
        }
    }

    /// Walk a path one unit motion at a time, feeding the belief filter
    /// after every step.
    fn walk(&mut self, map: &HomeMap, path: &[Cell]) {
        for pair in path.windows(2) {
            let delta = pair[0].delta_to(pair[1]);
            self.step(map, delta);
        }
    }

    /// One indivisible unit motion: sample noisy true motion, sample a
    /// sensor reading at the true position, advance the belief.
    fn step(&mut self, map: &HomeMap, delta: (i32, i32)) {
        self.true_pos = self.sample_motion(map, delta);
        let observation = self.sample_observation(map);
        self.filter.update(map, delta, &observation);
        self.motions_walked += 1;
        debug!(
            "step {:?} -> observed {observation}, belief peak ({}, {})",
            delta,
            self.filter.most_likely().x,
            self.filter.most_likely().y
        );
    }

    /// The room name used in symbolic states for the believed position.
    fn room_label<'m>(&self, map: &'m HomeMap) -> &'m str {
        map.room_of(self.filter.most_likely()).unwrap_or(HALLWAY)
    }

    fn sample_motion(&mut self, map: &HomeMap, delta: (i32, i32)) -> Cell {
        let here = self.true_pos;
        let neighbours = map.neighbours(here);
        let intended = here.offset(delta).filter(|c| !map.is_obstacle(*c));
        let draw: f64 = self.rng.gen_range(0.0..1.0);

        match intended {
            // Driving into a wall: mostly stay, occasionally slip.
            None => {
                if draw < self.motion.p_correct + self.motion.p_stay || neighbours.is_empty() {
                    here
                } else {
                    neighbours.choose(&mut self.rng).copied().unwrap_or(here)
                }
            }
            Some(intended) => {
                if draw < self.motion.p_correct {
                    intended
                } else if draw < self.motion.p_correct + self.motion.p_stay {
                    here
                } else {
                    let slips: Vec<Cell> = neighbours
                        .into_iter()
                        .filter(|n| *n != intended)
                        .collect();
                    slips.choose(&mut self.rng).copied().unwrap_or(here)
                }
            }
        }
    }

    /// Draw a sensor reading from the emission distribution at the true
    /// position.
    fn sample_observation(&mut self, map: &HomeMap) -> Observation {
        let correct = match map.room_of(self.true_pos) {
            Some(room) => Observation::RoomSensed(room.to_string()),
            None => Observation::UnknownSensed,
        };
        let neighbours = map.neighbours(self.true_pos);
        let adjacent: Vec<&str> = neighbours
            .iter()
            .filter_map(|n| map.room_of(*n))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let draw: f64 = self.rng.gen_range(0.0..1.0);
        if draw < self.sensor.p_correct {
            correct
        } else if draw < self.sensor.p_correct + self.sensor.p_adjacent && !adjacent.is_empty() {
            match adjacent.choose(&mut self.rng) {
                Some(room) => Observation::RoomSensed(room.to_string()),
                None => Observation::UnknownSensed,
            }
        } else {
            Observation::UnknownSensed
        }
    }

    fn fail(&mut self, failure: Failure) {
        warn!("{failure}");
        self.last_failure = Some(failure);
    }

    pub(crate) fn record_failure(&mut self, failure: Failure) {
        self.fail(failure);
    }
}

/// Open cells belonging to `room`; for the hallway pseudo-room, the
/// untagged open cells.
fn candidate_cells(map: &HomeMap, room: &str) -> Vec<Cell> {
    if room == HALLWAY {
        map.open_cells()
            .into_iter()
            .filter(|c| map.room_of(*c).is_none())
            .collect()
    } else {
        map.cells_in_room(room)
    }
}
