use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use log::warn;
use rand::Rng;
use thiserror::Error;

use crate::engine::map::HomeMap;
use crate::engine::position::Cell;

use super::model::{MotionModel, Observation, SensorModel};

/// Emission weight shared by readings the sensor model says nothing
/// about. Untagged cells put the rest of their mass on `unknown_sensed`.
const UNMODELLED_MASS: f64 = 0.2;

#[derive(Debug, Error, PartialEq)]
pub enum BeliefError {
    #[error("cell {cell:?} is not an open cell of the map")]
    UnknownCell { cell: Cell },
    #[error("mass {mass} for cell {cell:?} is not a finite non-negative number")]
    InvalidMass { cell: Cell, mass: f64 },
    #[error("distribution has zero total mass")]
    ZeroMass,
}

/// Discrete belief over the open cells of a map, advanced by a
/// forward HMM step per (intended motion, sensor reading) pair.
///
/// Cells are kept in the map's row-major order; that order is the
/// tie-break for `most_likely` and `top_k`. The distribution sums to one
/// after every successful update.
pub struct BeliefFilter {
    cells: Vec<Cell>,
    index: HashMap<Cell, usize>,
    belief: Vec<f64>,
    motion: MotionModel,
    sensor: SensorModel,
    /// Size of the closed observation set: one reading per room tag,
    /// plus unknown and the two action outcomes.
    observation_count: usize,
    degenerate_updates: u32,
}

impl BeliefFilter {
    /// Uniform belief over the open cells of `map`.
    pub fn new(map: &HomeMap, motion: MotionModel, sensor: SensorModel) -> Self {
        let cells = map.open_cells();
        let index = cells
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i))
            .collect::<HashMap<_, _>>();
        let uniform = 1.0 / cells.len() as f64;
        let belief = vec![uniform; cells.len()];
        Self {
            cells,
            index,
            belief,
            motion,
            sensor,
            observation_count: map.room_tags().len() + 3,
            degenerate_updates: 0,
        }
    }

    /// Replace the current belief with an explicit distribution. The
    /// input is normalised; every cell must be open on the map.
    pub fn set_belief(&mut self, distribution: &[(Cell, f64)]) -> Result<(), BeliefError> {
        let mut next = vec![0.0; self.belief.len()];
        let mut total = 0.0;
        for &(cell, mass) in distribution {
            let Some(&i) = self.index.get(&cell) else {
                return Err(BeliefError::UnknownCell { cell });
            };
            if !mass.is_finite() || mass < 0.0 {
                return Err(BeliefError::InvalidMass { cell, mass });
            }
            next[i] += mass;
            total += mass;
        }
        if total <= 0.0 {
            return Err(BeliefError::ZeroMass);
        }
        for p in &mut next {
            *p /= total;
        }
        self.belief = next;
        Ok(())
    }

    /// `P(next | prev, action)` under the motion model.
    pub fn transition_probability(
        &self,
        map: &HomeMap,
        prev: Cell,
        action: (i32, i32),
        next: Cell,
    ) -> f64 {
        let neighbours = map.neighbours(prev);
        let intended = prev.offset(action).filter(|c| !map.is_obstacle(*c));

        match intended {
            // Intended cell is a wall: stay put, or slip to any open
            // neighbour. With nowhere to slip, all mass stays.
            None => {
                if next == prev {
                    let mut p = self.motion.p_correct + self.motion.p_stay;
                    if neighbours.is_empty() {
                        p += self.motion.p_slip;
                    }
                    p
                } else if neighbours.contains(&next) {
                    self.motion.p_slip / neighbours.len() as f64
                } else {
                    0.0
                }
            }
            Some(intended) => {
                let mut p = 0.0;
                if next == intended {
                    p += self.motion.p_correct;
                }
                if next == prev {
                    p += self.motion.p_stay;
                }
                let unintended: Vec<Cell> = neighbours
                    .into_iter()
                    .filter(|n| *n != intended)
                    .collect();
                if next != intended && next != prev && unintended.contains(&next) {
                    p += self.motion.p_slip / unintended.len() as f64;
                }
                // When every neighbour is the intended cell the slip mass
                // is dropped; normalisation restores it.
                p
            }
        }
    }

    /// `P(observation | at)` under the sensor model.
    pub fn emission_probability(&self, map: &HomeMap, at: Cell, observation: &Observation) -> f64 {
        // Action outcomes carry the same weight on every cell so they
        // cannot shift the posterior.
        if matches!(
            observation,
            Observation::ActionSucceeded | Observation::ActionFailed
        ) {
            return self.flat_mass();
        }

        let Some(room) = map.room_of(at) else {
            // Untagged cells mostly read unknown.
            return match observation {
                Observation::UnknownSensed => 1.0 - UNMODELLED_MASS,
                _ => self.flat_mass(),
            };
        };

        let adjacent: BTreeSet<&str> = map
            .neighbours(at)
            .iter()
            .filter_map(|n| map.room_of(*n))
            .collect();

        match observation {
            Observation::RoomSensed(sensed) if sensed == room => self.sensor.p_correct,
            Observation::RoomSensed(sensed) if adjacent.contains(sensed.as_str()) => {
                self.sensor.p_adjacent / adjacent.len() as f64
            }
            Observation::UnknownSensed => self.sensor.p_unknown,
            Observation::RoomSensed(_) => {
                // Leftover mass is spread over the room readings not
                // covered above.
                let adjacent_share = if adjacent.is_empty() {
                    0.0
                } else {
                    self.sensor.p_adjacent
                };
                let listed = 1 + adjacent.iter().filter(|t| **t != room).count();
                let others = map.room_tags().len().saturating_sub(listed);
                if others == 0 {
                    return 0.0;
                }
                let leftover =
                    1.0 - self.sensor.p_correct - self.sensor.p_unknown - adjacent_share;
                (leftover / others as f64).max(0.0)
            }
            Observation::ActionSucceeded | Observation::ActionFailed => self.flat_mass(),
        }
    }

    /// One forward step: predict under the motion model, correct by the
    /// observation likelihood, renormalise. A zero-sum correction keeps
    /// the prior untouched and is counted as a degenerate update.
    pub fn update(&mut self, map: &HomeMap, action: (i32, i32), observation: &Observation) {
        let mut predicted = vec![0.0; self.belief.len()];

        for (i, &cell) in self.cells.iter().enumerate() {
            let mass = self.belief[i];
            if mass == 0.0 {
                continue;
            }

            let neighbours = map.neighbours(cell);
            let intended = cell.offset(action).filter(|c| !map.is_obstacle(*c));

            match intended {
                None => {
                    predicted[i] += mass * (self.motion.p_correct + self.motion.p_stay);
                    if neighbours.is_empty() {
                        predicted[i] += mass * self.motion.p_slip;
                    } else {
                        let share = self.motion.p_slip / neighbours.len() as f64;
                        for n in neighbours {
                            predicted[self.index[&n]] += mass * share;
                        }
                    }
                }
                Some(intended) => {
                    predicted[self.index[&intended]] += mass * self.motion.p_correct;
                    predicted[i] += mass * self.motion.p_stay;
                    let unintended: Vec<Cell> = neighbours
                        .into_iter()
                        .filter(|n| *n != intended)
                        .collect();
                    if !unintended.is_empty() {
                        let share = self.motion.p_slip / unintended.len() as f64;
                        for n in unintended {
                            predicted[self.index[&n]] += mass * share;
                        }
                    }
                }
            }
        }

        let mut total = 0.0;
        for (i, &cell) in self.cells.iter().enumerate() {
            predicted[i] *= self.emission_probability(map, cell, observation);
            total += predicted[i];
        }

        if total > 0.0 {
            for p in &mut predicted {
                *p /= total;
            }
            self.belief = predicted;
        } else {
            self.degenerate_updates += 1;
            warn!("degenerate observation {observation}: keeping prior belief");
        }
    }

    /// The cell with the highest probability. Ties resolve to the
    /// earliest cell in the map's row-major order.
    pub fn most_likely(&self) -> Cell {
        let mut best = 0;
        for i in 1..self.belief.len() {
            if self.belief[i] > self.belief[best] {
                best = i;
            }
        }
        self.cells[best]
    }

    /// The `k` most probable cells with their probabilities, most likely
    /// first. Ties keep row-major order.
    pub fn top_k(&self, k: usize) -> Vec<(Cell, f64)> {
        let mut ranked: Vec<(Cell, f64)> = self
            .cells
            .iter()
            .copied()
            .zip(self.belief.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked.truncate(k);
        ranked
    }

    /// Probability currently assigned to `cell`; zero for anything
    /// outside the open-cell support.
    pub fn probability(&self, cell: Cell) -> f64 {
        self.index.get(&cell).map_or(0.0, |&i| self.belief[i])
    }

    /// Draw a cell from the current distribution.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Cell {
        let draw: f64 = rng.gen_range(0.0..1.0);
        let mut acc = 0.0;
        for (i, &cell) in self.cells.iter().enumerate() {
            acc += self.belief[i];
            if draw < acc {
                return cell;
            }
        }
        self.cells[self.cells.len() - 1]
    }

    pub fn degenerate_updates(&self) -> u32 {
        self.degenerate_updates
    }

    fn flat_mass(&self) -> f64 {
        if self.observation_count > 1 {
            UNMODELLED_MASS / (self.observation_count - 1) as f64
        } else {
            UNMODELLED_MASS
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::engine::map::CellKind;

    fn layout(rows: &[&str]) -> Vec<Vec<CellKind>> {
        rows.iter()
            .map(|row| {
                row.chars()
                    .map(|ch| match ch {
                        '#' => CellKind::Blocked,
                        '.' => CellKind::Open,
                        'k' => CellKind::Room("kitchen".to_string()),
                        'l' => CellKind::Room("living_room".to_string()),
                        tag => CellKind::Room(tag.to_string()),
                    })
                    .collect()
            })
            .collect()
    }

    fn map_of(rows: &[&str]) -> HomeMap {
        HomeMap::new(layout(rows), BTreeMap::new()).expect("valid layout")
    }

    fn filter_for(map: &HomeMap) -> BeliefFilter {
        BeliefFilter::new(map, MotionModel::default(), SensorModel::default())
    }

    fn total_mass(filter: &BeliefFilter) -> f64 {
        filter.belief.iter().sum()
    }

    #[test]
    fn fresh_filter_is_uniform() {
        let map = map_of(&["kk.", "...", ".ll"]);
        let filter = filter_for(&map);
        let uniform = 1.0 / 9.0;
        for cell in map.open_cells() {
            assert!((filter.probability(cell) - uniform).abs() < 1e-12);
        }
        assert!((total_mass(&filter) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn transition_mass_for_an_open_intended_cell() {
        let map = map_of(&["...", "...", "..."]);
        let filter = filter_for(&map);
        let centre = Cell::new(1, 1);
        let east = Cell::new(2, 1);
        // Intended east move: correct to east, stay at centre, slip split
        // over the three remaining neighbours.
        assert!((filter.transition_probability(&map, centre, (1, 0), east) - 0.8).abs() < 1e-12);
        assert!(
            (filter.transition_probability(&map, centre, (1, 0), centre) - 0.1).abs() < 1e-12
        );
        for slip in [Cell::new(0, 1), Cell::new(1, 2), Cell::new(1, 0)] {
            assert!(
                (filter.transition_probability(&map, centre, (1, 0), slip) - 0.1 / 3.0).abs()
                    < 1e-12
            );
        }
        assert_eq!(
            filter.transition_probability(&map, centre, (1, 0), Cell::new(0, 0)),
            0.0
        );
    }

    #[test]
    fn transition_mass_when_walking_into_a_wall() {
        let map = map_of(&[".#", ".."]);
        let filter = filter_for(&map);
        let corner = Cell::new(0, 0);
        // East is blocked: stay with p_correct + p_stay, slip over the
        // single open neighbour.
        assert!((filter.transition_probability(&map, corner, (1, 0), corner) - 0.9).abs() < 1e-12);
        assert!(
            (filter.transition_probability(&map, corner, (1, 0), Cell::new(0, 1)) - 0.1).abs()
                < 1e-12
        );
    }

    #[test]
    fn transition_mass_collapses_on_an_isolated_cell() {
        let map = map_of(&[".#."]);
        let filter = filter_for(&map);
        let cell = Cell::new(0, 0);
        assert!((filter.transition_probability(&map, cell, (1, 0), cell) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn staying_put_keeps_correct_and_stay_mass_at_home() {
        let map = map_of(&["...", "...", "..."]);
        let filter = filter_for(&map);
        let centre = Cell::new(1, 1);
        // Action (0,0): intended cell is the current one, so correct and
        // stay coincide; slip still spreads over the neighbours.
        assert!(
            (filter.transition_probability(&map, centre, (0, 0), centre) - 0.9).abs() < 1e-12
        );
        assert!(
            (filter.transition_probability(&map, centre, (0, 0), Cell::new(2, 1)) - 0.1 / 4.0)
                .abs()
                < 1e-12
        );
    }

    #[test]
    fn emission_in_a_tagged_cell() {
        // Kitchen column, corridor column, living-room column.
        let map = map_of(&["k.l", "k.l"]);
        let filter = filter_for(&map);
        let kitchen = Cell::new(0, 0);
        let corridor = Cell::new(1, 0);

        let kitchen_obs = Observation::RoomSensed("kitchen".to_string());
        let living_obs = Observation::RoomSensed("living_room".to_string());

        assert!((filter.emission_probability(&map, kitchen, &kitchen_obs) - 0.7).abs() < 1e-12);
        assert!(
            (filter.emission_probability(&map, kitchen, &Observation::UnknownSensed) - 0.15)
                .abs()
                < 1e-12
        );
        // The only adjacent room of (0,0) is kitchen itself (below), so
        // living_room falls into the leftover bucket, which is empty
        // under the default parameters.
        assert_eq!(filter.emission_probability(&map, kitchen, &living_obs), 0.0);

        // Corridor cell adjacent to both rooms: adjacent readings split
        // the adjacent mass... but untagged cells use the fixed model.
        assert!(
            (filter.emission_probability(&map, corridor, &Observation::UnknownSensed) - 0.8)
                .abs()
                < 1e-12
        );
        // |O| = 2 rooms + 3 fixed = 5, so every other reading gets 0.05.
        assert!(
            (filter.emission_probability(&map, corridor, &kitchen_obs) - 0.05).abs() < 1e-12
        );
    }

    #[test]
    fn emission_splits_adjacent_mass() {
        // A kitchen cell with a living-room neighbour senses the
        // neighbour's room with the adjacent share.
        let map = map_of(&["kl"]);
        let filter = filter_for(&map);
        let kitchen = Cell::new(0, 0);
        let living_obs = Observation::RoomSensed("living_room".to_string());
        // Adjacent set of (0,0) is {living_room}.
        assert!(
            (filter.emission_probability(&map, kitchen, &living_obs) - 0.15).abs() < 1e-12
        );
    }

    #[test]
    fn action_outcomes_do_not_move_the_posterior() {
        let map = map_of(&["kk.", "...", ".ll"]);
        let mut filter = filter_for(&map);
        // Shape the belief a little first.
        filter.update(&map, (1, 0), &Observation::RoomSensed("kitchen".to_string()));
        let before: Vec<f64> = filter.belief.clone();
        filter.update(&map, (0, 0), &Observation::ActionSucceeded);
        // Prediction with (0,0) diffuses slightly, but the correction is
        // flat, so only the motion model acts; compare against a manual
        // motion-only step.
        let mut expected = BeliefFilter::new(&map, MotionModel::default(), SensorModel::default());
        expected.belief = before;
        expected.update(&map, (0, 0), &Observation::ActionFailed);
        for (a, b) in filter.belief.iter().zip(expected.belief.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert!((total_mass(&filter) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sparse_update_matches_the_dense_transition_model() {
        let map = map_of(&["kk.", ".#.", ".ll"]);
        let mut filter = filter_for(&map);
        // Shape the prior away from uniform first.
        filter.update(&map, (0, 1), &Observation::UnknownSensed);
        let prior = filter.belief.clone();
        let cells = filter.cells.clone();

        // Dense predict over every (prev, next) pair; a flat correction
        // (action outcome) leaves the posterior proportional to it.
        let action = (1, 0);
        let mut dense = vec![0.0; cells.len()];
        for (j, &next) in cells.iter().enumerate() {
            for (i, &prev) in cells.iter().enumerate() {
                dense[j] += filter.transition_probability(&map, prev, action, next) * prior[i];
            }
        }
        let total: f64 = dense.iter().sum();
        for p in &mut dense {
            *p /= total;
        }

        filter.update(&map, action, &Observation::ActionSucceeded);
        for (a, b) in filter.belief.iter().zip(dense.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn update_normalises_and_keeps_support() {
        let map = map_of(&["kk.", ".#.", ".ll"]);
        let mut filter = filter_for(&map);
        let observations = [
            Observation::RoomSensed("kitchen".to_string()),
            Observation::UnknownSensed,
            Observation::RoomSensed("living_room".to_string()),
        ];
        for (step, obs) in observations.iter().enumerate() {
            let action = if step % 2 == 0 { (1, 0) } else { (0, 1) };
            filter.update(&map, action, obs);
            assert!((total_mass(&filter) - 1.0).abs() < 1e-9, "after step {step}");
        }
        // Blocked and out-of-bounds cells never gain mass.
        assert_eq!(filter.probability(Cell::new(1, 1)), 0.0);
        assert_eq!(filter.probability(Cell::new(9, 9)), 0.0);
        assert_eq!(filter.degenerate_updates(), 0);
    }

    #[test]
    fn zero_sum_correction_keeps_the_prior() {
        // Single-room map: a reading for a room that is neither correct,
        // adjacent, nor unknown has zero likelihood everywhere.
        let map = map_of(&["kk", "kk"]);
        let mut filter = filter_for(&map);
        let before = filter.belief.clone();
        filter.update(
            &map,
            (0, 0),
            &Observation::RoomSensed("bathroom".to_string()),
        );
        assert_eq!(filter.belief, before);
        assert_eq!(filter.degenerate_updates(), 1);
    }

    #[test]
    fn most_likely_breaks_ties_by_insertion_order() {
        let map = map_of(&["...", "..."]);
        let filter = filter_for(&map);
        // Uniform belief: the first open cell in row-major order wins.
        assert_eq!(filter.most_likely(), Cell::new(0, 0));
    }

    #[test]
    fn top_k_ranks_by_probability() {
        let map = map_of(&["...", "..."]);
        let mut filter = filter_for(&map);
        filter
            .set_belief(&[
                (Cell::new(0, 0), 0.1),
                (Cell::new(1, 0), 0.6),
                (Cell::new(2, 1), 0.3),
            ])
            .expect("valid distribution");
        let top = filter.top_k(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, Cell::new(1, 0));
        assert!((top[0].1 - 0.6).abs() < 1e-12);
        assert_eq!(top[1].0, Cell::new(2, 1));
    }

    #[test]
    fn set_belief_validates_input() {
        let map = map_of(&[".#"]);
        let mut filter = filter_for(&map);
        assert_eq!(
            filter.set_belief(&[(Cell::new(1, 0), 1.0)]),
            Err(BeliefError::UnknownCell {
                cell: Cell::new(1, 0)
            })
        );
        assert_eq!(
            filter.set_belief(&[(Cell::new(0, 0), -0.5)]),
            Err(BeliefError::InvalidMass {
                cell: Cell::new(0, 0),
                mass: -0.5
            })
        );
        assert_eq!(
            filter.set_belief(&[(Cell::new(0, 0), 0.0)]),
            Err(BeliefError::ZeroMass)
        );
        // Unnormalised input is rescaled.
        let map = map_of(&[".."]);
        let mut filter = filter_for(&map);
        filter
            .set_belief(&[(Cell::new(0, 0), 2.0), (Cell::new(1, 0), 6.0)])
            .expect("valid distribution");
        assert!((filter.probability(Cell::new(0, 0)) - 0.25).abs() < 1e-12);
        assert!((filter.probability(Cell::new(1, 0)) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn repeated_unknown_readings_suppress_tagged_cells() {
        // Untagged cells keep near-uniform mass relative to one another
        // while tagged cells fall strictly below them.
        let map = map_of(&["kk..", "....", "..ll"]);
        // No slip: untagged cells evolve identically, so their masses
        // stay exactly equal.
        let motion = MotionModel {
            p_correct: 0.8,
            p_stay: 0.2,
            p_slip: 0.0,
        };
        let mut filter = BeliefFilter::new(&map, motion, SensorModel::default());
        for _ in 0..10 {
            filter.update(&map, (0, 0), &Observation::UnknownSensed);
        }
        assert!((total_mass(&filter) - 1.0).abs() < 1e-9);

        let untagged: Vec<f64> = map
            .open_cells()
            .into_iter()
            .filter(|c| map.room_of(*c).is_none())
            .map(|c| filter.probability(c))
            .collect();
        let tagged: Vec<f64> = map
            .open_cells()
            .into_iter()
            .filter(|c| map.room_of(*c).is_some())
            .map(|c| filter.probability(c))
            .collect();

        let reference = untagged[0];
        for p in &untagged {
            assert!((p - reference).abs() < reference * 0.05);
        }
        for p in &tagged {
            assert!(*p < reference);
        }
    }

    #[test]
    fn repeated_unknown_readings_with_default_noise() {
        let map = map_of(&["kk..", "....", "..ll"]);
        let mut filter = filter_for(&map);
        for _ in 0..10 {
            filter.update(&map, (0, 0), &Observation::UnknownSensed);
        }
        assert!((total_mass(&filter) - 1.0).abs() < 1e-9);
        let min_untagged = map
            .open_cells()
            .into_iter()
            .filter(|c| map.room_of(*c).is_none())
            .map(|c| filter.probability(c))
            .fold(f64::INFINITY, f64::min);
        for cell in map.open_cells() {
            if map.room_of(cell).is_some() {
                assert!(filter.probability(cell) < min_untagged);
            }
        }
    }

    #[test]
    fn sampling_follows_the_distribution() {
        use rand::SeedableRng;
        use rand::rngs::StdRng;

        let map = map_of(&[".."]);
        let mut filter = filter_for(&map);
        filter
            .set_belief(&[(Cell::new(1, 0), 1.0)])
            .expect("valid distribution");
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(filter.sample(&mut rng), Cell::new(1, 0));
        }
    }
}
