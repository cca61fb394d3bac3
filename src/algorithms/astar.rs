use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::engine::map::HomeMap;
use crate::engine::position::Cell;

/// Internal A* node stored in the open set.
#[derive(Clone, Debug, Eq, PartialEq)]
struct Node {
    cell: Cell,
    g_cost: u32,
    h_cost: u32,
    /// Insertion counter; ties on f-cost resolve to the earliest push.
    seq: u64,
}

impl Node {
    fn f_cost(&self) -> u32 {
        self.g_cost + self.h_cost
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is max-first; invert the comparison so that the
        // node with the *smallest* f_cost comes out first, and among
        // equal f_costs the one pushed earliest.
        other
            .f_cost()
            .cmp(&self.f_cost())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* pathfinding over the open cells of `map`.
///
/// Returns a path from `start` to `goal`, including both endpoints, or
/// `None` if no path exists. `start == goal` yields the single-cell path.
/// Neighbour enumeration follows the map's fixed east/west/south/north
/// order, which pins the returned path under cost ties.
pub fn find_path(map: &HomeMap, start: Cell, goal: Cell) -> Option<Vec<Cell>> {
    if map.is_obstacle(start) || map.is_obstacle(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut g_score: HashMap<Cell, u32> = HashMap::new();
    let mut closed: HashSet<Cell> = HashSet::new();
    let mut seq: u64 = 0;

    g_score.insert(start, 0);
    open_set.push(Node {
        cell: start,
        g_cost: 0,
        h_cost: start.manhattan(goal) as u32,
        seq,
    });

    while let Some(current) = open_set.pop() {
        let cell = current.cell;

        if cell == goal {
            return Some(reconstruct_path(&came_from, cell));
        }

        if !closed.insert(cell) {
            continue;
        }

        let current_g = *g_score.get(&cell).unwrap_or(&u32::MAX);

        for neighbour in map.neighbours(cell) {
            if closed.contains(&neighbour) {
                continue;
            }

            let tentative_g = current_g.saturating_add(1);
            let best_known_g = *g_score.get(&neighbour).unwrap_or(&u32::MAX);

            if tentative_g < best_known_g {
                g_score.insert(neighbour, tentative_g);
                came_from.insert(neighbour, cell);

                seq += 1;
                open_set.push(Node {
                    cell: neighbour,
                    g_cost: tentative_g,
                    h_cost: neighbour.manhattan(goal) as u32,
                    seq,
                });
            }
        }
    }

    None
}

/// Reconstruct a path from the `came_from` map, ending at `end`.
fn reconstruct_path(came_from: &HashMap<Cell, Cell>, end: Cell) -> Vec<Cell> {
    let mut path = Vec::new();
    let mut p = end;
    path.push(p);
    while let Some(prev) = came_from.get(&p) {
        p = *prev;
        path.push(p);
    }
    path.reverse();
    path
}
