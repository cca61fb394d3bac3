use std::collections::{HashSet, VecDeque};

use super::action::{Action, ActionKind};
use super::predicate::WorldState;

/// Bounded breadth-first forward search in grounded-predicate space.
///
/// Returns the empty plan when `goal` already holds in `initial`, and
/// `None` when no plan of length <= `depth_bound` reaches a state
/// containing `goal`. Schemas are considered in the order given and
/// bindings in each schema's own enumeration order, so the returned plan
/// is fixed under ties. The search never fails in any other way.
pub fn plan(
    initial: &WorldState,
    goal: &WorldState,
    schemas: &[ActionKind],
    depth_bound: usize,
) -> Option<Vec<Action>> {
    if goal.is_subset(initial) {
        return Some(Vec::new());
    }

    let mut frontier: VecDeque<(WorldState, Vec<Action>)> = VecDeque::new();
    let mut visited: HashSet<WorldState> = HashSet::new();
    frontier.push_back((initial.clone(), Vec::new()));

    while let Some((state, actions)) = frontier.pop_front() {
        // States are marked visited when dequeued; a state can therefore
        // sit in the frontier twice, but is only ever expanded once.
        if !visited.insert(state.clone()) {
            continue;
        }
        if actions.len() >= depth_bound {
            continue;
        }

        for schema in schemas {
            for (action, successor) in schema.expand(&state) {
                let mut candidate = actions.clone();
                candidate.push(action);
                if goal.is_subset(&successor) {
                    return Some(candidate);
                }
                if !visited.contains(&successor) {
                    frontier.push_back((successor, candidate));
                }
            }
        }
    }

    None
}
