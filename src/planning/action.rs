use std::fmt;

use super::predicate::{NOTHING, Predicate, ROBOT, WorldState, held_item, holding_nothing, robot_room};

/// The closed set of action schemas the planner searches over.
///
/// Each variant owns the whole lifecycle of its schema: `expand`
/// enumerates the realisable ground bindings in a state *and* builds the
/// successor each binding produces, so binding generation and effect
/// application cannot drift apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    GoTo,
    PickUp,
    PutDown,
}

/// Schemas in their canonical consideration order.
pub const DEFAULT_SCHEMAS: [ActionKind; 3] =
    [ActionKind::GoTo, ActionKind::PickUp, ActionKind::PutDown];

/// A schema with every parameter bound to a concrete identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    GoTo { room: String },
    PickUp { item: String, room: String },
    PutDown { item: String, room: String },
}

impl ActionKind {
    /// Realisable ground bindings of this schema in `state`, paired with
    /// the successor state each produces. Bindings are enumerated from
    /// the predicates actually present, never from a cartesian product
    /// over all objects, and come out in the state's sorted order.
    pub fn expand(self, state: &WorldState) -> Vec<(Action, WorldState)> {
        match self {
            ActionKind::GoTo => {
                let Some(here) = robot_room(state) else {
                    return Vec::new();
                };
                let mut out = Vec::new();
                for p in state.iter() {
                    let Predicate::Connected(from, to) = p else {
                        continue;
                    };
                    if from.as_str() != here || to.as_str() == here {
                        continue;
                    }
                    let mut successor = state.clone();
                    successor.remove(&Predicate::at(ROBOT, here));
                    successor.insert(Predicate::at(ROBOT, to.clone()));
                    out.push((Action::GoTo { room: to.clone() }, successor));
                }
                out
            }
            ActionKind::PickUp => {
                if !holding_nothing(state) {
                    return Vec::new();
                }
                let Some(here) = robot_room(state) else {
                    return Vec::new();
                };
                let mut out = Vec::new();
                for p in state.iter() {
                    let Predicate::At(item, room) = p else {
                        continue;
                    };
                    if item.as_str() == ROBOT || room.as_str() != here {
                        continue;
                    }
                    let mut successor = state.clone();
                    successor.remove(&Predicate::at(item.clone(), here));
                    successor.remove(&Predicate::holding(ROBOT, NOTHING));
                    successor.insert(Predicate::holding(ROBOT, item.clone()));
                    out.push((
                        Action::PickUp {
                            item: item.clone(),
                            room: here.to_string(),
                        },
                        successor,
                    ));
                }
                out
            }
            ActionKind::PutDown => {
                let Some(here) = robot_room(state) else {
                    return Vec::new();
                };
                let Some(item) = held_item(state) else {
                    return Vec::new();
                };
                let mut successor = state.clone();
                successor.remove(&Predicate::holding(ROBOT, item));
                successor.insert(Predicate::at(item, here));
                successor.insert(Predicate::holding(ROBOT, NOTHING));
                vec![(
                    Action::PutDown {
                        item: item.to_string(),
                        room: here.to_string(),
                    },
                    successor,
                )]
            }
        }
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::GoTo { .. } => ActionKind::GoTo,
            Action::PickUp { .. } => ActionKind::PickUp,
            Action::PutDown { .. } => ActionKind::PutDown,
        }
    }

    /// Replay this grounded action through the same expansion rule the
    /// planner uses. `None` when the action is not applicable in `state`.
    pub fn apply(&self, state: &WorldState) -> Option<WorldState> {
        self.kind()
            .expand(state)
            .into_iter()
            .find(|(action, _)| action == self)
            .map(|(_, successor)| successor)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::GoTo { room } => write!(f, "GoTo({room})"),
            Action::PickUp { item, room } => write!(f, "PickUp({item}, {room})"),
            Action::PutDown { item, room } => write!(f, "PutDown({item}, {room})"),
        }
    }
}
