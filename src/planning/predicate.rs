use std::collections::BTreeSet;
use std::fmt;

/// The agent identifier used in `At` and `Holding` predicates.
pub const ROBOT: &str = "robot";
/// Placeholder object for an empty gripper.
pub const NOTHING: &str = "nothing";
/// Pseudo-room reported when the robot's believed cell carries no tag.
pub const HALLWAY: &str = "hallway";

/// A ground first-order atom. The relation set is closed; arguments are
/// symbolic identifiers (room tags, item names, `robot`, `nothing`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Predicate {
    /// `(At, subject, room)` — the subject (robot or item) is in a room.
    At(String, String),
    /// `(Holding, agent, item)` — what the gripper carries; `nothing`
    /// when empty.
    Holding(String, String),
    /// `(Connected, from, to)` — a GoTo step from `from` to `to` is
    /// allowed. Directional; symmetric layouts list both directions.
    Connected(String, String),
}

impl Predicate {
    pub fn at(subject: impl Into<String>, room: impl Into<String>) -> Self {
        Predicate::At(subject.into(), room.into())
    }

    pub fn holding(agent: impl Into<String>, item: impl Into<String>) -> Self {
        Predicate::Holding(agent.into(), item.into())
    }

    pub fn connected(from: impl Into<String>, to: impl Into<String>) -> Self {
        Predicate::Connected(from.into(), to.into())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::At(s, r) => write!(f, "(At {s} {r})"),
            Predicate::Holding(a, i) => write!(f, "(Holding {a} {i})"),
            Predicate::Connected(a, b) => write!(f, "(Connected {a} {b})"),
        }
    }
}

/// A world state is a set of predicates. Set equality is state equality;
/// the ordered representation keeps planner expansion deterministic.
pub type WorldState = BTreeSet<Predicate>;

/// The room the robot is `At`, if the state records one.
pub fn robot_room(state: &WorldState) -> Option<&str> {
    state.iter().find_map(|p| match p {
        Predicate::At(subject, room) if subject == ROBOT => Some(room.as_str()),
        _ => None,
    })
}

/// The item the robot holds, `None` when the gripper is empty or the
/// state records nothing.
pub fn held_item(state: &WorldState) -> Option<&str> {
    state.iter().find_map(|p| match p {
        Predicate::Holding(agent, item) if agent == ROBOT && item != NOTHING => {
            Some(item.as_str())
        }
        _ => None,
    })
}

/// Whether the state says the gripper is empty.
pub fn holding_nothing(state: &WorldState) -> bool {
    state.contains(&Predicate::holding(ROBOT, NOTHING))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_read_the_robot_predicates() {
        let mut state = WorldState::new();
        state.insert(Predicate::at(ROBOT, "kitchen"));
        state.insert(Predicate::at("cup", "kitchen"));
        state.insert(Predicate::holding(ROBOT, NOTHING));

        assert_eq!(robot_room(&state), Some("kitchen"));
        assert_eq!(held_item(&state), None);
        assert!(holding_nothing(&state));

        state.remove(&Predicate::holding(ROBOT, NOTHING));
        state.insert(Predicate::holding(ROBOT, "cup"));
        assert_eq!(held_item(&state), Some("cup"));
        assert!(!holding_nothing(&state));
    }

    #[test]
    fn display_matches_the_tuple_form() {
        assert_eq!(
            Predicate::at(ROBOT, "kitchen").to_string(),
            "(At robot kitchen)"
        );
        assert_eq!(
            Predicate::connected("kitchen", "living_room").to_string(),
            "(Connected kitchen living_room)"
        );
    }
}
