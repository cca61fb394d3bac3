use serde::Serialize;

/// Summary of a single goal attempted during an episode.
#[derive(Debug, Clone, Serialize)]
pub struct GoalLog {
    /// Sequential episode index.
    pub episode: u32,
    /// Human-readable goal label, e.g. "fetch cup".
    pub goal: String,
    /// Length of the plan the planner produced; empty when no plan was
    /// found within the depth bound.
    pub plan_len: Option<u32>,
    /// Unit motions walked while executing this goal.
    pub motions: u32,
    /// Whether every action of the plan completed.
    pub success: bool,
    /// Degenerate belief updates recorded while executing this goal.
    pub degenerate_updates: u32,
}

/// Write a collection of goal summaries to a CSV file.
///
/// This creates/overwrites the file at `path`.
pub fn write_goal_logs_csv<P: AsRef<std::path::Path>>(
    path: P,
    logs: &[GoalLog],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for log in logs {
        wtr.serialize(log)?;
    }
    wtr.flush()?;
    Ok(())
}
