use clap::Subcommand;
use youfirst_core::{GoalPatch, GoalStore, SqliteStore, SystemClock};

use super::{print_found, print_json, CmdResult};

#[derive(Subcommand)]
pub enum GoalAction {
    /// List goals
    List {
        /// Only goals not yet completed
        #[arg(long)]
        active: bool,
    },
    /// Add a goal
    Add {
        title: String,
        /// What "done" looks like
        #[arg(long, default_value = "")]
        outcome: String,
        /// Why it matters (repeatable)
        #[arg(long = "reason")]
        reasons: Vec<String>,
    },
    /// Edit a goal
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        outcome: Option<String>,
        /// Replaces all reasons (repeatable)
        #[arg(long = "reason")]
        reasons: Option<Vec<String>>,
    },
    /// Mark a goal as completed
    Complete { id: String },
    /// Mark a completed goal as active again
    Reopen { id: String },
    /// Delete a goal
    Delete { id: String },
}

pub fn run(action: GoalAction) -> CmdResult {
    let store = SqliteStore::open()?;
    let clock = SystemClock;
    let goals = GoalStore::new(&store, &clock);

    match action {
        GoalAction::List { active } => {
            let mut list = goals.load_goals();
            if active {
                list.retain(|g| !g.is_completed);
            }
            print_json(&list)?;
        }
        GoalAction::Add {
            title,
            outcome,
            reasons,
        } => {
            let reasons: Vec<&str> = reasons.iter().map(String::as_str).collect();
            print_json(&goals.add_goal(&title, &outcome, &reasons))?;
        }
        GoalAction::Update {
            id,
            title,
            outcome,
            reasons,
        } => {
            let patch = GoalPatch {
                title,
                outcome,
                reasons,
            };
            print_found(goals.update_goal(&id, patch), &id)?;
        }
        GoalAction::Complete { id } => print_found(goals.complete_goal(&id), &id)?,
        GoalAction::Reopen { id } => print_found(goals.reopen_goal(&id), &id)?,
        GoalAction::Delete { id } => {
            if !goals.delete_goal(&id) {
                return Err(format!("not found: {id}").into());
            }
            println!("deleted {id}");
        }
    }
    Ok(())
}
