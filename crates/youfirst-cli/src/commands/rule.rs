use clap::Subcommand;
use serde::Serialize;
use youfirst_core::{
    current_streak, longest_streak, Clock, DisciplineStore, Rule, RulePatch, SqliteStore,
    SystemClock,
};

use super::{parse_date, print_found, print_json, CmdResult};

#[derive(Subcommand)]
pub enum RuleAction {
    /// List rules with their streaks
    List,
    /// Add a rule
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Edit a rule
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a rule
    Delete { id: String },
    /// Mark a day as kept (defaults to today)
    CheckIn {
        id: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Remove a day's check-in (defaults to today)
    Undo {
        id: String,
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Serialize)]
struct RuleView {
    #[serde(flatten)]
    rule: Rule,
    current_streak: u32,
    longest_streak: u32,
}

fn view(rule: Rule, clock: &SystemClock) -> RuleView {
    RuleView {
        current_streak: current_streak(&rule, clock.today()),
        longest_streak: longest_streak(&rule),
        rule,
    }
}

pub fn run(action: RuleAction) -> CmdResult {
    let store = SqliteStore::open()?;
    let clock = SystemClock;
    let rules = DisciplineStore::new(&store, &clock);

    match action {
        RuleAction::List => {
            let list: Vec<_> = rules
                .load_rules()
                .into_iter()
                .map(|r| view(r, &clock))
                .collect();
            print_json(&list)?;
        }
        RuleAction::Add { title, description } => {
            print_json(&rules.add_rule(&title, &description))?;
        }
        RuleAction::Update {
            id,
            title,
            description,
        } => {
            let patch = RulePatch { title, description };
            print_found(rules.update_rule(&id, patch), &id)?;
        }
        RuleAction::Delete { id } => {
            if !rules.delete_rule(&id) {
                return Err(format!("not found: {id}").into());
            }
            println!("deleted {id}");
        }
        RuleAction::CheckIn { id, date } => {
            let date = parse_date(date.as_deref())?;
            let rule = rules.check_in(&id, date).map(|r| view(r, &clock));
            print_found(rule, &id)?;
        }
        RuleAction::Undo { id, date } => {
            let date = parse_date(date.as_deref())?;
            let rule = rules.undo_check_in(&id, date).map(|r| view(r, &clock));
            print_found(rule, &id)?;
        }
    }
    Ok(())
}
