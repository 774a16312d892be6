use clap::Subcommand;
use tracing::debug;
use youfirst_core::sync::{local_user_id, remote_from_config};
use youfirst_core::{ChallengePatch, ChallengeStore, Clock, NewChallenge, RemoteBackend, SystemClock};

use super::{open, parse_date, print_found, print_json, CmdResult};

#[derive(Subcommand)]
pub enum ChallengeAction {
    /// List challenges
    List {
        /// Only challenges you have joined
        #[arg(long)]
        joined: bool,
    },
    /// Create a challenge (you join it automatically)
    Create {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "general")]
        category: String,
        /// Length in days
        #[arg(long, default_value = "30")]
        days: u32,
        /// First day, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        start: Option<String>,
        /// Hide from the public list
        #[arg(long)]
        private: bool,
    },
    /// Edit a challenge
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        public: Option<bool>,
    },
    /// Delete a challenge
    Delete { id: String },
    /// Join a challenge
    Join { id: String },
    /// Leave a challenge
    Leave { id: String },
    /// Check in for a day (defaults to today)
    CheckIn {
        id: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Your progress in a challenge
    Progress { id: String },
    /// Ranked participants, merged with the remote mirror when reachable
    Leaderboard { id: String },
}

pub fn run(action: ChallengeAction) -> CmdResult {
    let (store, config) = open()?;
    let clock = SystemClock;
    let user_id = local_user_id(&store, &config.profile);
    let remote = remote_from_config(&config);
    if remote.is_some() {
        debug!("challenge mirror enabled");
    }
    let challenges = ChallengeStore::new(&store, &clock)
        .with_remote(remote.as_ref().map(|r| r as &dyn RemoteBackend));

    match action {
        ChallengeAction::List { joined } => {
            let list = if joined {
                challenges.joined(&user_id)
            } else {
                challenges.load_challenges()
            };
            print_json(&list)?;
        }
        ChallengeAction::Create {
            title,
            description,
            category,
            days,
            start,
            private,
        } => {
            let challenge = challenges.create_challenge(NewChallenge {
                title,
                description,
                category,
                duration_days: days,
                start_date: parse_date(start.as_deref())?,
                created_by: user_id,
                creator_name: config.profile.display_name.clone(),
                is_public: !private,
            });
            print_json(&challenge)?;
        }
        ChallengeAction::Update {
            id,
            title,
            description,
            category,
            days,
            start,
            public,
        } => {
            let start_date = match start {
                Some(s) => Some(parse_date(Some(&s))?),
                None => None,
            };
            let patch = ChallengePatch {
                title,
                description,
                category,
                duration_days: days,
                start_date,
                is_public: public,
            };
            print_found(challenges.update_challenge(&id, patch), &id)?;
        }
        ChallengeAction::Delete { id } => {
            if !challenges.delete_challenge(&id) {
                return Err(format!("not found: {id}").into());
            }
            println!("deleted {id}");
        }
        ChallengeAction::Join { id } => {
            let joined = challenges.join(&id, &user_id, &config.profile.display_name);
            print_found(joined, &id)?;
        }
        ChallengeAction::Leave { id } => print_found(challenges.leave(&id, &user_id), &id)?,
        ChallengeAction::CheckIn { id, date } => {
            let date = parse_date(date.as_deref())?;
            match challenges.check_in(&id, &user_id, date) {
                Some(check_in) => print_json(&check_in)?,
                None => {
                    return Err(format!(
                        "cannot check in to {id} on {date}: not joined, unknown, or outside the challenge"
                    )
                    .into())
                }
            }
        }
        ChallengeAction::Progress { id } => {
            let challenge = challenges.get(&id).ok_or(format!("not found: {id}"))?;
            print_json(&challenges.progress(&challenge, &user_id, clock.today()))?;
        }
        ChallengeAction::Leaderboard { id } => {
            if challenges.get(&id).is_none() {
                return Err(format!("not found: {id}").into());
            }
            print_json(&challenges.leaderboard(&id))?;
        }
    }
    Ok(())
}
