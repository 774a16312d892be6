use clap::Subcommand;
use tracing::info;
use youfirst_core::sync::{remote_from_config, FlushReport};
use youfirst_core::{ChallengeStore, SystemClock};

use super::{open, print_json, CmdResult};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Show the outbox and last flush
    Status,
    /// Upload queued challenge changes
    Flush,
    /// Queue every local challenge and upload it
    Push,
    /// List queued rows
    Pending,
}

const NOT_CONFIGURED: &str = "remote not configured; set remote.supabase_url and remote.anon_key";

fn report(report: FlushReport) -> CmdResult {
    info!(pushed = report.pushed, remaining = report.remaining, "sync finished");
    print_json(&report)
}

pub fn run(action: SyncAction) -> CmdResult {
    let (store, config) = open()?;
    let clock = SystemClock;
    let challenges = ChallengeStore::new(&store, &clock);
    let outbox = challenges.outbox();

    match action {
        SyncAction::Status => print_json(&outbox.status(config.remote_configured()))?,
        SyncAction::Pending => print_json(&outbox.pending())?,
        SyncAction::Flush => {
            let remote = remote_from_config(&config).ok_or(NOT_CONFIGURED)?;
            report(outbox.flush(&remote)?)?;
        }
        SyncAction::Push => {
            let remote = remote_from_config(&config).ok_or(NOT_CONFIGURED)?;
            report(challenges.push_all(&remote)?)?;
        }
    }
    Ok(())
}
