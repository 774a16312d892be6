use clap::{Args, Subcommand};
use youfirst_core::timer::{format_duration, total_seconds, TICK_INTERVAL};
use youfirst_core::{
    Clock, Event, MindStore, SqliteStore, SystemClock, TimerController, TimerPhase, TimerStore,
    TimerType, WorkoutStore,
};

use super::{print_json, CmdResult};

#[derive(Args, Clone)]
pub struct TimerTarget {
    /// Timer type: workout, reading or meditation
    #[arg(long = "type", default_value = "workout")]
    timer_type: TimerType,
    /// Independent timer instance, e.g. a book or scheduled workout id
    #[arg(long)]
    scope: Option<String>,
}

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start (or restart) a timer
    Start {
        #[command(flatten)]
        target: TimerTarget,
    },
    /// Pause a running timer
    Pause {
        #[command(flatten)]
        target: TimerTarget,
    },
    /// Resume a paused timer
    Resume {
        #[command(flatten)]
        target: TimerTarget,
    },
    /// Stop a timer and print the final duration
    Stop {
        #[command(flatten)]
        target: TimerTarget,
        /// Record the duration: a reading session for the scoped book, or
        /// completion of the scoped scheduled workout
        #[arg(long)]
        record: bool,
    },
    /// Print current timer state as JSON
    Status {
        #[command(flatten)]
        target: TimerTarget,
    },
    /// Add time spent before the timer was started
    AddTime {
        #[command(flatten)]
        target: TimerTarget,
        /// Seconds to add
        seconds: u64,
    },
    /// List every persisted timer
    List,
    /// Print a snapshot every second
    Watch {
        #[command(flatten)]
        target: TimerTarget,
        /// Stop after this many snapshots
        #[arg(long)]
        count: Option<u64>,
    },
}

fn controller<'a>(
    store: &'a SqliteStore,
    clock: &'a SystemClock,
    target: &TimerTarget,
) -> TimerController<'a> {
    TimerController::new(
        TimerStore::new(store, clock),
        target.timer_type,
        target.scope.as_deref(),
    )
}

pub fn run(action: TimerAction) -> CmdResult {
    let store = SqliteStore::open()?;
    let clock = SystemClock;

    match action {
        TimerAction::Start { target } => {
            let event = controller(&store, &clock, &target).start();
            print_json(&event)?;
        }
        TimerAction::Pause { target } => {
            let mut timer = controller(&store, &clock, &target);
            let event = timer.pause().unwrap_or_else(|| timer.snapshot());
            print_json(&event)?;
        }
        TimerAction::Resume { target } => {
            let mut timer = controller(&store, &clock, &target);
            let event = timer.resume().unwrap_or_else(|| timer.snapshot());
            print_json(&event)?;
        }
        TimerAction::Stop { target, record } => {
            let mut timer = controller(&store, &clock, &target);
            let was_idle = timer.phase() == TimerPhase::Idle;
            let duration_secs = timer.stop();
            print_json(&Event::TimerStopped {
                timer_type: target.timer_type,
                scope_key: target.scope.clone(),
                duration_secs,
                at: clock.now(),
            })?;
            if record && !was_idle {
                record_duration(&store, &clock, &target, duration_secs)?;
            }
        }
        TimerAction::Status { target } => {
            let timer = controller(&store, &clock, &target);
            print_json(&timer.snapshot())?;
        }
        TimerAction::AddTime { target, seconds } => {
            let mut timer = controller(&store, &clock, &target);
            match timer.add_manual_time(seconds) {
                Some(event) => print_json(&event)?,
                None => return Err(format!("no active {} timer", target.timer_type).into()),
            }
        }
        TimerAction::List => {
            let now_ms = clock.now_ms();
            let timers: Vec<_> = TimerStore::new(&store, &clock)
                .active()
                .into_iter()
                .map(|state| {
                    let total = total_seconds(&state, now_ms);
                    serde_json::json!({
                        "type": state.timer_type,
                        "scopeKey": state.scope_key,
                        "isPaused": state.is_paused,
                        "elapsedSecs": total,
                        "display": format_duration(total),
                    })
                })
                .collect();
            print_json(&timers)?;
        }
        TimerAction::Watch { target, count } => {
            let mut timer = controller(&store, &clock, &target);
            let mut printed = 0;
            loop {
                timer.tick();
                print_json(&timer.snapshot())?;
                printed += 1;
                if count.is_some_and(|n| printed >= n) || timer.phase() == TimerPhase::Idle {
                    break;
                }
                std::thread::sleep(TICK_INTERVAL);
            }
        }
    }
    Ok(())
}

fn record_duration(
    store: &SqliteStore,
    clock: &SystemClock,
    target: &TimerTarget,
    duration_secs: u64,
) -> CmdResult {
    match target.timer_type {
        TimerType::Reading => {
            let session = MindStore::new(store, clock).record_session(
                target.scope.as_deref(),
                duration_secs,
                None,
                "",
            );
            print_json(&session)
        }
        TimerType::Workout => {
            let scope = target
                .scope
                .as_deref()
                .ok_or("--record for workouts needs --scope <scheduled workout id>")?;
            match WorkoutStore::new(store, clock).complete(scope, duration_secs) {
                Some(entry) => print_json(&entry),
                None => Err(format!("not found: scheduled workout {scope}").into()),
            }
        }
        TimerType::Meditation => Ok(()),
    }
}
