use clap::Subcommand;
use youfirst_core::{Clock, SqliteStore, SystemClock, WorkoutExercise, WorkoutPatch, WorkoutStore};

use super::{parse_date, print_found, print_json, CmdResult};

#[derive(Subcommand)]
pub enum WorkoutAction {
    /// List custom workouts
    List,
    /// Create a workout
    Add {
        name: String,
        /// Exercise as NAME:SETSxREPS[:REST_SECONDS] (repeatable)
        #[arg(long = "exercise", value_parser = parse_exercise)]
        exercises: Vec<WorkoutExercise>,
    },
    /// Edit a workout
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// Replaces all exercises (repeatable)
        #[arg(long = "exercise", value_parser = parse_exercise)]
        exercises: Option<Vec<WorkoutExercise>>,
    },
    /// Delete a workout and its pending schedule entries
    Delete { id: String },
    /// Schedule a workout on a date (defaults to today)
    Schedule {
        workout_id: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Move a scheduled workout to another date
    Reschedule { id: String, date: String },
    /// Mark a scheduled workout done
    Complete {
        id: String,
        /// Measured duration in seconds
        #[arg(long, default_value = "0")]
        duration: u64,
    },
    /// Remove a schedule entry
    Unschedule { id: String },
    /// Pending scheduled workouts from today on
    Upcoming,
    /// Every schedule entry, completed ones included
    History,
}

fn parse_exercise(s: &str) -> Result<WorkoutExercise, String> {
    let mut parts = s.splitn(3, ':');
    let name = parts.next().unwrap_or_default().trim();
    let volume = parts.next().ok_or("expected NAME:SETSxREPS")?;
    let (sets, reps) = volume
        .split_once(['x', 'X'])
        .ok_or("expected SETSxREPS, e.g. 3x10")?;
    let rest_seconds = match parts.next() {
        Some(rest) => rest.trim().parse().map_err(|e| format!("rest: {e}"))?,
        None => 0,
    };
    if name.is_empty() {
        return Err("exercise name is empty".into());
    }
    Ok(WorkoutExercise {
        name: name.to_string(),
        sets: sets.trim().parse().map_err(|e| format!("sets: {e}"))?,
        reps: reps.trim().parse().map_err(|e| format!("reps: {e}"))?,
        rest_seconds,
    })
}

pub fn run(action: WorkoutAction) -> CmdResult {
    let store = SqliteStore::open()?;
    let clock = SystemClock;
    let workouts = WorkoutStore::new(&store, &clock);

    match action {
        WorkoutAction::List => print_json(&workouts.load_workouts())?,
        WorkoutAction::Add { name, exercises } => {
            print_json(&workouts.add_workout(&name, exercises))?;
        }
        WorkoutAction::Update {
            id,
            name,
            exercises,
        } => {
            let patch = WorkoutPatch { name, exercises };
            print_found(workouts.update_workout(&id, patch), &id)?;
        }
        WorkoutAction::Delete { id } => {
            if !workouts.delete_workout(&id) {
                return Err(format!("not found: {id}").into());
            }
            println!("deleted {id}");
        }
        WorkoutAction::Schedule { workout_id, date } => {
            let date = parse_date(date.as_deref())?;
            print_found(workouts.schedule(&workout_id, date), &workout_id)?;
        }
        WorkoutAction::Reschedule { id, date } => {
            let date = parse_date(Some(&date))?;
            print_found(workouts.reschedule(&id, date), &id)?;
        }
        WorkoutAction::Complete { id, duration } => {
            print_found(workouts.complete(&id, duration), &id)?;
        }
        WorkoutAction::Unschedule { id } => {
            if !workouts.delete_scheduled(&id) {
                return Err(format!("not found: {id}").into());
            }
            println!("deleted {id}");
        }
        WorkoutAction::Upcoming => print_json(&workouts.upcoming(clock.today()))?,
        WorkoutAction::History => print_json(&workouts.load_scheduled())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_exercise_with_rest() {
        let ex = parse_exercise("Squat:5x5:180").unwrap();
        assert_eq!(ex.name, "Squat");
        assert_eq!((ex.sets, ex.reps, ex.rest_seconds), (5, 5, 180));
    }

    #[test]
    fn parse_exercise_without_rest() {
        let ex = parse_exercise("Push-ups:3X20").unwrap();
        assert_eq!((ex.sets, ex.reps, ex.rest_seconds), (3, 20, 0));
    }

    #[test]
    fn parse_exercise_rejects_garbage() {
        assert!(parse_exercise("Squat").is_err());
        assert!(parse_exercise(":3x5").is_err());
        assert!(parse_exercise("Squat:three").is_err());
    }
}
