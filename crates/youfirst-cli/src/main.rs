use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

mod commands;

#[derive(Parser)]
#[command(name = "youfirst", version, about = "You. First habit and fitness tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Workout, reading and meditation timers
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Goals
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Discipline rules and streaks
    Rule {
        #[command(subcommand)]
        action: commands::rule::RuleAction,
    },
    /// Community challenges
    Challenge {
        #[command(subcommand)]
        action: commands::challenge::ChallengeAction,
    },
    /// Workout builder and schedule
    Workout {
        #[command(subcommand)]
        action: commands::workout::WorkoutAction,
    },
    /// Books and reading sessions
    Read {
        #[command(subcommand)]
        action: commands::read::ReadAction,
    },
    /// Today's overview across every feature
    Summary,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Remote challenge mirror
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// Print a shell completion script
    Completions {
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Goal { action } => commands::goal::run(action),
        Commands::Rule { action } => commands::rule::run(action),
        Commands::Challenge { action } => commands::challenge::run(action),
        Commands::Workout { action } => commands::workout::run(action),
        Commands::Read { action } => commands::read::run(action),
        Commands::Summary => commands::summary::run(),
        Commands::Config { action } => commands::config::run(action),
        Commands::Sync { action } => commands::sync::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "youfirst", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
