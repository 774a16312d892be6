mod controller;
mod state;
mod store;

pub use controller::{AppState, TimerController, TimerPhase, TICK_INTERVAL};
pub use state::{
    calculate_elapsed_seconds, format_duration, timer_key, total_seconds, TimerState, TimerType,
};
pub use store::TimerStore;
