mod engine;
mod ticker;

pub use engine::{SessionPlan, TimerEngine, TimerPhase};
pub use ticker::{Tick, Ticker};
