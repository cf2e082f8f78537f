//! Load lifecycle: sessions, timers and the state machine tying the
//! protocol pieces together

mod coordinator;
mod effects;
mod state;


pub use coordinator::LoadCoordinator;
pub use effects::{Effect, LoadEvent, Timer, TimerKind};
pub use state::{LoadSession, LoadSnapshot, Phase};
