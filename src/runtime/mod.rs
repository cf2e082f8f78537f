//! Async runtime around the load coordinator
//!
//! The coordinator itself never performs IO. The driver owns it on a tokio
//! task, carries out its effects, and feeds timer and transfer completions
//! back in.

mod channel;
mod driver;
mod process;

pub use channel::{EngineChannel, MemoryChannel, RecordingChannel};
pub use driver::{BridgeDriver, BridgeHandle};
pub use process::{pump_lines, EngineProcess, ProcessChannel};
