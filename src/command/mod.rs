//! Command channel.
//!
//! ```text
//! command writes ─▶ LineFramer ─▶ parse_frame ─▶ CommandChannel::dispatch
//!                                                   ├─▶ StepperController
//!                                                   ├─▶ ProgramStore
//!                                                   └─▶ response + notify
//! ```

pub mod channel;
pub mod frame;
pub mod parse;
pub mod program;

pub use channel::{CommandChannel, INVALID_TOKEN};
pub use frame::LineFramer;
pub use parse::{Command, Info, Request, parse_frame};
pub use program::{ProgramStore, StimulationProgram, StimulationType};
