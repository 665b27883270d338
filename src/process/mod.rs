//! Running external commands for statistics collection
//!
//! Sources that read statistics through command-line tools use [`Command`]
//! to run them with a hard time limit and capture their output.

mod command;
mod error;

pub use command::Command;
pub use error::{ProcessError, ProcessResult};
