//! Command dispatch: bridges CLI args -> notification sync -> output formatting.

pub mod config_cmd;
pub mod notifications;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Notifications(args) => notifications::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
    }
}
