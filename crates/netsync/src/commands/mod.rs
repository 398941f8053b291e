//! Command dispatch: bridges CLI args -> config + core -> output formatting.

pub mod check;
pub mod plan;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Plan(args) => plan::handle(&args, global).await,
        Command::CheckConfig(args) => check::handle(&args, global),
    }
}
