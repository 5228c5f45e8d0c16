pub mod command_runner;

pub use command_runner::{CommandInvocation, CommandOutput, CommandRunner, TokioCommandRunner};

#[cfg(test)]
pub use command_runner::MockCommandRunner;
