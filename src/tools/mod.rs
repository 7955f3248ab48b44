//! Side-effecting tools used by the CLI

pub mod shell;

pub use shell::{ShellError, ShellExecutor, ShellResult};
