//! Subcommand modules for the `msaprep` binary.

pub mod hf_mut;
pub mod process;
