//! Subcommand modules for the `hiscaf` binary.

pub mod correct;
pub mod digest;
pub mod emit;
pub mod links;
pub mod ng50;
pub mod run;
pub mod scaled;
pub mod size;
