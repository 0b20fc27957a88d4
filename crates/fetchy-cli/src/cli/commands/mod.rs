//! CLI command handlers.

mod check;
mod run;
mod table;

pub use check::run_check;
pub use run::run_manifest;
