//! Command handlers for the NSS CLI.

pub mod ask;
pub mod serve;
pub mod stats;

pub use ask::AskCommand;
pub use serve::ServeCommand;
pub use stats::StatsCommand;
