//! Command handlers: bridge CLI args -> core operations -> output formatting.

pub mod alarms;
pub mod config_cmd;
