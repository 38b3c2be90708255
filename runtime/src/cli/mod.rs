//! CLI subcommand implementations for the `patentscope` binary.

pub mod doctor;
pub mod fetch_cmd;
pub mod output;
pub mod parse_cmd;
pub mod search_cmd;
