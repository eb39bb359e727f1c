//! Command handlers - one module per subcommand, kept out of main.rs for testability

pub mod fixtures;
pub mod init;

pub use fixtures::execute_fixtures;
pub use init::{execute_init, generate_config};
pub use test::{execute_test, junit_target, resolve_settings, write_reports};
