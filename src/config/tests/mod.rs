//! Config module tests
//!
//! - Data directory, backup and load/save tests
//! - File transaction tests
//! - Preferences and envelope import/export tests

#[cfg(test)]
mod config_manager_tests;
#[cfg(test)]
mod transaction_tests;
