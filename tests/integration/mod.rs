//! Integration tests for es3-harmony.

mod cli;
mod config_loading;
mod conformance;
mod properties;
mod scenarios;
