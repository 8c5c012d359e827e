//! End-to-end fixtures for mqlite: sample services, typed views over their
//! references and a two-endpoint harness.

pub mod fixtures;
pub mod harness;

pub use fixtures::{BeanRef, BeanServerRef};
pub use harness::{Pair, CLIENT_ID, SERVER_ID};
