//! Test suites for the command bridge daemon.

mod process_behaviour;
pub(crate) mod support;
