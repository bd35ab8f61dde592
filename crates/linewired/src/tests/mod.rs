//! Test suites for the linewire server.

mod bootstrap_behaviour;
mod support;
