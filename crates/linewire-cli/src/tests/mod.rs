//! Test suites for the command client.

mod support;
mod unit;
