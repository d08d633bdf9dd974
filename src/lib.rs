//! Cake Day Bot - wishes community members a happy cake day, once per
//! anniversary, and acknowledges their thanks.
//!
//! This library provides the domain types, the record store, the detectors,
//! and the per-community workers. The binary wires them to Reddit.

pub mod clock;
pub mod config;
pub mod detect;
pub mod reddit;
pub mod schedule;
pub mod server;
pub mod source;
pub mod store;
pub mod stream;
pub mod types;
pub mod worker;

#[cfg(test)]
mod test_utils;
