//! Roster rules: shift conflict detection.

mod conflict;

pub use conflict::*;
