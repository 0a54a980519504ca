//! Export functionality for insurance billing.

mod billing;

pub use billing::*;
