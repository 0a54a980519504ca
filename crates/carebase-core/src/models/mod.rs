//! Domain models for the care-management system.

mod billing;
mod documentation;
mod employee;
mod inventory;
mod patient;
mod planning;
mod shift;
mod tour;

pub use billing::*;
pub use documentation::*;
pub use employee::*;
pub use inventory::*;
pub use patient::*;
pub use planning::*;
pub use shift::*;
pub use tour::*;
