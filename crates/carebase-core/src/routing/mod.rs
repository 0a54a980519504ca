//! Tour routing: travel estimates, waypoint sequencing and the cascading
//! reschedule of later tours.
//!
//! Pipeline: patients → [`Stop`]s → [`sequence`] → route stored on the tour
//! → [`cascade`] over the caregiver's remaining tours that day.

mod cascade;
mod geo;
mod sequencer;

pub use cascade::*;
pub use geo::*;
pub use sequencer::*;
