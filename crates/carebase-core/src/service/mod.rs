//! `CareCore` operations, one file per area.

mod billing;
mod documentation;
mod inventory;
mod people;
mod planning;
mod shifts;
mod tours;

pub use planning::ChangeRequestOutcome;

use chrono::NaiveDate;

use crate::gate::Period;
use crate::{CareError, CareResult};

/// Turn a missing record into a not-found error.
fn required<T>(value: Option<T>, what: &str, id: &str) -> CareResult<T> {
    value.ok_or_else(|| CareError::NotFound(format!("{} {}", what, id)))
}

fn ensure(condition: bool, message: impl Into<String>) -> CareResult<()> {
    if condition {
        Ok(())
    } else {
        Err(CareError::InvalidInput(message.into()))
    }
}

fn period(from: NaiveDate, to: NaiveDate) -> CareResult<Period> {
    ensure(from <= to, format!("period start {} is after its end {}", from, to))?;
    Ok(Period::new(from, to))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
