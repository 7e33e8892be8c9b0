use std::fmt;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A performance period: calendar year-to-date through `month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i16,
    pub month: i8,
}

impl Period {
    pub fn new(year: i16, month: i8) -> Result<Self, CoreError> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidPeriod { year, month });
        }
        Date::new(year, month, 1)?;
        Ok(Self { year, month })
    }

    /// First day of the performance year.
    pub fn start(&self) -> Result<Date, CoreError> {
        Ok(Date::new(self.year, 1, 1)?)
    }

    /// Last day of the performance month.
    pub fn end(&self) -> Result<Date, CoreError> {
        self.month_end(self.month)
    }

    pub fn month_start(&self, month: i8) -> Result<Date, CoreError> {
        Ok(Date::new(self.year, month, 1)?)
    }

    pub fn month_end(&self, month: i8) -> Result<Date, CoreError> {
        Ok(Date::new(self.year, month, 1)?.last_of_month())
    }

    /// Whether `date` falls between January 1 and the end of the performance month.
    pub fn contains(&self, date: Date) -> bool {
        date.year() == self.year && date.month() <= self.month
    }

    pub fn elapsed_months(&self) -> u32 {
        self.month as u32
    }

    pub fn remaining_months(&self) -> u32 {
        (12 - self.month) as u32
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-M{:02}", self.year, self.month)
    }
}
