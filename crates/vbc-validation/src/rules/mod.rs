pub mod age;
pub mod cost;
pub mod dates;
pub mod duplicates;
pub mod gender;
pub mod measures;
pub mod required;
pub mod volume;
