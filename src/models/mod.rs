pub mod assignment;
pub mod conflict;
pub mod employee;
pub mod rule;
pub mod schedule;
pub mod shift;
