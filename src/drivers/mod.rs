//! Platform drivers that are not sensors.

pub mod watchdog;
