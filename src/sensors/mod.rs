//! Sensor drivers.
//!
//! The bridge has one local sensor: an HX711-amplified load cell, exposed
//! to the service through [`WeightSensorPort`](crate::app::ports::WeightSensorPort).

pub mod load_cell;
