//! Application core: bridge logic, zero direct I/O.
//!
//! This module contains the rules for the VexBridge firmware: what each
//! scheduler task does, how peer frames reach the telemetry store, and
//! what gets published.  All interaction with hardware happens through
//! **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
