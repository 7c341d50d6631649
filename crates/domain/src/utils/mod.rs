//! Validation utilities for identifiers sent to the SII

pub mod date;
pub mod rut;
