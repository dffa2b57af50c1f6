//! Domain layer: models, ports, and errors. No I/O here beyond the
//! async trait boundaries.

pub mod errors;
pub mod models;
pub mod ports;
