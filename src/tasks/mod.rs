//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cache sweep: removes expired/corrupt records and enforces the entry cap

mod sweep;

pub use sweep::{run_maintenance, spawn_sweep_task};
