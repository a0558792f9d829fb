//! PBQ Labs - Security+ performance-based question simulations

pub mod command;
pub mod core;
pub mod host;
pub mod quiz;
pub mod scenario;
pub mod simulation;
