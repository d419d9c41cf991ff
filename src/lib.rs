// src/lib.rs — Library root for devflow

pub mod agents;
pub mod cli;
pub mod core;
pub mod extract;
pub mod infra;
pub mod provider;
pub mod solver;
pub mod tools;
pub mod util;
