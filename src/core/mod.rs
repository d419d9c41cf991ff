// src/core/mod.rs — Refinement loop, workflow dispatch, cost tracking

pub mod cost;
pub mod refiner;
pub mod types;
pub mod workflow;
