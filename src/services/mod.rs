// src/services/mod.rs

pub mod attempt_store;
pub mod generator;
pub mod quiz_session;
pub mod session_store;
pub mod stats;
