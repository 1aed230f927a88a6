// src/handlers/mod.rs

pub mod auth;
pub mod checker;
pub mod export;
pub mod solver;
pub mod submissions;
