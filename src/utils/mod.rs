// src/utils/mod.rs

pub mod hash;
pub mod jwt;
pub mod payload;
pub mod upload;
