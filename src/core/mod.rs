// src/core/mod.rs

pub mod context;
pub mod discovery;
pub mod metadata;
pub mod search_path;
pub mod settings;
pub mod synthesizer;
pub mod types;
